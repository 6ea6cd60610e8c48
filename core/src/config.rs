use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

use crate::api::DEFAULT_VOICE_ID;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub openai: OpenAiSettings,
    pub elevenlabs: ElevenLabsSettings,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub image_model: String,
    pub max_tokens: u32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElevenLabsSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub default_voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for ElevenLabsSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration file {0} does not exist")]
    Missing(PathBuf),
    #[error("configuration invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Missing(path) => {
                format!("Chati not configured: {} was not found.", path.display())
            }
            Self::Invalid(detail) => {
                format!("Chati not configured: {detail}. Update chati.yaml or the environment.")
            }
        }
    }
}

impl ServerSettings {
    /// Loads `.env`, the optional `chati.yaml` and the process environment, in
    /// increasing order of precedence.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let file = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::Missing(path.to_path_buf())),
            Some(path) => Some(read_config_file(path)?),
            None => match locate_config_file() {
                Some(path) => Some(read_config_file(&path)?),
                None => None,
            },
        };
        resolve_settings(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    pub fn speech_configured(&self) -> bool {
        self.elevenlabs.api_key.is_some()
    }
}

fn read_config_file(path: &Path) -> Result<ChatiConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        ConfigError::Invalid(format!("failed to read {}: {err}", path.display()))
    })?;
    serde_yaml::from_str(&contents)
        .map_err(|err| ConfigError::Invalid(format!("invalid {}: {err}", path.display())))
}

fn resolve_settings<F>(file: ChatiConfig, lookup: F) -> Result<ServerSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| non_empty(lookup(key));

    let server = file.server.unwrap_or_default();
    let bind_raw = env("CHATI_BIND")
        .or(server.bind)
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_raw
        .parse::<SocketAddr>()
        .map_err(|err| ConfigError::Invalid(format!("bad bind address `{bind_raw}`: {err}")))?;

    let mut openai = OpenAiSettings::default();
    let section = file.openai.unwrap_or_default();
    openai.api_key = env("OPENAI_API_KEY").or_else(|| non_empty(section.api_key));
    if let Some(base_url) = env("OPENAI_BASE_URL").or(section.base_url) {
        openai.base_url = validate_base_url(&base_url)?;
    }
    if let Some(model) = section.chat_model {
        openai.chat_model = model;
    }
    if let Some(model) = section.image_model {
        openai.image_model = model;
    }

    let mut elevenlabs = ElevenLabsSettings::default();
    let section = file.elevenlabs.unwrap_or_default();
    elevenlabs.api_key = env("ELEVENLABS_API_KEY").or_else(|| non_empty(section.api_key));
    if let Some(base_url) = env("ELEVENLABS_BASE_URL").or(section.base_url) {
        elevenlabs.base_url = validate_base_url(&base_url)?;
    }
    if let Some(model_id) = section.model_id {
        elevenlabs.model_id = model_id;
    }
    if let Some(voice_id) = section.default_voice_id {
        elevenlabs.default_voice_id = voice_id;
    }

    Ok(ServerSettings {
        bind,
        openai,
        elevenlabs,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|err| ConfigError::Invalid(format!("bad provider url `{raw}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(format!(
            "provider url `{raw}` must use http or https"
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn locate_config_file() -> Option<PathBuf> {
    chati_yaml_candidates()
        .into_iter()
        .find(|path| path.exists())
}

fn chati_yaml_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("chati");
        paths.push(config_dir.join("chati.yaml"));
        paths.push(config_dir.join("chati.yml"));
    }
    paths.push(PathBuf::from("chati.yaml"));
    paths.push(PathBuf::from("chati.yml"));
    paths
}

#[derive(Debug, Default, Deserialize)]
struct ChatiConfig {
    server: Option<ServerSection>,
    openai: Option<OpenAiSection>,
    elevenlabs: Option<ElevenLabsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiSection {
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    image_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ElevenLabsSection {
    api_key: Option<String>,
    base_url: Option<String>,
    model_id: Option<String>,
    default_voice_id: Option<String>,
}

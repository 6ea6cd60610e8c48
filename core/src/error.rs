use reqwest::StatusCode;

/// Failure of a single outbound provider call. Every variant is terminal for the
/// request that produced it.
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    MissingCredential(&'static str),
    #[error("request to {provider} failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
    #[error("{message}")]
    Upstream {
        provider: &'static str,
        status: StatusCode,
        message: String,
    },
    #[error("{provider} returned an unreadable response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },
    #[error("No se generó ninguna imagen")]
    NoImage,
}

impl ProviderError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_))
    }

    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

use chati_core::state::{ConversationStore, MessageKind, MessageRole, NewMessage, ViewKind};
use std::collections::HashSet;

const KINDS: [ViewKind; 3] = [ViewKind::Chat, ViewKind::Image, ViewKind::Voice];

fn assert_unique_ids(store: &ConversationStore) {
    let ids: HashSet<_> = store.conversations().iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), store.conversations().len());
}

fn assert_current_is_valid(store: &ConversationStore) {
    if let Some(id) = store.current_conversation_id() {
        assert!(store.conversation(id).is_some(), "current id must exist");
    }
}

#[test]
fn mixed_operation_sequences_keep_ids_unique() {
    let mut store = ConversationStore::new();
    let mut step: usize = 7;
    for round in 0..200 {
        step = (step * 31 + 11) % 97;
        match step % 4 {
            0 | 1 => {
                store.add_conversation(KINDS[round % 3]);
            }
            2 => {
                if let Some(target) = store.conversations().get(step % 5).map(|c| c.id) {
                    store.add_message(target, NewMessage::text(MessageRole::User, "mensaje"));
                }
            }
            _ => {
                if let Some(target) = store.conversations().get(step % 3).map(|c| c.id) {
                    store.delete_conversation(target);
                }
            }
        }
        assert_unique_ids(&store);
        assert_current_is_valid(&store);
    }
}

#[test]
fn add_message_appends_exactly_one() {
    let mut store = ConversationStore::new();
    let id = store.add_conversation(ViewKind::Voice);
    for (index, content) in ["uno", "dos", "tres"].into_iter().enumerate() {
        let role = if index % 2 == 0 {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        let message_id = store
            .add_message(id, NewMessage::text(role, content))
            .expect("conversation exists");

        let conversation = store.conversation(id).unwrap();
        assert_eq!(conversation.messages.len(), index + 1);
        let last = conversation.messages.last().unwrap();
        assert_eq!(last.id, message_id);
        assert_eq!(last.content, content);
        assert_eq!(last.role, role);
        assert_eq!(last.kind, MessageKind::Text);
    }
}

#[test]
fn message_order_is_chronological_and_stable() {
    let mut store = ConversationStore::new();
    let id = store.add_conversation(ViewKind::Chat);
    store.add_message(id, NewMessage::text(MessageRole::User, "primero"));
    let first = store.conversation(id).unwrap().messages[0].clone();
    store.add_message(id, NewMessage::audio("audio", "data:audio/mpeg;base64,AA=="));

    let messages = &store.conversation(id).unwrap().messages;
    assert_eq!(messages[0], first);
    assert!(messages[0].timestamp <= messages[1].timestamp);
    assert_eq!(messages[1].kind, MessageKind::Audio);
}

#[test]
fn first_user_message_sets_title() {
    let cases = [
        ("hola", "hola".to_string()),
        (
            "exactamente treinta caracteres",
            "exactamente treinta caracteres".to_string(),
        ),
        (
            "esta frase tiene más de treinta caracteres",
            "esta frase tiene más de treint...".to_string(),
        ),
    ];
    for (content, expected) in cases {
        let mut store = ConversationStore::new();
        let id = store.add_conversation(ViewKind::Chat);
        store.add_message(id, NewMessage::text(MessageRole::User, content));
        assert_eq!(store.conversation(id).unwrap().title, expected);
    }
}

#[test]
fn deleting_current_selects_new_first() {
    let mut store = ConversationStore::new();
    let oldest = store.add_conversation(ViewKind::Chat);
    let middle = store.add_conversation(ViewKind::Image);
    let newest = store.add_conversation(ViewKind::Voice);

    assert!(store.delete_conversation(newest));
    assert_eq!(store.current_conversation_id(), Some(middle));
    // the view is not switched along with the selection
    assert_eq!(store.current_view(), ViewKind::Voice);

    store.select_conversation(oldest);
    assert!(store.delete_conversation(oldest));
    assert_eq!(store.current_conversation_id(), Some(middle));

    assert!(store.delete_conversation(middle));
    assert_eq!(store.current_conversation_id(), None);
    assert!(store.conversations().is_empty());
}

#[test]
fn unknown_ids_leave_state_untouched() {
    let mut store = ConversationStore::new();
    let known = store.add_conversation(ViewKind::Image);
    store.set_current_view(ViewKind::Chat);
    let stranger = chati_core::state::Conversation::new(ViewKind::Voice).id;

    assert!(!store.select_conversation(stranger));
    assert_eq!(store.current_conversation_id(), Some(known));
    assert_eq!(store.current_view(), ViewKind::Chat);

    assert!(store
        .add_message(stranger, NewMessage::text(MessageRole::User, "perdido"))
        .is_none());
    assert!(!store.delete_conversation(stranger));
    assert_eq!(store.conversations().len(), 1);
    assert!(store.conversation(known).unwrap().messages.is_empty());
}

#[test]
fn flags_toggle_independently() {
    let mut store = ConversationStore::new();
    assert!(!store.sidebar_collapsed());
    assert_eq!(store.current_view(), ViewKind::Chat);

    store.toggle_sidebar();
    store.set_is_loading(true);
    assert!(store.sidebar_collapsed());
    assert!(store.is_loading());

    store.toggle_sidebar();
    store.set_current_view(ViewKind::Voice);
    assert!(!store.sidebar_collapsed());
    assert_eq!(store.current_view(), ViewKind::Voice);
}

#[test]
fn sidebar_listing_filters_by_kind() {
    let mut store = ConversationStore::new();
    store.add_conversation(ViewKind::Chat);
    store.add_conversation(ViewKind::Image);
    store.add_conversation(ViewKind::Chat);

    assert_eq!(store.conversations_of(ViewKind::Chat).count(), 2);
    assert_eq!(store.conversations_of(ViewKind::Image).count(), 1);
    assert_eq!(store.conversations_of(ViewKind::Voice).count(), 0);
}

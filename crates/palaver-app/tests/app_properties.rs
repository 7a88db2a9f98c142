//! Property tests for the App state machine on its own.

use palaver_app::{App, AppAction, AppEvent, UserInput};
use palaver_proto::ConversationId;
use proptest::prelude::*;

fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        (0usize..3).prop_map(|c| AppEvent::MessageSent {
            conversation: ConversationId::new(format!("c{c}")),
        }),
        "[a-z ]{0,12}".prop_map(|message| AppEvent::Error { message }),
        any::<bool>().prop_map(|online| AppEvent::Connectivity { online }),
        (0usize..3).prop_map(|c| AppEvent::ConversationDeleted {
            conversation: ConversationId::new(format!("c{c}")),
        }),
    ]
}

proptest! {
    #[test]
    fn prop_blank_drafts_never_send(draft in "[ \t\n]{0,16}") {
        let mut app = App::new();
        app.update_draft(draft);

        let actions = app.submit();

        prop_assert!(actions.is_empty());
    }

    #[test]
    fn prop_submit_sends_draft_unchanged(draft in "[ ]{0,3}[a-z]{1,10}[ ]{0,3}") {
        let mut app = App::new();
        app.update_draft(draft.clone());

        let actions = app.submit();

        // Trimming happens in the client; the App forwards the draft as typed
        prop_assert_eq!(actions.first(), Some(&AppAction::Send { content: draft.clone() }));
        prop_assert_eq!(app.draft(), draft.as_str());
    }

    #[test]
    fn prop_every_event_renders_once(events in prop::collection::vec(event_strategy(), 0..20)) {
        let mut app = App::new();
        for event in events {
            prop_assert_eq!(app.handle(event), vec![AppAction::Render]);
        }
    }

    #[test]
    fn prop_only_message_sent_clears_draft(
        draft in "[a-z]{1,10}",
        events in prop::collection::vec(event_strategy(), 0..20),
    ) {
        let mut app = App::new();
        app.handle_input(UserInput::EditDraft(draft.clone()));

        let sent = events.iter().any(|e| matches!(e, AppEvent::MessageSent { .. }));
        for event in events {
            app.handle(event);
        }

        let expected = if sent { "" } else { draft.as_str() };
        prop_assert_eq!(app.draft(), expected);
    }
}

//! Integration tests for App and Bridge behavior.
//!
//! The test body plays the driver: it routes App actions through the Bridge,
//! serves the queued requests by hand and feeds completions back.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - App state reflects the client's state
//! - The draft survives failures and clears on success
//! - Outgoing work matches what a driver must perform

use palaver_app::{App, AppAction, AppEvent, Bridge, Notice, Outgoing};
use palaver_client::{ClientConfig, Completion, Request, RequestKind, Response, SyncError};
use palaver_core::env::{Environment, test_utils::MockEnv};
use palaver_proto::{AuthToken, ConversationId, Message, MessageId, UserId, ViewerIdentity};

/// Process actions from App through Bridge and update App state.
fn process_actions<E: Environment>(
    app: &mut App,
    bridge: &mut Bridge<E>,
    actions: Vec<AppAction>,
) -> Vec<Outgoing> {
    let mut pending = actions;
    while !pending.is_empty() {
        for action in std::mem::take(&mut pending) {
            match action {
                AppAction::Render | AppAction::Quit => {},
                AppAction::SignIn { .. }
                | AppAction::SignOut
                | AppAction::Select { .. }
                | AppAction::Keystroke
                | AppAction::Send { .. }
                | AppAction::DeleteActive => {
                    for event in bridge.process_app_action(action) {
                        pending.extend(app.handle(event));
                    }
                },
            }
        }
    }

    bridge.take_outgoing()
}

/// Feed a completion back and return resulting outgoing work.
fn complete<E: Environment>(
    app: &mut App,
    bridge: &mut Bridge<E>,
    completion: Completion,
) -> Vec<Outgoing> {
    for event in bridge.handle_completion(completion) {
        app.handle(event);
    }
    bridge.take_outgoing()
}

fn requests(outgoing: &[Outgoing]) -> Vec<Request> {
    outgoing
        .iter()
        .filter_map(|o| match o {
            Outgoing::Request(request) => Some(request.clone()),
            _ => None,
        })
        .collect()
}

fn message(id: &str, conversation: &str, content: &str) -> Message {
    Message {
        id: MessageId::from(id),
        conversation: ConversationId::from(conversation),
        sender: UserId::from("alice"),
        content: content.to_string(),
        created_at: 1_700_000_000_000,
    }
}

/// Signed-in App with `c1` open and loaded empty.
fn ready() -> (App, Bridge<MockEnv>) {
    let mut app = App::new();
    let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());

    let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
    let actions = app.sign_in(identity);
    process_actions(&mut app, &mut bridge, actions);

    let actions = app.select_conversation(Some(ConversationId::from("c1")));
    let outgoing = process_actions(&mut app, &mut bridge, actions);
    let fetch = requests(&outgoing).remove(0);
    complete(&mut app, &mut bridge, Completion::ok(fetch.id, Response::History(Vec::new())));

    (app, bridge)
}

#[test]
fn sign_in_produces_open_and_presence() {
    let mut app = App::new();
    let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());

    let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
    let actions = app.sign_in(identity);
    let outgoing = process_actions(&mut app, &mut bridge, actions);

    assert!(matches!(outgoing.as_slice(), [Outgoing::Open { .. }, Outgoing::Frame(_)]));
    assert_eq!(app.snapshot().viewer, Some(UserId::from("alice")));
}

#[test]
fn select_shows_loading_until_history_arrives() {
    let mut app = App::new();
    let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());
    let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
    let actions = app.sign_in(identity);
    process_actions(&mut app, &mut bridge, actions);

    let actions = app.select_conversation(Some(ConversationId::from("c1")));
    let outgoing = process_actions(&mut app, &mut bridge, actions);
    assert!(app.snapshot().loading);

    let fetch = requests(&outgoing).remove(0);
    let history = vec![message("m1", "c1", "hi")];
    let outgoing =
        complete(&mut app, &mut bridge, Completion::ok(fetch.id, Response::History(history)));

    assert!(!app.snapshot().loading);
    assert_eq!(app.snapshot().messages.len(), 1);
    // Join follows the fetch
    assert!(matches!(outgoing.as_slice(), [Outgoing::Frame(_)]));
}

#[test]
fn draft_survives_failed_send() {
    let (mut app, mut bridge) = ready();

    let actions = app.update_draft("hello".into());
    process_actions(&mut app, &mut bridge, actions);
    let actions = app.submit();
    let outgoing = process_actions(&mut app, &mut bridge, actions);

    let create = requests(&outgoing).remove(0);
    complete(
        &mut app,
        &mut bridge,
        Completion::failed(create.id, SyncError::Network("offline".into())),
    );

    assert_eq!(app.draft(), "hello");
    assert!(matches!(app.notice(), Some(Notice::Error(text)) if text.starts_with("send failed")));
    assert!(app.snapshot().messages.is_empty());
}

#[test]
fn draft_clears_after_persisted_send() {
    let (mut app, mut bridge) = ready();

    let actions = app.update_draft("  hello  ".into());
    process_actions(&mut app, &mut bridge, actions);
    let actions = app.submit();
    let outgoing = process_actions(&mut app, &mut bridge, actions);

    let create = requests(&outgoing).remove(0);
    let RequestKind::CreateMessage { content, .. } = &create.kind else {
        unreachable!("expected create request, got {:?}", create.kind);
    };
    assert_eq!(content, "hello");

    let outgoing = complete(
        &mut app,
        &mut bridge,
        Completion::ok(create.id, Response::Created(message("m1", "c1", "hello"))),
    );

    assert_eq!(app.draft(), "");
    assert_eq!(app.snapshot().messages.len(), 1);
    // The persisted message is relayed to the other participants
    assert!(matches!(outgoing.as_slice(), [Outgoing::Frame(_)]));
}

#[test]
fn delete_clears_selection_and_refreshes() {
    let (mut app, mut bridge) = ready();

    let actions = app.delete_active();
    let outgoing = process_actions(&mut app, &mut bridge, actions);
    let delete = requests(&outgoing).remove(0);
    let outgoing = complete(&mut app, &mut bridge, Completion::ok(delete.id, Response::Deleted));

    assert_eq!(app.snapshot().active, None);
    assert!(matches!(app.notice(), Some(Notice::Info(_))));
    assert!(outgoing.contains(&Outgoing::RefreshConversations));
}

#[test]
fn sign_out_closes_and_clears_view() {
    let (mut app, mut bridge) = ready();
    let actions = app.update_draft("unsent".into());
    process_actions(&mut app, &mut bridge, actions);

    let actions = app.sign_out();
    let outgoing = process_actions(&mut app, &mut bridge, actions);

    assert!(outgoing.iter().any(|o| matches!(o, Outgoing::Close { .. })));
    assert_eq!(app.snapshot().viewer, None);
    assert_eq!(app.snapshot().active, None);
    assert_eq!(app.draft(), "");
}

#[test]
fn transport_restored_rejoins_and_reports_online() {
    let (mut app, mut bridge) = ready();
    app.handle(AppEvent::Connectivity { online: false });

    for event in bridge.handle_transport_restored() {
        app.handle(event);
    }
    let outgoing = bridge.take_outgoing();

    assert!(app.is_online());
    // Presence and join again
    assert_eq!(outgoing.len(), 2);
}

#[test]
fn tick_after_idle_sends_stop_typing() {
    let env = MockEnv::new();
    let mut app = App::new();
    let mut bridge = Bridge::new(env.clone(), ClientConfig::default());
    let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
    let actions = app.sign_in(identity);
    process_actions(&mut app, &mut bridge, actions);
    let actions = app.select_conversation(Some(ConversationId::from("c1")));
    let outgoing = process_actions(&mut app, &mut bridge, actions);
    let fetch = requests(&outgoing).remove(0);
    complete(&mut app, &mut bridge, Completion::ok(fetch.id, Response::History(Vec::new())));

    let actions = app.update_draft("h".into());
    let outgoing = process_actions(&mut app, &mut bridge, actions);
    assert_eq!(outgoing.len(), 1);
    assert!(bridge.next_timeout(env.now()).is_some());

    env.advance(ClientConfig::default().typing_timeout);
    assert_eq!(bridge.next_timeout(env.now()), Some(std::time::Duration::ZERO));
    bridge.handle_tick(env.now());

    assert_eq!(bridge.take_outgoing().len(), 1);
    assert_eq!(bridge.next_timeout(env.now()), None);
}

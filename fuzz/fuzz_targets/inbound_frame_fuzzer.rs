//! Fuzz target for inbound frames reaching a live client
//!
//! Drives a started client through a sequence of selections and frames, both
//! well-formed headers with junk bodies and raw decoded bytes.
//! Rejected frames must surface as errors, and the visible log must never
//! hold a message twice or one from another conversation.

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use palaver_client::{Client, ClientConfig, ClientEvent};
use palaver_core::env::test_utils::MockEnv;
use palaver_proto::{AuthToken, ConversationId, Frame, FrameHeader, Opcode, ViewerIdentity};

const CONVERSATIONS: [&str; 3] = ["c1", "c2", "c3"];

#[derive(Debug, Arbitrary)]
enum Step {
    Select(Option<u8>),
    Frame { opcode: u8, body: Vec<u8> },
    Raw(Vec<u8>),
}

fuzz_target!(|steps: Vec<Step>| {
    let mut client = Client::new(MockEnv::new(), ClientConfig::default());
    let identity = ViewerIdentity::new("alice", AuthToken::new("token"));
    let _ = client.handle(ClientEvent::Start { identity });

    for step in steps {
        let event = match step {
            Step::Select(index) => ClientEvent::SelectConversation {
                conversation: index
                    .map(|i| ConversationId::from(CONVERSATIONS[i as usize % CONVERSATIONS.len()])),
            },
            Step::Frame { opcode, body } => {
                let opcode = Opcode::ALL[opcode as usize % Opcode::ALL.len()];
                ClientEvent::FrameReceived(Frame::new(FrameHeader::new(opcode), Bytes::from(body)))
            },
            Step::Raw(bytes) => match Frame::decode(&bytes) {
                Ok(frame) => ClientEvent::FrameReceived(frame),
                Err(_) => continue,
            },
        };
        let _ = client.handle(event);

        let active = client.active_conversation().cloned();
        let mut seen = HashSet::new();
        for message in client.messages() {
            assert!(seen.insert(message.id.clone()), "duplicate {} in log", message.id);
            assert_eq!(Some(&message.conversation), active.as_ref());
        }
    }
});

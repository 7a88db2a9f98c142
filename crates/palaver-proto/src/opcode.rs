//! Push-channel event names.

/// Operation code identifying the event carried by a frame.
///
/// `Typing` and `StopTyping` travel in both directions: the client emits them
/// for its own keystrokes and the server relays them for other participants.
/// Every other opcode has a single direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Client announces the viewer identity after connecting.
    PresenceRegister = 0x0001,
    /// Client scopes typing relays to a conversation it is viewing.
    JoinConversation = 0x0002,

    /// Someone started typing in a conversation.
    Typing = 0x0010,
    /// Someone stopped typing in a conversation.
    StopTyping = 0x0011,

    /// Client fans a freshly persisted message out to other participants.
    NewMessage = 0x0020,
    /// Server delivers a message to a participant.
    MessageReceived = 0x0021,
}

impl Opcode {
    /// All opcodes, in wire order.
    pub const ALL: [Self; 6] = [
        Self::PresenceRegister,
        Self::JoinConversation,
        Self::Typing,
        Self::StopTyping,
        Self::NewMessage,
        Self::MessageReceived,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value. `None` for values outside the event set.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::PresenceRegister),
            0x0002 => Some(Self::JoinConversation),
            0x0010 => Some(Self::Typing),
            0x0011 => Some(Self::StopTyping),
            0x0020 => Some(Self::NewMessage),
            0x0021 => Some(Self::MessageReceived),
            _ => None,
        }
    }

    /// Whether a client may receive this opcode from the server.
    #[must_use]
    pub const fn is_inbound(self) -> bool {
        matches!(self, Self::Typing | Self::StopTyping | Self::MessageReceived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_stable() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::from_u16(opcode.to_u16()), Some(opcode));
        }
        assert_eq!(Opcode::from_u16(0x0000), None);
        assert_eq!(Opcode::from_u16(0xFFFF), None);
    }

    #[test]
    fn only_relayed_events_are_inbound() {
        assert!(!Opcode::PresenceRegister.is_inbound());
        assert!(!Opcode::JoinConversation.is_inbound());
        assert!(!Opcode::NewMessage.is_inbound());
        assert!(Opcode::Typing.is_inbound());
        assert!(Opcode::StopTyping.is_inbound());
        assert!(Opcode::MessageReceived.is_inbound());
    }
}

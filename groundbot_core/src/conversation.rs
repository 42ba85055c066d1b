//! Per-conversation turn history.

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, Role};

/// A single role-tagged turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Wire message for this turn, with the role collapsed by
    /// [`Role::for_completion`].
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role.for_completion(),
            content: self.content.clone(),
        }
    }
}

/// The stored record for one conversation.
///
/// History is append-only and unbounded; turns stay in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationData {
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl ConversationData {
    #[must_use]
    pub const fn new(history: Vec<ConversationTurn>) -> Self {
        Self { history }
    }

    pub fn add_turn(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ConversationTurn::new(role, content));
    }

    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.history.iter().map(ConversationTurn::to_message).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_turn_preserves_order() {
        let mut data = ConversationData::default();
        assert!(data.is_empty());

        data.add_turn(Role::User, "Hi");
        data.add_turn(Role::Assistant, "Hello!");
        data.add_turn(Role::User, "How are you?");

        assert_eq!(data.len(), 3);
        let contents: Vec<&str> = data.history.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["Hi", "Hello!", "How are you?"]);
    }

    #[test]
    fn messages_map_roles_for_completion() {
        let data = ConversationData::new(vec![
            ConversationTurn::new(Role::System, "be brief"),
            ConversationTurn::new(Role::User, "Hi"),
            ConversationTurn::new(Role::Assistant, "Hello"),
        ]);

        let roles: Vec<Role> = data.messages().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::Assistant, Role::User, Role::Assistant]);
    }

    #[test]
    #[expect(clippy::unwrap_used, reason = "Test failure should panic")]
    fn missing_history_field_is_empty() {
        let data: ConversationData = serde_json::from_str("{}").unwrap();
        assert!(data.is_empty());
    }
}

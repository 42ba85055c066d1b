//! Channel-neutral inbound activities and outbound replies.

use serde::{Deserialize, Serialize};

use crate::CitationCard;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Message,
    ConversationUpdate,
}

/// A participant on a channel: a user or the bot itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An inbound activity as delivered by a hosting channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub conversation_id: String,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub members_added: Vec<ChannelAccount>,
}

impl Activity {
    /// A user message addressed to `recipient`.
    #[must_use]
    pub fn message(
        conversation_id: impl Into<String>,
        from: ChannelAccount,
        recipient: ChannelAccount,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActivityType::Message,
            conversation_id: conversation_id.into(),
            from,
            recipient,
            text: Some(text.into()),
            members_added: Vec::new(),
        }
    }

    /// Members joined the conversation.
    #[must_use]
    pub fn members_added(
        conversation_id: impl Into<String>,
        from: ChannelAccount,
        recipient: ChannelAccount,
        members: Vec<ChannelAccount>,
    ) -> Self {
        Self {
            kind: ActivityType::ConversationUpdate,
            conversation_id: conversation_id.into(),
            from,
            recipient,
            text: None,
            members_added: members,
        }
    }
}

/// Something the bot sends back on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Card(CitationCard),
}

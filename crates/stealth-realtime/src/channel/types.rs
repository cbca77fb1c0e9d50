//! Channel identifiers and parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use stealth_core::types::UserId;

/// Prefix of identity-scoped channels.
const IDENTITY_PREFIX: &str = "user_";
/// Separator between the two participants of a conversation channel.
const SEPARATOR: char = '_';

/// Name of an addressable broadcast group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// The conversation channel of two participants.
    ///
    /// Order-independent: the identities are sorted lexicographically
    /// before joining, so `conversation(a, b) == conversation(b, a)`.
    pub fn conversation(a: UserId, b: UserId) -> Self {
        let (a, b) = (a.to_string(), b.to_string());
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{first}{SEPARATOR}{second}"))
    }

    /// The channel scoped to a single user's identity.
    pub fn identity(user: UserId) -> Self {
        Self(format!("{IDENTITY_PREFIX}{user}"))
    }

    /// Borrow the channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the channel name.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Classify this channel.
    pub fn kind(&self) -> Option<ChannelType> {
        ChannelType::parse(&self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed view of a channel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// A user's own notification scope.
    Identity(UserId),
    /// A two-party conversation, participants in sorted order.
    Conversation(UserId, UserId),
}

impl ChannelType {
    /// Parse a channel name. `None` for anything that is not a well-formed
    /// identity or conversation channel.
    pub fn parse(channel: &str) -> Option<Self> {
        if let Some(id) = channel.strip_prefix(IDENTITY_PREFIX) {
            return id.parse().ok().map(ChannelType::Identity);
        }
        let (a, b) = channel.split_once(SEPARATOR)?;
        let (a, b): (UserId, UserId) = (a.parse().ok()?, b.parse().ok()?);
        (a.to_string() < b.to_string()).then_some(ChannelType::Conversation(a, b))
    }
}

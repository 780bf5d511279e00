use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, Recipient};

mod file;

pub use file::Storage;

/// Reference to a chat as typed by an admin: numeric id or public @username
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelRef {
    Id(i64),
    Username(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelRefError {
    #[error("empty channel reference")]
    Empty,
    #[error("chat id must be a non-zero integer: {0}")]
    ZeroId(String),
    #[error("chat username must be @ followed by 5-32 letters, digits or underscores: {0}")]
    BadUsername(String),
}

impl ChannelRef {
    pub fn recipient(&self) -> Recipient {
        match self {
            Self::Id(id) => Recipient::Id(ChatId(*id)),
            Self::Username(name) => Recipient::ChannelUsername(format!("@{}", name)),
        }
    }

    /// True when the chat described by `id` and `username` is this reference
    pub fn matches(&self, id: ChatId, username: Option<&str>) -> bool {
        match self {
            Self::Id(own) => *own == id.0,
            Self::Username(own) => username.map_or(false, |name| name.eq_ignore_ascii_case(own)),
        }
    }
}

impl FromStr for ChannelRef {
    type Err = ChannelRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ChannelRefError::Empty);
        }
        if let Some(name) = s.strip_prefix('@') {
            let valid_len = (5..=32).contains(&name.len());
            let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            return if valid_len && valid_chars {
                Ok(Self::Username(name.to_owned()))
            } else {
                Err(ChannelRefError::BadUsername(s.to_owned()))
            };
        }
        match s.parse::<i64>() {
            Ok(0) => Err(ChannelRefError::ZeroId(s.to_owned())),
            Ok(id) => Ok(Self::Id(id)),
            Err(_) => Err(ChannelRefError::BadUsername(s.to_owned())),
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Username(name) => write!(f, "@{}", name),
        }
    }
}

/// What the platform told us about a configured chat
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub title: String,
    pub invite_link: Option<String>,
}

impl ChannelInfo {
    /// Name a buyer can find the chat by: its title plus a way in
    pub fn describe(&self, channel: &ChannelRef) -> String {
        match (channel, &self.invite_link) {
            (ChannelRef::Username(_), _) => format!("{} ({})", self.title, channel),
            (ChannelRef::Id(_), Some(link)) => format!("{} ({})", self.title, link),
            (ChannelRef::Id(_), None) => self.title.clone(),
        }
    }
}

/// Channels the shop menu depends on. Both are unset until an admin runs /setup.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShopConfig {
    pub shop_channel_id: Option<ChannelRef>,
    pub ticket_channel_id: Option<ChannelRef>,
}

impl ShopConfig {
    pub fn configured_channels(&self) -> usize {
        [&self.shop_channel_id, &self.ticket_channel_id]
            .iter()
            .filter(|c| c.is_some())
            .count()
    }
}

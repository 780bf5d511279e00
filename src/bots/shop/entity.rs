use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, UserId};
use teloxide::utils::command::BotCommands;

use crate::bots::CallbackMessage;
use crate::persistent::ChannelRef;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show available commands")]
    Help,
    #[command(description = "calculate a gamepass price in USD")]
    Calculate,
    #[command(description = "post the shop menu (admins, shop channel only)")]
    Shop,
    #[command(description = "set shop and ticket channels (admins)", parse_with = "split")]
    Setup { shop_channel: ChannelRef, ticket_channel: ChannelRef },
    #[command(description = "re-register bot commands (admins)")]
    Refresh,
}

impl Command {
    /// Checked against the platform before the controller sees the command
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::Shop | Self::Setup { .. } | Self::Refresh)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Calculate => "calculate",
            Self::Shop => "shop",
            Self::Setup { .. } => "setup",
            Self::Refresh => "refresh",
        }
    }
}

/// Which keyboard a button belongs to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    Giftability,
    BuyGiftable,
    ShopMenu,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Yes,
    No,
    Giftable,
    Currency,
}

/// Payload of an inline button
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CallbackData {
    pub prompt: Prompt,
    pub button: Button,
    /// Only this user may press the button
    pub owner: Option<u64>,
    /// Unix seconds the prompt was shown at
    pub issued: i64,
}

impl CallbackMessage for CallbackData {}

impl CallbackData {
    pub fn owned(prompt: Prompt, button: Button, owner: UserId, issued: DateTime<Utc>) -> Self {
        Self { prompt, button, owner: Some(owner.0), issued: issued.timestamp() }
    }

    pub fn shared(prompt: Prompt, button: Button) -> Self {
        Self { prompt, button, owner: None, issued: 0 }
    }
}

/// Sender id Telegram uses for messages posted on behalf of a channel
pub const CHANNEL_SENDER: UserId = UserId(136_817_688);

/// Who triggered an event and where
#[derive(Clone, Debug, PartialEq)]
pub struct Caller {
    pub user: UserId,
    pub name: String,
    pub chat: ChatId,
    pub chat_username: Option<String>,
}

impl Caller {
    /// Post in a channel; only its admins can write there
    pub fn channel(chat: ChatId, title: Option<&str>, chat_username: Option<&str>) -> Self {
        Self {
            user: CHANNEL_SENDER,
            name: title.unwrap_or("channel").to_owned(),
            chat,
            chat_username: chat_username.map(str::to_owned),
        }
    }

    pub fn is_channel(&self) -> bool {
        self.user == CHANNEL_SENDER
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command { caller: Caller, command: Command },
    Button { caller: Caller, data: CallbackData, now: DateTime<Utc> },
    Text { caller: Caller, text: String },
}

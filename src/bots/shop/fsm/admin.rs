use teloxide::utils::command::{BotCommands, ParseError};

use super::*;
use crate::bots::shop::Flow;
use crate::persistent::ChannelRef;

/// Saves first, so a failed write leaves the running config as it was
pub(super) fn setup(
    config: &mut ShopConfig,
    storage: &Storage,
    shop_channel: ChannelRef,
    ticket_channel: ChannelRef,
) -> anyhow::Result<Reply> {
    let updated = ShopConfig {
        shop_channel_id: Some(shop_channel),
        ticket_channel_id: Some(ticket_channel),
    };
    storage.save(&updated)?;
    log::info!(
        "shop channel set to {:?}, ticket channel set to {:?}",
        updated.shop_channel_id,
        updated.ticket_channel_id
    );
    let mut card = Card::new("✅ Setup Complete", "Run /shop inside the shop channel to post the menu.");
    if let (Some(shop), Some(tickets)) = (&updated.shop_channel_id, &updated.ticket_channel_id) {
        card = card.field("🛒 Shop Channel", shop.to_string()).field(FIELD_TICKETS, tickets.to_string());
    }
    *config = updated;
    Ok(Reply::Message { card, keyboard: vec![] })
}

pub(super) fn help(flow: Flow) -> Card {
    let lines: Vec<_> = Command::bot_commands()
        .into_iter()
        .filter(|c| offered(flow, &c.command))
        .map(|c| format!("/{} - {}", c.command.trim_start_matches('/'), c.description))
        .collect();
    Card::new("🤖 Commands", lines.join("\n"))
}

/// Command names the active flow registers with the platform
pub fn offered(flow: Flow, command: &str) -> bool {
    match command.trim_start_matches('/') {
        "calculate" => flow.calculator(),
        "shop" | "setup" | "refresh" => flow.shop(),
        _ => true,
    }
}

/// Admin-only commands of the active flow never reach the controller from a plain member
pub fn admitted(command: &Command, flow: Flow, privileged: bool) -> bool {
    privileged || !(command.requires_admin() && flow.offers(command))
}

/// Usage card for a command of ours whose arguments did not parse.
/// Unknown commands and commands addressed to other bots are left alone.
pub fn malformed_command(text: &str, bot_name: &str, flow: Flow) -> Option<Card> {
    let error = Command::parse(text, bot_name).err()?;
    let problem = match error {
        ParseError::UnknownCommand(_) | ParseError::WrongBotName(_) => return None,
        ParseError::TooFewArguments { expected, found, .. }
        | ParseError::TooManyArguments { expected, found, .. } => {
            format!("expected {} arguments, got {}", expected, found)
        }
        ParseError::IncorrectFormat(e) => e.to_string(),
        other => format!("{:?}", other),
    };
    let name = text
        .split_whitespace()
        .next()
        .and_then(|word| word.trim_start_matches('/').split('@').next())
        .unwrap_or_default()
        .to_lowercase();
    if !offered(flow, &name) {
        return None;
    }
    log::debug!("malformed /{}: {}", name, problem);
    let card = match name.as_str() {
        "setup" => Card::new("❓ Wrong Command Format", "Usage: /setup <shop_channel> <ticket_channel>")
            .field(FIELD_PROBLEM, problem)
            .field("💡 Channels", "A chat id like -1001234567890 or a public username like @gamepass_shop"),
        other => Card::new("❓ Wrong Command Format", format!("Usage: /{}", other)).field(FIELD_PROBLEM, problem),
    };
    Some(card)
}

pub fn refresh_report(synced: usize, config: &ShopConfig) -> Card {
    Card::new("🔄 Commands Refreshed", format!("Synced {} commands.", synced))
        .field("📡 Configured Channels", format!("{} of 2", config.configured_channels()))
}

pub fn admins_only() -> Card {
    Card::new("⛔ Permission Denied", ADMINS_ONLY)
}

use super::*;
use crate::bots::shop::rate::{format_amount, RATE_UNIT};

fn rate_line(settings: &Settings) -> String {
    format!("{} per {} {}", settings.rate.display(), format_amount(RATE_UNIT), CURRENCY)
}

fn checklist(items: &[&str]) -> String {
    items.iter().map(|item| format!("• {}", item)).collect::<Vec<_>>().join("\n")
}

fn plain(card: Card) -> Reply {
    Reply::Message { card, keyboard: vec![] }
}

/// /shop: posts the never-expiring menu, only inside the configured shop channel
pub(super) fn post(state: &ControllerState, caller: &Caller, settings: &Settings) -> Reply {
    let config = &state.config;
    let (Some(shop), Some(_)) = (&config.shop_channel_id, &config.ticket_channel_id) else {
        return plain(Card::new(
            "⚙️ Setup Required",
            "The shop is not configured yet. An admin has to run /setup <shop_channel> <ticket_channel> first.",
        ));
    };
    if !shop.matches(caller.chat, caller.chat_username.as_deref()) {
        return plain(Card::new(
            "📍 Wrong Channel",
            format!("The shop menu can only be posted in {}.", state.label(shop)),
        ));
    }
    log::info!("shop menu posted in {} by {}", shop, caller.user);
    let card = Card::new(
        "🛒 Gamepass Shop",
        "Pick what you want to buy. You will get the next steps in a private message.",
    )
    .field(FIELD_RATE, rate_line(settings));
    let keyboard = vec![vec![
        KeyButton { label: SHOP_GIFTABLE, data: CallbackData::shared(Prompt::ShopMenu, Button::Giftable) },
        KeyButton { label: SHOP_CURRENCY, data: CallbackData::shared(Prompt::ShopMenu, Button::Currency) },
    ]];
    Reply::Message { card, keyboard }
}

/// Private pointer to the ticket channel with what to bring there
pub(super) fn referral(state: &ControllerState, button: Button, settings: &Settings) -> Reply {
    let Some(tickets) = &state.config.ticket_channel_id else {
        return Reply::Notice("The shop is not configured right now, try again later.".into());
    };
    let (title, items) = match button {
        Button::Currency => ("💎 Buy Robux", CURRENCY_CHECKLIST),
        _ => ("🎁 Buy a Giftable Gamepass", GIFTABLE_CHECKLIST),
    };
    let tickets = state.label(tickets);
    let card = Card::new(title, format!("Open a ticket in {} to finish your purchase.", tickets))
        .field(FIELD_TICKETS, tickets)
        .field(FIELD_RATE, rate_line(settings))
        .field(FIELD_CHECKLIST, checklist(items));
    Reply::Private(card)
}

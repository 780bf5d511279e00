use super::*;
use crate::bots::shop::rate::{format_amount, format_usd, parse_amount, AmountError, RATE_UNIT};

fn giftability_keyboard(owner: UserId, now: DateTime<Utc>) -> Keyboard {
    owned_keyboard(
        Prompt::Giftability,
        &[(GIFTABLE_YES, Button::Yes), (GIFTABLE_NO, Button::No)],
        owner,
        now,
    )
}

/// /calculate: ask whether the gamepass is giftable
pub(super) fn start(caller: &Caller, settings: &Settings, now: DateTime<Utc>) -> Reply {
    let card = Card::new(
        "🎮 Gamepass Price Calculator",
        "Is your gamepass giftable?\n\nGiftable gamepasses can be transferred between accounts.",
    )
    .field(FIELD_RATE, format!("{} per {} {}", settings.rate.display(), format_amount(RATE_UNIT), CURRENCY))
    .footer("Select an option below");
    Reply::Message { card, keyboard: giftability_keyboard(caller.user, now) }
}

/// Channel posts have no author who could answer the prompt
pub(super) fn needs_a_person() -> Reply {
    let card = Card::new(
        "🎮 Gamepass Price Calculator",
        "Run /calculate in a group or in a private chat with me.",
    );
    Reply::Message { card, keyboard: vec![] }
}

pub(super) fn await_amount(pending: &mut HashMap<UserId, Pending>, caller: &Caller) -> Reply {
    pending.insert(caller.user, Pending::AwaitingAmount);
    log::debug!("{} is entering an amount", caller.user);
    let card = Card::new(
        "💰 Enter Gamepass Price",
        format!("Please type the {} amount of your gamepass.\n\nExample: 1000 or 5000", CURRENCY),
    )
    .footer("Type the amount in chat");
    Reply::Edit { card, keyboard: vec![] }
}

pub(super) fn offer_giftable(caller: &Caller, now: DateTime<Utc>) -> Reply {
    let card = Card::new(
        "⚠️ Service Unavailable",
        "Non-giftable gamepasses are currently unavailable.\n\nWould you like to purchase a giftable gamepass instead?",
    );
    let keyboard = owned_keyboard(
        Prompt::BuyGiftable,
        &[(BUY_GIFTABLE_YES, Button::Yes), (BUY_GIFTABLE_NO, Button::No)],
        caller.user,
        now,
    );
    Reply::Edit { card, keyboard }
}

pub(super) fn ask_again(caller: &Caller, now: DateTime<Utc>) -> Reply {
    let card = Card::new(
        "🎁 Giftable Gamepass Purchase",
        "Is YOUR gamepass giftable?\n\nA giftable gamepass allows us to transfer it to you.",
    );
    Reply::Edit { card, keyboard: giftability_keyboard(caller.user, now) }
}

pub(super) fn decline(settings: &Settings) -> Reply {
    let card = Card::new(
        "👋 See You Later!",
        format!(
            "No problem! If you change your mind, use /calculate again.\n\nFor questions, visit #{}",
            settings.referral_channel
        ),
    );
    Reply::Edit { card, keyboard: vec![] }
}

/// Invalid input keeps the user in [`Pending::AwaitingAmount`]
pub(super) fn on_amount(
    pending: &mut HashMap<UserId, Pending>,
    caller: &Caller,
    text: &str,
    settings: &Settings,
) -> Reply {
    let amount = match parse_amount(text) {
        Ok(amount) => amount,
        Err(e) => {
            log::debug!("{} sent a bad amount {:?}: {}", caller.user, text, e);
            let message = match e {
                AmountError::NotANumber => NOT_A_NUMBER,
                AmountError::NotPositive => NOT_POSITIVE,
                AmountError::TooLarge => TOO_LARGE,
            };
            return Reply::Reply(Card::new("Invalid Amount", message));
        }
    };
    let rate = settings.rate;
    let card = Card::new(
        "💵 Price Calculation",
        format!("Gamepass Price: {} {}", format_amount(amount), CURRENCY),
    )
    .field(FIELD_COST, format_usd(rate.usd(amount)))
    .field(FIELD_CALCULATION, rate.breakdown(amount))
    .field(FIELD_NEXT_STEP, format!("To purchase, create a ticket in #{}", settings.referral_channel))
    .footer(format!("Requested by {}", caller.name));
    pending.remove(&caller.user);
    log::info!("priced {} {} for {}", amount, CURRENCY, caller.user);
    Reply::Reply(card)
}

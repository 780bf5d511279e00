use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use super::card::{Card, KeyButton, Keyboard, Reply};
use super::entity::{Button, CallbackData, Caller, Command, Event, Prompt};
use super::res::*;
use super::Settings;
use crate::persistent::{ChannelInfo, ChannelRef, ShopConfig, Storage};

mod admin;
mod calculate;
mod menu;

pub use admin::{admins_only, admitted, malformed_command, offered, refresh_report};

/// Seconds after which buttons of the /calculate negotiation go inert
pub const PROMPT_TTL_SECS: i64 = 180;

/// Per-user state waiting on a free text answer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pending {
    AwaitingAmount,
}

#[derive(Debug, Default)]
pub struct ControllerState {
    pub config: ShopConfig,
    pub pending: HashMap<UserId, Pending>,
    /// Titles and links of configured chats, resolved by the platform adapter
    pub chats: HashMap<ChannelRef, ChannelInfo>,
}

impl ControllerState {
    /// How a configured chat is shown to users
    pub fn label(&self, channel: &ChannelRef) -> String {
        match self.chats.get(channel) {
            Some(info) => info.describe(channel),
            None => channel.to_string(),
        }
    }
}

/// Owns everything the handlers share; one instance per running bot
pub struct Controller {
    settings: Settings,
    storage: Storage,
    state: Mutex<ControllerState>,
}

impl Controller {
    pub fn new(settings: Settings, storage: Storage) -> Self {
        let config = storage.load();
        Self {
            settings,
            storage,
            state: Mutex::new(ControllerState { config, ..Default::default() }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> ShopConfig {
        self.lock().config.clone()
    }

    pub fn pending(&self, user: UserId) -> Option<Pending> {
        self.lock().pending.get(&user).copied()
    }

    pub fn remember_chat(&self, channel: ChannelRef, info: ChannelInfo) {
        log::info!("{} is {:?}", channel, info.title);
        self.lock().chats.insert(channel, info);
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn process(&self, event: Event) -> anyhow::Result<Reply> {
        match event {
            Event::Command { caller, command } => self.on_command(&caller, command),
            Event::Button { caller, data, now } => Ok(self.on_button(&caller, &data, now)),
            Event::Text { caller, text } => Ok(self.on_text(&caller, &text)),
        }
    }

    fn on_command(&self, caller: &Caller, command: Command) -> anyhow::Result<Reply> {
        if !self.settings.flow.offers(&command) {
            return Ok(not_enabled(command.name()));
        }
        let reply = match command {
            Command::Help => Reply::Message { card: admin::help(self.settings.flow), keyboard: vec![] },
            Command::Calculate if caller.is_channel() => calculate::needs_a_person(),
            Command::Calculate => calculate::start(caller, &self.settings, Utc::now()),
            Command::Shop => menu::post(&self.lock(), caller, &self.settings),
            Command::Setup { shop_channel, ticket_channel } => {
                let mut state = self.lock();
                admin::setup(&mut state.config, &self.storage, shop_channel, ticket_channel)?
            }
            Command::Refresh => Reply::SyncCommands,
        };
        Ok(reply)
    }

    fn on_button(&self, caller: &Caller, data: &CallbackData, now: DateTime<Utc>) -> Reply {
        if let Some(owner) = data.owner {
            if now.timestamp() - data.issued > PROMPT_TTL_SECS {
                log::debug!("expired {:?} button pressed by {}", data.prompt, caller.user);
                return Reply::Ignore;
            }
            if owner != caller.user.0 {
                return Reply::Notice(NOT_YOURS.into());
            }
        }
        if !self.settings.flow.serves(data.prompt) {
            return Reply::Notice(UNKNOWN_BUTTON.into());
        }
        match (data.prompt, data.button) {
            (Prompt::Giftability, Button::Yes) => {
                calculate::await_amount(&mut self.lock().pending, caller)
            }
            (Prompt::Giftability, Button::No) => calculate::offer_giftable(caller, now),
            (Prompt::BuyGiftable, Button::Yes) => calculate::ask_again(caller, now),
            (Prompt::BuyGiftable, Button::No) => calculate::decline(&self.settings),
            (Prompt::ShopMenu, button @ (Button::Giftable | Button::Currency)) => {
                menu::referral(&self.lock(), button, &self.settings)
            }
            (prompt, button) => {
                log::warn!("no transition for {:?}/{:?}", prompt, button);
                Reply::Notice(UNKNOWN_BUTTON.into())
            }
        }
    }

    fn on_text(&self, caller: &Caller, text: &str) -> Reply {
        if !self.settings.flow.calculator() || text.starts_with('/') {
            return Reply::Ignore;
        }
        let mut state = self.lock();
        let pending = state.pending.get(&caller.user).copied();
        match pending {
            Some(Pending::AwaitingAmount) => {
                calculate::on_amount(&mut state.pending, caller, text, &self.settings)
            }
            None => Reply::Ignore,
        }
    }
}

fn not_enabled(command: &str) -> Reply {
    let card = Card::new("🚫 Not Available", format!("/{} is not enabled in this bot.", command));
    Reply::Message { card, keyboard: vec![] }
}

fn owned_keyboard(prompt: Prompt, buttons: &[(&'static str, Button)], owner: UserId, now: DateTime<Utc>) -> Keyboard {
    vec![buttons
        .iter()
        .map(|&(label, button)| KeyButton { label, data: CallbackData::owned(prompt, button, owner, now) })
        .collect()]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bots::shop::rate::Rate;
    use crate::bots::shop::Flow;
    use crate::persistent::ChannelRef;
    use chrono::Duration;
    use teloxide::types::ChatId;

    pub(crate) const ALICE: UserId = UserId(1001);
    pub(crate) const BOB: UserId = UserId(2002);

    pub(crate) fn caller(user: UserId, chat: i64) -> Caller {
        Caller { user, name: format!("user{}", user.0), chat: ChatId(chat), chat_username: None }
    }

    pub(crate) fn controller(flow: Flow, dir: &tempfile::TempDir) -> Controller {
        let settings = Settings {
            flow,
            rate: Rate::new(7.0).unwrap(),
            referral_channel: "tickets".into(),
        };
        Controller::new(settings, Storage::new(dir.path().join("shop-config.ron")))
    }

    fn command(ctl: &Controller, who: Caller, command: Command) -> Reply {
        ctl.process(Event::Command { caller: who, command }).unwrap()
    }

    fn press(ctl: &Controller, who: Caller, data: CallbackData) -> Reply {
        ctl.process(Event::Button { caller: who, data, now: Utc::now() }).unwrap()
    }

    fn say(ctl: &Controller, who: Caller, text: &str) -> Reply {
        ctl.process(Event::Text { caller: who, text: text.into() }).unwrap()
    }

    /// Data of the button labelled `label` in the reply keyboard
    fn button(reply: &Reply, label: &str) -> CallbackData {
        reply
            .keyboard()
            .and_then(|k| k.iter().flatten().find(|b| b.label == label))
            .map(|b| b.data.clone())
            .unwrap_or_else(|| panic!("no {label} button in {reply:?}"))
    }

    fn start_awaiting(ctl: &Controller) {
        let prompt = command(ctl, caller(ALICE, -1), Command::Calculate);
        let reply = press(ctl, caller(ALICE, -1), button(&prompt, GIFTABLE_YES));
        assert!(matches!(reply, Reply::Edit { .. }));
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));
    }

    #[test]
    fn giftable_amount_is_priced_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        start_awaiting(&ctl);

        let reply = say(&ctl, caller(ALICE, -1), "1000");
        let Reply::Reply(card) = reply else { panic!("expected a reply card") };
        assert_eq!(card.field_value(FIELD_COST), Some("$7.00"));
        assert_eq!(card.field_value(FIELD_CALCULATION), Some("1,000 ÷ 1,000 × $7 = $7.00"));
        assert!(card.field_value(FIELD_NEXT_STEP).unwrap().contains("#tickets"));
        assert_eq!(ctl.pending(ALICE), None);
    }

    #[test]
    fn separators_price_the_same() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        start_awaiting(&ctl);
        let with_separator = say(&ctl, caller(ALICE, -1), "1,000");
        start_awaiting(&ctl);
        let plain = say(&ctl, caller(ALICE, -1), "1000");
        assert_eq!(with_separator, plain);
        assert_eq!(ctl.pending(ALICE), None);
    }

    #[test]
    fn bad_amounts_keep_listening() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        start_awaiting(&ctl);

        let negative = say(&ctl, caller(ALICE, -1), "-5");
        assert_eq!(negative.card().map(|c| c.description.as_str()), Some(NOT_POSITIVE));
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));

        let garbage = say(&ctl, caller(ALICE, -1), "abc");
        assert_eq!(garbage.card().map(|c| c.description.as_str()), Some(NOT_A_NUMBER));
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));

        for text in ["0", "1.5", "lots", "-1,000"] {
            assert!(matches!(say(&ctl, caller(ALICE, -1), text), Reply::Reply(_)));
            assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));
        }

        let priced = say(&ctl, caller(ALICE, -1), "2,000");
        assert_eq!(priced.card().and_then(|c| c.field_value(FIELD_COST)), Some("$14.00"));
        assert_eq!(ctl.pending(ALICE), None);
    }

    #[test]
    fn amount_is_captured_in_any_chat() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        start_awaiting(&ctl);
        assert!(matches!(say(&ctl, caller(ALICE, -999), "1000"), Reply::Reply(_)));
    }

    #[test]
    fn text_without_pending_state_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        assert_eq!(say(&ctl, caller(BOB, -1), "1000"), Reply::Ignore);
        start_awaiting(&ctl);
        assert_eq!(say(&ctl, caller(BOB, -1), "1000"), Reply::Ignore);
        assert_eq!(say(&ctl, caller(ALICE, -1), "/calculate"), Reply::Ignore);
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));
    }

    #[test]
    fn foreign_clicks_are_rejected_without_state_change() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        let prompt = command(&ctl, caller(ALICE, -1), Command::Calculate);
        for label in [GIFTABLE_YES, GIFTABLE_NO] {
            let reply = press(&ctl, caller(BOB, -1), button(&prompt, label));
            assert_eq!(reply, Reply::Notice(NOT_YOURS.into()));
        }
        assert_eq!(ctl.pending(ALICE), None);
        assert_eq!(ctl.pending(BOB), None);
    }

    #[test]
    fn expired_prompt_is_inert() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        let prompt = command(&ctl, caller(ALICE, -1), Command::Calculate);
        let later = Utc::now() + Duration::seconds(PROMPT_TTL_SECS + 5);
        let event = Event::Button { caller: caller(ALICE, -1), data: button(&prompt, GIFTABLE_YES), now: later };
        assert_eq!(ctl.process(event).unwrap(), Reply::Ignore);
        assert_eq!(ctl.pending(ALICE), None);
    }

    #[test]
    fn not_giftable_loops_back_or_declines() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        let prompt = command(&ctl, caller(ALICE, -1), Command::Calculate);

        let offer = press(&ctl, caller(ALICE, -1), button(&prompt, GIFTABLE_NO));
        assert!(matches!(offer, Reply::Edit { .. }));
        assert_eq!(ctl.pending(ALICE), None);

        let declined = press(&ctl, caller(ALICE, -1), button(&offer, BUY_GIFTABLE_NO));
        assert!(matches!(&declined, Reply::Edit { keyboard, .. } if keyboard.is_empty()));
        assert!(declined.card().unwrap().description.contains("/calculate"));
        assert_eq!(ctl.pending(ALICE), None);

        let again = press(&ctl, caller(ALICE, -1), button(&offer, BUY_GIFTABLE_YES));
        let giftable = button(&again, GIFTABLE_YES);
        assert_eq!(giftable.prompt, Prompt::Giftability);
        press(&ctl, caller(ALICE, -1), giftable);
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));
    }

    #[test]
    fn concurrent_users_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Calculator, &dir);
        start_awaiting(&ctl);
        let bob_prompt = command(&ctl, caller(BOB, -2), Command::Calculate);
        press(&ctl, caller(BOB, -2), button(&bob_prompt, GIFTABLE_YES));

        say(&ctl, caller(BOB, -2), "3000");
        assert_eq!(ctl.pending(BOB), None);
        assert_eq!(ctl.pending(ALICE), Some(Pending::AwaitingAmount));
    }

    #[test]
    fn setup_then_shop_in_the_right_channel() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Shop, &dir);
        let setup = Command::Setup { shop_channel: ChannelRef::Id(-100), ticket_channel: ChannelRef::Id(-200) };
        let done = command(&ctl, caller(ALICE, -5), setup);
        assert!(matches!(done, Reply::Message { .. }));

        let menu = command(&ctl, caller(ALICE, -100), Command::Shop);
        assert_eq!(button(&menu, SHOP_GIFTABLE).prompt, Prompt::ShopMenu);

        let elsewhere = command(&ctl, caller(ALICE, -300), Command::Shop);
        assert!(matches!(elsewhere, Reply::Message { ref keyboard, .. } if keyboard.is_empty()));
        assert!(elsewhere.card().unwrap().description.contains("-100"));

        let reloaded = controller(Flow::Shop, &dir);
        assert_eq!(reloaded.config(), ctl.config());
    }

    #[test]
    fn shop_before_setup_points_at_setup() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Shop, &dir);
        let reply = command(&ctl, caller(ALICE, -100), Command::Shop);
        assert!(reply.card().unwrap().description.contains("/setup"));
        assert!(reply.keyboard().unwrap().is_empty());
    }

    #[test]
    fn menu_buttons_refer_privately_to_tickets() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Both, &dir);
        let setup = Command::Setup {
            shop_channel: ChannelRef::Username("gamepass_shop".into()),
            ticket_channel: ChannelRef::Username("gamepass_tickets".into()),
        };
        command(&ctl, caller(ALICE, -5), setup);
        let mut shop_chat = caller(ALICE, -100);
        shop_chat.chat_username = Some("gamepass_shop".into());
        let menu = command(&ctl, shop_chat, Command::Shop);

        for label in [SHOP_GIFTABLE, SHOP_CURRENCY] {
            let reply = press(&ctl, caller(BOB, -100), button(&menu, label));
            let Reply::Private(card) = reply else { panic!("expected a private card") };
            assert_eq!(card.field_value(FIELD_TICKETS), Some("@gamepass_tickets"));
            assert!(card.field_value(FIELD_RATE).unwrap().contains("$7.00"));
            assert!(card.field_value(FIELD_CHECKLIST).is_some());
        }
        assert_eq!(ctl.pending(BOB), None);
    }

    #[test]
    fn failed_setup_write_leaves_config_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings { flow: Flow::Shop, rate: Rate::new(7.0).unwrap(), referral_channel: "t".into() };
        let ctl = Controller::new(settings, Storage::new(dir.path().join("missing").join("cfg.ron")));
        let setup = Command::Setup { shop_channel: ChannelRef::Id(-1), ticket_channel: ChannelRef::Id(-2) };
        assert!(ctl.process(Event::Command { caller: caller(ALICE, -1), command: setup }).is_err());
        assert_eq!(ctl.config(), ShopConfig::default());
    }

    #[test]
    fn disabled_flows_refuse_their_commands() {
        let dir = tempfile::tempdir().unwrap();
        let calculator = controller(Flow::Calculator, &dir);
        let reply = command(&calculator, caller(ALICE, -1), Command::Shop);
        assert!(reply.card().unwrap().description.contains("/shop"));

        let shop = controller(Flow::Shop, &dir);
        let reply = command(&shop, caller(ALICE, -1), Command::Calculate);
        assert!(reply.card().unwrap().description.contains("/calculate"));
        assert_eq!(say(&shop, caller(ALICE, -1), "1000"), Reply::Ignore);
    }

    #[test]
    fn shop_menu_can_be_posted_in_a_channel() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Both, &dir);
        let setup = Command::Setup {
            shop_channel: ChannelRef::Username("gamepass_shop".into()),
            ticket_channel: ChannelRef::Id(-200),
        };
        command(&ctl, caller(ALICE, -5), setup);
        let channel = Caller::channel(ChatId(-100), Some("Gamepass Shop"), Some("gamepass_shop"));

        let menu = command(&ctl, channel.clone(), Command::Shop);
        assert_eq!(button(&menu, SHOP_CURRENCY).owner, None);

        let calculate = command(&ctl, channel, Command::Calculate);
        assert!(calculate.keyboard().unwrap().is_empty());
        assert!(calculate.card().unwrap().description.contains("private chat"));
    }

    #[test]
    fn referrals_use_resolved_ticket_chat() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Shop, &dir);
        let setup = Command::Setup { shop_channel: ChannelRef::Id(-100), ticket_channel: ChannelRef::Id(-200) };
        command(&ctl, caller(ALICE, -5), setup);
        let info = ChannelInfo { title: "Tickets".into(), invite_link: Some("https://t.me/+tix".into()) };
        ctl.remember_chat(ChannelRef::Id(-200), info);

        let menu = command(&ctl, caller(ALICE, -100), Command::Shop);
        let Reply::Private(card) = press(&ctl, caller(BOB, -100), button(&menu, SHOP_GIFTABLE)) else {
            panic!("expected a private card");
        };
        assert_eq!(card.field_value(FIELD_TICKETS), Some("Tickets (https://t.me/+tix)"));
    }

    #[test]
    fn refresh_asks_for_sync() {
        let dir = tempfile::tempdir().unwrap();
        let ctl = controller(Flow::Both, &dir);
        assert_eq!(command(&ctl, caller(ALICE, -1), Command::Refresh), Reply::SyncCommands);
    }
}

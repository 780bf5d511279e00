use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use teloxide::dispatching::update_listeners::UpdateListener;
use teloxide::dispatching::{DpHandlerDescription, UpdateFilterExt};
use teloxide::error_handlers::ErrorHandler;
use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters};
use teloxide::stop::StopToken;
use teloxide::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, Me, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::{ApiError, RequestError};

use super::*;
use super::card::{Card, Keyboard, Reply};
use super::entity::{CallbackData, Caller, Event};
use super::fsm::Controller;
use crate::bots::{make_username, CallbackMessage};
use crate::impls::LoggableErrorResult;
use crate::persistent::ChannelInfo;

type HandlerResult = anyhow::Result<()>;
type ShopHandler = Handler<'static, DependencyMap, HandlerResult, DpHandlerDescription>;
type Ctl = Arc<Controller>;

/// Connects to Telegram and serves updates until ctrl-c or a rejected token
pub async fn run(token: String, controller: Controller) -> anyhow::Result<()> {
    let bot = Bot::new(token).throttle(Default::default());
    let me = bot.get_me().await.context("cannot log in to Telegram, check the bot token")?;
    let flow = controller.settings().flow;
    let synced = sync_commands(&bot, flow).await.context("cannot register bot commands")?;

    let settings = controller.settings();
    let config = controller.config();
    log::info!("Bot @{} is ready ({:?} flow, {} commands)", me.username(), flow, synced);
    log::info!("Rate: {} per 1,000 {}", settings.rate.display(), super::res::CURRENCY);
    log::info!("Referral channel: #{}", settings.referral_channel);
    log::info!(
        "Shop channel: {}, ticket channel: {}",
        config.shop_channel_id.map(|c| c.to_string()).unwrap_or_else(|| "not set".into()),
        config.ticket_channel_id.map(|c| c.to_string()).unwrap_or_else(|| "not set".into()),
    );

    resolve_channels(&bot, &controller).await;

    let controller: Ctl = Arc::new(controller);
    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build();
    let mut listener = teloxide::dispatching::update_listeners::polling_default(bot).await;
    let stop_token = listener.stop_token();
    dispatcher
        .dispatch_with_listener(listener, Arc::new(StoppableErrorHandler(stop_token)))
        .await;
    log::info!("Bot @{} stopped", me.username());
    Ok(())
}

fn schema() -> ShopHandler {
    let message_handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(on_command))
        .branch(dptree::endpoint(on_text));
    let channel_handler = Update::filter_channel_post()
        .branch(dptree::entry().filter_command::<Command>().endpoint(on_channel_command))
        .branch(dptree::endpoint(on_channel_text));
    let callback_handler = Update::filter_callback_query().endpoint(on_callback);
    dptree::entry()
        .branch(message_handler)
        .branch(channel_handler)
        .branch(callback_handler)
}

fn message_caller(msg: &Message) -> Option<Caller> {
    let user = msg.from().filter(|u| !u.is_bot)?;
    Some(Caller {
        user: user.id,
        name: make_username(user),
        chat: msg.chat.id,
        chat_username: msg.chat.username().map(str::to_owned),
    })
}

fn channel_caller(msg: &Message) -> Caller {
    Caller::channel(msg.chat.id, msg.chat.title(), msg.chat.username())
}

fn callback_caller(q: &CallbackQuery) -> Caller {
    let (chat, chat_username) = match &q.message {
        Some(msg) => (msg.chat.id, msg.chat.username().map(str::to_owned)),
        None => (ChatId::from(q.from.id), None),
    };
    Caller { user: q.from.id, name: make_username(&q.from), chat, chat_username }
}

async fn on_command(bot: WBot, msg: Message, command: Command, ctl: Ctl) -> HandlerResult {
    let Some(caller) = message_caller(&msg) else { return Ok(()) };
    let flow = ctl.settings().flow;
    let privileged = command.requires_admin() && flow.offers(&command) && is_admin(&bot, &caller).await;
    run_command(&bot, caller, command, privileged, &ctl).await
}

/// Only channel admins can post in a channel
async fn on_channel_command(bot: WBot, msg: Message, command: Command, ctl: Ctl) -> HandlerResult {
    run_command(&bot, channel_caller(&msg), command, true, &ctl).await
}

async fn run_command(bot: &WBot, caller: Caller, command: Command, privileged: bool, ctl: &Ctl) -> HandlerResult {
    log::info!("/{} from {} in {}", command.name(), caller.name, caller.chat);
    let chat = caller.chat;
    let flow = ctl.settings().flow;
    if !super::fsm::admitted(&command, flow, privileged) {
        log::warn!("{} is not allowed to run /{} in {}", caller.name, command.name(), chat);
        return send_card(bot, chat, &super::fsm::admins_only(), &Keyboard::new()).await;
    }
    let is_setup = matches!(command, Command::Setup { .. });
    let reply = ctl.process(Event::Command { caller, command }).unwrap_or_else(|e| {
        log::error!("command failed: {:?}", e);
        Reply::Message { card: failure(&e), keyboard: vec![] }
    });
    match reply {
        Reply::SyncCommands => {
            let card = match sync_commands(bot, flow).await {
                Ok(synced) => super::fsm::refresh_report(synced, &ctl.config()),
                Err(e) => {
                    log::error!("cannot refresh commands: {}", e);
                    failure(&anyhow::Error::from(e))
                }
            };
            send_card(bot, chat, &card, &Keyboard::new()).await?;
        }
        Reply::Message { card, keyboard } => send_card(bot, chat, &card, &keyboard).await?,
        Reply::Reply(card) | Reply::Private(card) | Reply::Edit { card, .. } => {
            send_card(bot, chat, &card, &Keyboard::new()).await?
        }
        Reply::Notice(text) => {
            bot.send_message(chat, text).await?;
        }
        Reply::Ignore => {}
    }
    if is_setup {
        resolve_channels(bot, ctl).await;
    }
    Ok(())
}

async fn on_text(bot: WBot, msg: Message, me: Me, ctl: Ctl) -> HandlerResult {
    let (Some(caller), Some(text)) = (message_caller(&msg), msg.text()) else { return Ok(()) };
    if text.starts_with('/') {
        return usage_hint(&bot, &msg, text, &me, &ctl).await;
    }
    match ctl.process(Event::Text { caller, text: text.to_owned() })? {
        Reply::Ignore => {}
        Reply::Reply(card) => {
            bot.send_message(msg.chat.id, card.to_html())
                .parse_mode(ParseMode::Html)
                .reply_to_message_id(msg.id)
                .await?;
        }
        other => log::warn!("unexpected reply to text: {:?}", other),
    }
    Ok(())
}

async fn on_channel_text(bot: WBot, msg: Message, me: Me, ctl: Ctl) -> HandlerResult {
    match msg.text() {
        Some(text) if text.starts_with('/') => usage_hint(&bot, &msg, text, &me, &ctl).await,
        _ => Ok(()),
    }
}

/// Commands of ours that failed to parse get their usage instead of silence
async fn usage_hint(bot: &WBot, msg: &Message, text: &str, me: &Me, ctl: &Ctl) -> HandlerResult {
    let Some(card) = super::fsm::malformed_command(text, me.username(), ctl.settings().flow) else {
        return Ok(());
    };
    bot.send_message(msg.chat.id, card.to_html())
        .parse_mode(ParseMode::Html)
        .reply_to_message_id(msg.id)
        .await?;
    Ok(())
}

async fn on_callback(bot: WBot, q: CallbackQuery, ctl: Ctl) -> HandlerResult {
    let Some(data) = q.data.as_deref().and_then(|d| CallbackData::decode(d).ok_or_log()) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let caller = callback_caller(&q);
    let delivered = match ctl.process(Event::Button { caller, data, now: Utc::now() }) {
        Ok(reply) => deliver_button_reply(&bot, &q, reply).await,
        Err(e) => Err(e),
    };
    let (alert, result) = callback_answer(delivered);
    let answer = bot.answer_callback_query(q.id.clone());
    match alert {
        Some(text) => answer.text(text).show_alert(true).await?,
        None => answer.await?,
    };
    result
}

/// Sends what the button produced; `Some` is an alert for the clicking user
async fn deliver_button_reply(bot: &WBot, q: &CallbackQuery, reply: Reply) -> anyhow::Result<Option<String>> {
    let user_chat = ChatId::from(q.from.id);
    match reply {
        Reply::Notice(text) => return Ok(Some(text)),
        Reply::Private(card) => {
            if send_card(bot, user_chat, &card, &Keyboard::new()).await.ok_or_log().is_none() {
                return Ok(Some(super::res::OPEN_PRIVATE_CHAT.to_owned()));
            }
        }
        Reply::Edit { card, keyboard } => match &q.message {
            Some(prompt) => {
                let edit = bot
                    .edit_message_text(prompt.chat.id, prompt.id, card.to_html())
                    .parse_mode(ParseMode::Html);
                if keyboard.is_empty() {
                    edit.await?;
                } else {
                    edit.reply_markup(markup(&keyboard)?).await?;
                }
            }
            None => send_card(bot, user_chat, &card, &keyboard).await?,
        },
        Reply::Message { card, keyboard } => {
            let chat = q.message.as_ref().map_or(user_chat, |m| m.chat.id);
            send_card(bot, chat, &card, &keyboard).await?;
        }
        other @ (Reply::Reply(_) | Reply::SyncCommands) => log::warn!("unexpected reply to button: {:?}", other),
        Reply::Ignore => {}
    }
    Ok(None)
}

/// The query is answered whatever happened, so the button never keeps spinning
fn callback_answer(delivered: anyhow::Result<Option<String>>) -> (Option<String>, HandlerResult) {
    match delivered {
        Ok(alert) => (alert, Ok(())),
        Err(e) => (None, Err(e)),
    }
}

async fn send_card(bot: &WBot, chat: ChatId, card: &Card, keyboard: &Keyboard) -> HandlerResult {
    let request = bot.send_message(chat, card.to_html()).parse_mode(ParseMode::Html);
    if keyboard.is_empty() {
        request.await?;
    } else {
        request.reply_markup(markup(keyboard)?).await?;
    }
    Ok(())
}

fn markup(keyboard: &Keyboard) -> anyhow::Result<InlineKeyboardMarkup> {
    let mut rows = Vec::with_capacity(keyboard.len());
    for row in keyboard {
        let mut buttons = Vec::with_capacity(row.len());
        for button in row {
            buttons.push(InlineKeyboardButton::callback(button.label, button.data.encode()?));
        }
        rows.push(buttons);
    }
    Ok(InlineKeyboardMarkup::new(rows))
}

async fn is_admin(bot: &WBot, caller: &Caller) -> bool {
    match bot.get_chat_member(caller.chat, caller.user).await {
        Ok(member) => member.is_privileged(),
        Err(e) => {
            log::warn!("cannot check rights of {} in {}: {}", caller.user, caller.chat, e);
            false
        }
    }
}

/// Looks up titles and invite links of the configured chats
async fn resolve_channels(bot: &WBot, ctl: &Controller) {
    let config = ctl.config();
    for channel in [config.shop_channel_id, config.ticket_channel_id].into_iter().flatten() {
        match bot.get_chat(channel.recipient()).await {
            Ok(chat) => {
                let title = chat
                    .title()
                    .map(str::to_owned)
                    .unwrap_or_else(|| channel.to_string());
                let invite_link = chat.invite_link().map(str::to_owned);
                ctl.remember_chat(channel, ChannelInfo { title, invite_link });
            }
            Err(e) => log::warn!("cannot look up {}, is the bot a member? {}", channel, e),
        }
    }
}

fn enabled_commands(flow: Flow) -> Vec<BotCommand> {
    Command::bot_commands()
        .into_iter()
        .filter(|c| super::fsm::offered(flow, &c.command))
        .collect()
}

async fn sync_commands(bot: &WBot, flow: Flow) -> Result<usize, RequestError> {
    let commands = enabled_commands(flow);
    let synced = commands.len();
    bot.set_my_commands(commands).await?;
    Ok(synced)
}

fn failure(error: &anyhow::Error) -> Card {
    Card::new("⚠️ Something Went Wrong", error.to_string())
}

/// Telegram answers a bad token with 404, a revoked one with 401
fn token_rejected(error: &RequestError) -> bool {
    match error {
        RequestError::Api(ApiError::NotFound) => true,
        RequestError::Api(ApiError::Unknown(description)) => description.contains("Unauthorized"),
        _ => false,
    }
}

struct StoppableErrorHandler(StopToken);

impl ErrorHandler<RequestError> for StoppableErrorHandler {
    fn handle_error(self: Arc<Self>, error: RequestError) -> futures_util::future::BoxFuture<'static, ()> {
        log::error!("{}", error);
        if token_rejected(&error) {
            self.0.stop();
            log::info!("Bot stopped");
        }
        Box::pin(async {})
    }
}

//! Telegram handlers for the settings menu.

use std::collections::HashSet;
use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::buckets::{BucketStore, RatingBucket};
use crate::settings::menu::{self, MenuAction};
use crate::settings::session::{EditSession, PromptInput, Sessions};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    #[command(description = "Настройка GPT-ответов на отзывы")]
    GptSetup,
}

const ACCESS_DENIED: &str = "❌ У вас нет доступа к настройкам.";
const NO_BUCKET_SELECTED: &str = "❌ Ошибка: не выбрана оценка для редактирования.";

pub struct SettingsState {
    pub store: BucketStore,
    pub authorized_users: HashSet<UserId>,
    pub sessions: Sessions,
}

impl SettingsState {
    pub fn new(store: BucketStore, authorized_users: HashSet<UserId>) -> Self {
        Self { store, authorized_users, sessions: Sessions::new() }
    }

    fn is_authorized(&self, user_id: UserId) -> bool {
        self.authorized_users.contains(&user_id)
    }
}

/// Update handler tree for the settings menu.
pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::endpoint(handle_prompt_input)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

/// Send the main menu as a new message.
async fn send_main_menu(bot: &Bot, state: &SettingsState, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(chat_id, menu::MAIN_MENU_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_keyboard(&state.store.load()))
        .await?;
    Ok(())
}

/// Re-render the main menu in place.
async fn edit_main_menu(bot: &Bot, state: &SettingsState, chat_id: ChatId, message_id: MessageId) {
    let result = bot
        .edit_message_text(chat_id, message_id, menu::MAIN_MENU_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(menu::main_keyboard(&state.store.load()))
        .await;
    if let Err(e) = result {
        warn!("Failed to render settings menu: {e}");
    }
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command, state: Arc<SettingsState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    match cmd {
        Command::GptSetup => {
            info!("/gpt_setup from user {}", user.id);
            if !state.is_authorized(user.id) {
                warn!("Settings access attempt from unauthorized user {}", user.id);
                bot.send_message(msg.chat.id, ACCESS_DENIED).await?;
                return Ok(());
            }

            state.sessions.finish(msg.chat.id).await;
            if let Err(e) = send_main_menu(&bot, &state, msg.chat.id).await {
                warn!("Failed to show settings menu: {e}");
                bot.send_message(
                    msg.chat.id,
                    "❌ Произошла ошибка при открытии меню настроек. Попробуйте позже.",
                )
                .await?;
            }
        }
    }

    Ok(())
}

/// Text sent while an edit session is open replaces the bucket's prompt.
async fn handle_prompt_input(bot: Bot, msg: Message, state: Arc<SettingsState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let Some(session) = state.sessions.get(chat_id).await else {
        return Ok(());
    };
    if !msg.from.as_ref().is_some_and(|u| state.is_authorized(u.id)) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    state.sessions.finish(chat_id).await;

    match PromptInput::classify(text) {
        PromptInput::Back => {
            bot.send_message(chat_id, "🔙 Возвращаемся в главное меню...").await?;
            send_main_menu(&bot, &state, chat_id).await?;
        }
        PromptInput::Cancelled => {
            bot.send_message(chat_id, "❌ Операция отменена из-за команды.").await?;
            send_main_menu(&bot, &state, chat_id).await?;
        }
        PromptInput::NewPrompt(prompt) => {
            let reply = match state.store.set_prompt(session.editing, prompt) {
                Ok(()) => format!("✅ Промпт для {} успешно обновлен!", menu::prompt_label(session.editing)),
                Err(e) => {
                    warn!("Failed to save prompt for {}: {e}", session.editing);
                    "❌ Ошибка при сохранении промпта.".to_string()
                }
            };
            bot.send_message(chat_id, reply)
                .reply_markup(menu::main_keyboard(&state.store.load()))
                .await?;
        }
    }

    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<SettingsState>) -> ResponseResult<()> {
    let Some(action) = q.data.as_deref().and_then(MenuAction::parse) else {
        // Not ours
        return Ok(());
    };

    if !state.is_authorized(q.from.id) {
        bot.answer_callback_query(q.id.clone()).text(ACCESS_DENIED).show_alert(true).await?;
        return Ok(());
    }

    let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    match action {
        MenuAction::Main => {
            state.sessions.finish(chat_id).await;
            edit_main_menu(&bot, &state, chat_id, message_id).await;
            bot.answer_callback_query(q.id.clone()).await?;
        }
        MenuAction::Toggle(bucket) => {
            let notice = match state.store.toggle(bucket) {
                Ok(config) => {
                    edit_main_menu(&bot, &state, chat_id, message_id).await;
                    menu::toggle_notice(bucket, config.is_enabled(bucket))
                }
                Err(e) => {
                    warn!("Failed to toggle {bucket}: {e}");
                    "❌ Ошибка при обновлении статуса!".to_string()
                }
            };
            bot.answer_callback_query(q.id.clone()).text(notice).await?;
        }
        MenuAction::Edit(bucket) => {
            state.sessions.begin(chat_id, EditSession { message_id, editing: bucket }).await;
            let config = state.store.load();
            let result = bot
                .edit_message_text(chat_id, message_id, menu::edit_text(bucket, &config.get(bucket).prompt))
                .parse_mode(ParseMode::Html)
                .reply_markup(menu::edit_keyboard())
                .await;
            if let Err(e) = result {
                warn!("Failed to open prompt editor: {e}");
            }
            bot.answer_callback_query(q.id.clone()).await?;
        }
        MenuAction::Save => {
            let Some(session) = state.sessions.finish(chat_id).await else {
                bot.answer_callback_query(q.id.clone()).text(NO_BUCKET_SELECTED).await?;
                return Ok(());
            };
            save_current_prompt(&bot, &q, &state, session.editing).await?;
            edit_main_menu(&bot, &state, chat_id, message_id).await;
        }
    }

    Ok(())
}

/// "Keep current" button: rewrites the stored prompt unchanged.
async fn save_current_prompt(
    bot: &Bot,
    q: &CallbackQuery,
    state: &SettingsState,
    bucket: RatingBucket,
) -> ResponseResult<()> {
    let current = state.store.load().get(bucket).prompt.clone();
    let notice = match state.store.set_prompt(bucket, &current) {
        Ok(()) => format!("✅ Промпт для {} сохранен!", menu::prompt_label(bucket)),
        Err(e) => {
            warn!("Failed to save prompt for {bucket}: {e}");
            "❌ Ошибка при сохранении промпта!".to_string()
        }
    };
    bot.answer_callback_query(q.id.clone()).text(notice).await?;
    Ok(())
}

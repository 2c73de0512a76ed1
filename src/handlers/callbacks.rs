use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, InputFile, MessageId};
use tracing::warn;

use crate::handlers::commands::{
    clear_refs_for_user, home_keyboard, refs_keyboard, refs_summary_text, run_generation_flow,
    HELP_TEXT, WELCOME_TEXT,
};
use crate::session;
use crate::state::AppState;
use crate::store::records::MAX_REFS;

/// Inline-button actions of the bot menus. Every `callback_data` tag
/// maps to exactly one variant; unknown tags are logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    UploadRefs,
    Generate,
    MyRefs,
    ShowRefs,
    ClearRefs,
    BackHome,
    Help,
}

impl MenuAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "upload_refs" => Some(MenuAction::UploadRefs),
            "generate" => Some(MenuAction::Generate),
            "my_refs" => Some(MenuAction::MyRefs),
            "show_refs" => Some(MenuAction::ShowRefs),
            "clear_refs" => Some(MenuAction::ClearRefs),
            "back_home" => Some(MenuAction::BackHome),
            "help" => Some(MenuAction::Help),
            _ => None,
        }
    }
}

/// Rewrites the menu message in place; falls back to a fresh message
/// when Telegram refuses the edit (old or inaccessible message).
async fn edit_menu(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> Result<()> {
    let edit = bot
        .edit_message_text(chat_id, message_id, text.to_string())
        .reply_markup(keyboard.clone())
        .await;
    if let Err(err) = edit {
        warn!("Menu edit failed, sending a new message instead: {err}");
        bot.send_message(chat_id, text.to_string())
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

pub async fn handle_callback(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(query.id.clone()).await;

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = MenuAction::parse(data) else {
        warn!("Unknown menu action: {data}");
        return Ok(());
    };
    let Some(message) = query.message.clone() else {
        return Ok(());
    };

    let chat_id = message.chat().id;
    let message_id = message.id();
    let user_id = query.from.id.to_string();

    match action {
        MenuAction::UploadRefs => {
            {
                let mut records = state.records.lock();
                let mut record = records.ensure(&user_id);
                session::begin_upload(&mut record);
                records.update(&user_id, record);
            }
            edit_menu(
                &bot,
                chat_id,
                message_id,
                &format!(
                    "Отправьте до {MAX_REFS} фото-референсов по одному. \
                     Если все слоты заняты, новое фото заменит самое старое 🧍‍♀️"
                ),
                refs_keyboard(),
            )
            .await?;
        }
        MenuAction::Generate => {
            run_generation_flow(&bot, &state, chat_id, &user_id).await?;
        }
        MenuAction::MyRefs => {
            let record = state.records.lock().ensure(&user_id);
            edit_menu(
                &bot,
                chat_id,
                message_id,
                &refs_summary_text(&record),
                refs_keyboard(),
            )
            .await?;
        }
        MenuAction::ShowRefs => {
            let record = state.records.lock().ensure(&user_id);
            edit_menu(
                &bot,
                chat_id,
                message_id,
                &refs_summary_text(&record),
                refs_keyboard(),
            )
            .await?;
            for path in &record.refs {
                if !std::path::Path::new(path).exists() {
                    warn!(%user_id, "Stored reference is missing on disk: {path}");
                    continue;
                }
                bot.send_photo(chat_id, InputFile::file(path)).await?;
            }
        }
        MenuAction::ClearRefs => {
            let removed = clear_refs_for_user(&state, &user_id);
            let text = if removed == 0 {
                "Референсов и так нет 🗑".to_string()
            } else {
                format!("Удалено референсов: {removed} 🗑")
            };
            edit_menu(&bot, chat_id, message_id, &text, refs_keyboard()).await?;
        }
        MenuAction::BackHome => {
            edit_menu(&bot, chat_id, message_id, WELCOME_TEXT, home_keyboard()).await?;
        }
        MenuAction::Help => {
            edit_menu(&bot, chat_id, message_id, HELP_TEXT, home_keyboard()).await?;
        }
    }

    Ok(())
}

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::{error, info, warn};

use crate::config::CONFIG;
use crate::gen::prompts::PROMPT_VARIANTS;
use crate::gen::provider::{run_generation, GenerationRequest};
use crate::session;
use crate::state::AppState;
use crate::store::records::{UserRecord, MAX_REFS};

pub const WELCOME_TEXT: &str = "👋 Добро пожаловать в Ellen Neiro Studio (ENS)!\n\n\
    Загрузите до 3 фото-референсов, при желании добавьте текст и фото-стиль, \
    затем запустите генерацию — вы получите 4 варианта портрета.";

pub const HELP_TEXT: &str = "Как пользоваться ботом:\n\n\
    1. «Мои референсы» → «Загрузить референсы» — отправьте до 3 фото лица.\n\
    2. При желании отправьте текст (например, «в осеннем парке») — он войдёт в промт.\n\
    3. Когда все 3 слота заняты, следующее фото считается фото-стилем.\n\
    4. «Сгенерировать фото» или /go — бот вернёт 4 кадра.\n\n\
    Фото должно быть не меньше 100×100 пикселей.";

const NEED_REFS_TEXT: &str =
    "Сначала загрузите хотя бы одно фото-референс: «Мои референсы» → «Загрузить референсы» 🧍‍♀️";

const GENERATION_UNAVAILABLE_TEXT: &str =
    "Генерация пока недоступна: провайдер не настроен или не ответил. Ваши референсы сохранены 💫";

pub fn home_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "📸 Сгенерировать фото",
            "generate",
        )],
        vec![InlineKeyboardButton::callback(
            "🧍‍♀️ Мои референсы",
            "my_refs",
        )],
        vec![InlineKeyboardButton::callback("ℹ️ Помощь", "help")],
    ])
}

pub fn refs_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "⬆️ Загрузить референсы",
            "upload_refs",
        )],
        vec![InlineKeyboardButton::callback(
            "🖼 Показать референсы",
            "show_refs",
        )],
        vec![InlineKeyboardButton::callback("🗑 Очистить", "clear_refs")],
        vec![InlineKeyboardButton::callback("🏠 В начало", "back_home")],
    ])
}

pub fn message_user_id(message: &Message) -> Option<String> {
    message.from.as_ref().map(|user| user.id.to_string())
}

pub async fn start_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    if let Some(user_id) = message_user_id(&message) {
        state.records.lock().ensure(&user_id);
    }
    bot.send_message(message.chat.id, WELCOME_TEXT)
        .reply_markup(home_keyboard())
        .await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    bot.send_message(message.chat.id, HELP_TEXT).await?;
    Ok(())
}

pub async fn go_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(user_id) = message_user_id(&message) else {
        return Ok(());
    };
    run_generation_flow(&bot, &state, message.chat.id, &user_id).await
}

/// Full generation cycle for one user: plan, call the provider under a
/// timeout, deliver the frames. Persisted state is only touched on
/// success, and then only the ephemeral scratch is cleared.
pub async fn run_generation_flow(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: &str,
) -> Result<()> {
    let record = state.records.lock().ensure(user_id);
    let scratch = state.scratch(user_id);

    let Some(plan) = session::plan_generation(&record, &scratch) else {
        bot.send_message(chat_id, NEED_REFS_TEXT).await?;
        return Ok(());
    };

    let request = GenerationRequest::from(plan);
    info!(
        user_id,
        refs = request.ref_paths.len(),
        "Starting generation"
    );

    let timeout = Duration::from_secs(CONFIG.generation_timeout_seconds);
    let images = match tokio::time::timeout(timeout, run_generation(&request)).await {
        Ok(Ok(images)) => images,
        Ok(Err(err)) => {
            error!(user_id, "Generation failed: {err}");
            Vec::new()
        }
        Err(_) => {
            warn!(
                user_id,
                "Generation timed out after {}s", CONFIG.generation_timeout_seconds
            );
            Vec::new()
        }
    };

    if images.is_empty() {
        bot.send_message(chat_id, GENERATION_UNAVAILABLE_TEXT).await?;
        return Ok(());
    }

    for (index, image) in images.into_iter().take(PROMPT_VARIANTS).enumerate() {
        bot.send_photo(chat_id, InputFile::memory(image))
            .caption(format!("Кадр {}", index + 1))
            .await?;
    }

    state.clear_scratch(user_id);
    Ok(())
}

/// Deletes every stored reference of the user and resets the record.
/// Individual deletion failures are logged and do not stop the clear.
pub fn clear_refs_for_user(state: &AppState, user_id: &str) -> usize {
    let removed = {
        let mut records = state.records.lock();
        let mut record = records.ensure(user_id);
        let removed = session::take_refs(&mut record);
        records.update(user_id, record);
        removed
    };

    for path in &removed {
        if let Err(err) = std::fs::remove_file(Path::new(path)) {
            warn!(user_id, "Failed to delete reference {path}: {err}");
        }
    }
    removed.len()
}

pub fn refs_summary_text(record: &UserRecord) -> String {
    let count = record.refs.len();
    if count == 0 {
        return "Референсы пока не загружены. Нажмите «Загрузить референсы», чтобы добавить до 3 фото 🧍‍♀️".to_string();
    }
    let mut text = format!("Загружено референсов: {count} из {MAX_REFS}.");
    match session::phase(record) {
        session::Phase::Collecting => text.push_str("\nЖду ещё фото."),
        session::Phase::Ready => text.push_str("\nМожно запускать генерацию 📸"),
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::records::RecordStore;

    fn state_in(dir: &std::path::Path) -> AppState {
        AppState::new(RecordStore::load(dir.join("records.json")))
    }

    #[test]
    fn clear_removes_files_and_empties_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());

        let photo = dir.path().join("ref.jpg");
        std::fs::write(&photo, b"jpeg bytes").expect("write");
        {
            let mut records = state.records.lock();
            let mut record = records.ensure("9");
            session::push_ref(&mut record, photo.to_string_lossy().into_owned());
            records.update("9", record);
        }

        let removed = clear_refs_for_user(&state, "9");
        assert_eq!(removed, 1);
        assert!(!photo.exists());

        let record = state.records.lock().ensure("9");
        assert!(record.refs.is_empty());
        assert!(!record.awaiting_refs);
    }

    #[test]
    fn clear_tolerates_already_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = state_in(dir.path());

        {
            let mut records = state.records.lock();
            let mut record = records.ensure("9");
            session::push_ref(&mut record, "/nonexistent/ref.jpg".to_string());
            records.update("9", record);
        }

        assert_eq!(clear_refs_for_user(&state, "9"), 1);
        assert!(state.records.lock().ensure("9").refs.is_empty());
    }

    #[test]
    fn summary_mentions_slot_usage() {
        let empty = UserRecord::default();
        assert!(refs_summary_text(&empty).contains("не загружены"));

        let collecting = UserRecord {
            refs: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            awaiting_refs: true,
        };
        assert!(refs_summary_text(&collecting).contains("2 из 3"));
        assert!(refs_summary_text(&collecting).contains("ещё"));

        let ready = UserRecord {
            refs: vec!["a.jpg".to_string(), "b.jpg".to_string(), "c.jpg".to_string()],
            awaiting_refs: false,
        };
        assert!(refs_summary_text(&ready).contains("генерацию"));
    }
}

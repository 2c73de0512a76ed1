use std::time::Duration;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use reqwest::Client;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::handlers::commands::message_user_id;
use crate::session::{self, PhotoRole, RefUpdate};
use crate::state::AppState;
use crate::store::photos::{save_photo, PhotoError};

const FILE_DOWNLOAD_MAX_ATTEMPTS: usize = 3;
const FILE_DOWNLOAD_BASE_DELAY_MS: u64 = 400;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
});

async fn download_telegram_file(bot: &Bot, file_id: &FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id.clone()).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        CONFIG.bot_token, file.path
    );

    for attempt in 0..FILE_DOWNLOAD_MAX_ATTEMPTS {
        match HTTP_CLIENT.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                return Ok(response.bytes().await?.to_vec());
            }
            Ok(response) => {
                warn!(
                    "File download returned status {} (attempt {}/{})",
                    response.status(),
                    attempt + 1,
                    FILE_DOWNLOAD_MAX_ATTEMPTS
                );
            }
            Err(err) => {
                warn!(
                    "File download failed: {err} (attempt {}/{})",
                    attempt + 1,
                    FILE_DOWNLOAD_MAX_ATTEMPTS
                );
                if !(err.is_timeout() || err.is_connect()) {
                    return Err(err.into());
                }
            }
        }
        if attempt + 1 < FILE_DOWNLOAD_MAX_ATTEMPTS {
            let delay = Duration::from_millis(FILE_DOWNLOAD_BASE_DELAY_MS << attempt);
            tokio::time::sleep(delay).await;
        }
    }

    Err(anyhow!("file download kept failing"))
}

fn ref_accepted_text(update: &RefUpdate) -> String {
    let mut text = if update.remaining > 0 {
        format!(
            "Фото принято! Можно добавить ещё {} 🧍‍♀️",
            update.remaining
        )
    } else {
        format!(
            "Все {} референса загружены — коллекция полна! Жмите «Сгенерировать фото» 📸",
            update.total
        )
    };
    if update.displaced.is_some() {
        text.push_str("\nСамый старый референс заменён новым.");
    }
    text
}

fn rejection_text(err: &PhotoError) -> String {
    match err {
        PhotoError::TooSmall { width, height } => format!(
            "Фото слишком маленькое ({width}×{height}), нужно минимум 100×100. Отправьте другое 🙏"
        ),
        _ => "Не получилось прочитать это фото. Отправьте его картинкой ещё раз 🙏".to_string(),
    }
}

/// Inbound photo: a reference while the user is collecting, a transient
/// style image otherwise.
pub async fn photo_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(user_id) = message_user_id(&message) else {
        return Ok(());
    };
    let Some(photo) = message.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };

    let bytes = match download_telegram_file(&bot, &photo.file.id).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%user_id, "Failed to fetch photo from Telegram: {err}");
            bot.send_message(
                message.chat.id,
                "Не удалось скачать фото из Telegram, попробуйте ещё раз 🙏",
            )
            .await?;
            return Ok(());
        }
    };

    let role = {
        let mut records = state.records.lock();
        session::classify_photo(&records.ensure(&user_id))
    };

    let dir = match role {
        PhotoRole::Reference => CONFIG.user_refs_dir(&user_id),
        PhotoRole::Style => CONFIG.user_style_dir(&user_id),
    };

    let path = match save_photo(&bytes, &dir) {
        Ok(path) => path,
        Err(err) if err.is_rejection() => {
            bot.send_message(message.chat.id, rejection_text(&err)).await?;
            return Ok(());
        }
        Err(err) => {
            warn!(%user_id, "Failed to store photo: {err}");
            bot.send_message(
                message.chat.id,
                "Не удалось сохранить фото, попробуйте позже 🙏",
            )
            .await?;
            return Ok(());
        }
    };

    match role {
        PhotoRole::Reference => {
            let update = {
                let mut records = state.records.lock();
                let mut record = records.ensure(&user_id);
                let update = session::push_ref(&mut record, path.to_string_lossy().into_owned());
                records.update(&user_id, record);
                update
            };

            if let Some(displaced) = &update.displaced {
                if let Err(err) = std::fs::remove_file(displaced) {
                    warn!(%user_id, "Failed to delete displaced reference {displaced}: {err}");
                }
            }

            info!(
                %user_id,
                total = update.total,
                "Stored reference photo at {}",
                path.display()
            );
            bot.send_message(message.chat.id, ref_accepted_text(&update))
                .await?;
        }
        PhotoRole::Style => {
            state.set_style_path(&user_id, path.clone());
            info!(%user_id, "Captured style image at {}", path.display());
            bot.send_message(
                message.chat.id,
                "Принял фото-стиль 🎨 Учту его при следующей генерации.",
            )
            .await?;
        }
    }

    Ok(())
}

/// Non-command free text becomes the latest prompt fragment.
pub async fn text_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(user_id) = message_user_id(&message) else {
        return Ok(());
    };
    let Some(text) = message.text() else {
        return Ok(());
    };
    if text.trim_start().starts_with('/') {
        return Ok(());
    }

    state.set_prompt_text(&user_id, text.trim().to_string());
    bot.send_message(
        message.chat.id,
        "Запомнил описание — добавлю его в промт ✍️",
    )
    .await?;
    Ok(())
}

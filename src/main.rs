use std::error::Error;

use dotenvy::dotenv;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::info;

mod config;
mod gen;
mod handlers;
mod session;
mod state;
mod store;
mod utils;

use config::CONFIG;
use handlers::{callbacks, commands, media};
use state::AppState;
use store::records::RecordStore;
use utils::logging::init_logging;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Go,
    Help,
}

type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

#[tokio::main]
async fn main() -> HandlerResult {
    dotenv().ok();
    let _guards = init_logging();

    if CONFIG.bot_token.trim().is_empty() {
        return Err("BOT_TOKEN is required".into());
    }

    let bot = Bot::new(CONFIG.bot_token.clone());
    info!("Starting Ellen Neiro Studio bot");

    let state = AppState::new(RecordStore::load(CONFIG.records_path.clone()));

    let command_handler = dptree::entry()
        .filter_command::<Command>()
        .endpoint(handle_command);

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(dptree::filter(|msg: Message| msg.photo().is_some()).endpoint(handle_photo))
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .endpoint(ignore_message);

    let callback_handler = Update::filter_callback_query().endpoint(handle_callback);

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    state: AppState,
    message: Message,
    command: Command,
) -> HandlerResult {
    match command {
        Command::Start => commands::start_handler(bot, state, message).await?,
        Command::Go => commands::go_handler(bot, state, message).await?,
        Command::Help => commands::help_handler(bot, message).await?,
    }
    Ok(())
}

async fn handle_photo(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    media::photo_handler(bot, state, message).await?;
    Ok(())
}

async fn handle_text(bot: Bot, state: AppState, message: Message) -> HandlerResult {
    media::text_handler(bot, state, message).await?;
    Ok(())
}

async fn handle_callback(bot: Bot, state: AppState, query: CallbackQuery) -> HandlerResult {
    callbacks::handle_callback(bot, state, query).await?;
    Ok(())
}

async fn ignore_message(_message: Message) -> HandlerResult {
    Ok(())
}

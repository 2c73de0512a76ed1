use std::env;
use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub records_path: PathBuf,
    pub generation_timeout_seconds: u64,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").unwrap_or_default();

        let data_dir = PathBuf::from(env_string("DATA_DIR", "user_data"));
        let records_path = match env::var("RECORDS_PATH") {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
            _ => data_dir.join("records.json"),
        };

        Ok(Config {
            bot_token,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            data_dir,
            records_path,
            generation_timeout_seconds: env_u64("GENERATION_TIMEOUT_SECONDS", 120),
        })
    }

    pub fn user_refs_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(user_id).join("refs")
    }

    pub fn user_style_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(user_id).join("style_inputs")
    }
}

pub mod prompts;
pub mod provider;

pub mod client;
pub mod key_manager;

pub use client::{GeminiCompleter, GeminiEmbedder};
pub use key_manager::GeminiKeyManager;

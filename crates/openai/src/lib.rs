//! OpenAI-compatible chat completions client.

pub mod chat;

pub use chat::{ChatClient, ChatCompletion, ChatConfig, ChatError, TokenUsage};

pub mod config;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::OpenAiConfig;
pub use openai::OpenAiProvider;
pub use provider::{ModelError, ModelProvider, ModelResult};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, MessageRole, ModelInfo, Usage,
};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::openai::*;
    pub use crate::provider::*;
    pub use crate::types::*;
}

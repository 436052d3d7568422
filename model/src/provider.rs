use crate::types::{ChatRequest, ChatResponse, ModelInfo};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse>;

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>>;

    async fn health_check(&self) -> ModelResult<()>;

    fn provider_name(&self) -> &'static str;
}

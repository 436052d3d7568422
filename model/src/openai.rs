use crate::config::OpenAiConfig;
use crate::provider::{ModelError, ModelProvider, ModelResult};
use crate::types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FinishReason, MessageRole, ModelInfo, Usage,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Chat completion request body for `/v1/chat/completions`
#[derive(Debug, Clone, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiModelsResponse {
    data: Vec<OpenAiModelData>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiModelData {
    id: String,
    #[serde(default)]
    owned_by: Option<String>,
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|msg| ModelError::InvalidConfig { message: msg })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Unknown {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn convert_message_role(role: &MessageRole) -> String {
        match role {
            MessageRole::System => "system".to_string(),
            MessageRole::User => "user".to_string(),
            MessageRole::Assistant => "assistant".to_string(),
        }
    }

    fn convert_message(msg: &ChatMessage) -> OpenAiMessage {
        OpenAiMessage {
            role: Self::convert_message_role(&msg.role),
            content: msg.content.clone(),
        }
    }

    fn convert_finish_reason(reason: Option<String>) -> Option<FinishReason> {
        reason.map(|r| match r.as_str() {
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        })
    }

    fn handle_http_error(err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            ModelError::ServiceUnavailable {
                message: "Cannot connect to OpenAI API".to_string(),
            }
        } else {
            ModelError::Network(err)
        }
    }

    /// Map a non-success status to the closest `ModelError`.
    fn status_error(status: StatusCode, body: String, model: &str) -> ModelError {
        match status.as_u16() {
            401 | 403 => ModelError::Authentication,
            404 => ModelError::ModelNotFound {
                model: model.to_string(),
            },
            429 => ModelError::RateLimit,
            503 => ModelError::ServiceUnavailable {
                message: "OpenAI API unavailable".to_string(),
            },
            _ => ModelError::Unknown {
                message: format!("OpenAI API error ({}): {}", status, body),
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn chat(&self, request: ChatRequest) -> ModelResult<ChatResponse> {
        debug!("Starting chat request with model: {}", request.model);

        let body = OpenAiChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request
                .temperature
                .unwrap_or(self.config.default_temperature),
            max_tokens: request.max_tokens.or(self.config.default_max_tokens),
        };

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat request failed with status {}", status);
            return Err(Self::status_error(status, error_text, &request.model));
        }

        let payload: OpenAiChatResponse = response.json().await.map_err(Self::handle_http_error)?;

        let choices: Vec<Choice> = payload
            .choices
            .into_iter()
            .map(|choice| Choice {
                message: ChatMessage {
                    role: MessageRole::Assistant,
                    content: choice.message.content,
                },
                finish_reason: Self::convert_finish_reason(choice.finish_reason),
            })
            .collect();

        let usage = payload.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        info!("Chat request completed successfully");

        Ok(ChatResponse { choices, usage })
    }

    async fn list_models(&self) -> ModelResult<Vec<ModelInfo>> {
        debug!("Listing available models");

        let response = self
            .client
            .get(self.url("/v1/models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(
                status,
                error_text,
                &self.config.default_model,
            ));
        }

        let models: OpenAiModelsResponse =
            response.json().await.map_err(Self::handle_http_error)?;

        let model_infos: Vec<ModelInfo> = models
            .data
            .into_iter()
            .map(|model| ModelInfo {
                name: model.id,
                owned_by: model.owned_by,
            })
            .collect();

        info!("Retrieved {} models", model_infos.len());
        Ok(model_infos)
    }

    async fn health_check(&self) -> ModelResult<()> {
        debug!("Performing health check");

        let response = self
            .client
            .get(self.url("/v1/models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        let status = response.status();
        if status.is_success() {
            info!("Health check passed");
            Ok(())
        } else {
            error!("Health check failed with status: {}", status);
            let error_text = response.text().await.unwrap_or_default();
            Err(Self::status_error(
                status,
                error_text,
                &self.config.default_model,
            ))
        }
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

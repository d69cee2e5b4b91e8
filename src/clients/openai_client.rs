//! OpenAI 兼容客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini OpenAI 端点, Doubao 等）
//!
//! Chat Completions 没有 top_k 和 responseMimeType，这两项不发送。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::ChatModel;
use crate::config::{Config, SamplingConfig};
use crate::error::GenerationError;

/// OpenAI 兼容客户端
pub struct OpenAiCompatClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiCompatClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send_message(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        debug!("调用 OpenAI 兼容 API，模型: {}", self.model_name);
        debug!(
            "忽略不支持的采样参数: top_k={}, response_mime_type={}",
            sampling.top_k, sampling.response_mime_type
        );

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| GenerationError::api_call_failed(&self.model_name, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(sampling.temperature)
            .top_p(sampling.top_p)
            .max_tokens(sampling.max_output_tokens)
            .build()
            .map_err(|e| GenerationError::api_call_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            GenerationError::api_call_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

/// LLM 客户端抽象
///
/// 题目生成只依赖 `ChatModel`，具体后端由配置决定。
use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::{GeminiClient, OpenAiCompatClient};
use crate::config::{Config, LlmProvider, SamplingConfig};
use crate::error::GenerationError;

/// 单轮、无历史的聊天补全
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;

    /// 发送一条用户消息，返回模型的纯文本回复
    async fn send_message(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError>;
}

/// 按配置创建 LLM 客户端
pub fn build_chat_model(config: &Config) -> Result<Arc<dyn ChatModel>, GenerationError> {
    let model: Arc<dyn ChatModel> = match config.llm_provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::new(config)?),
        LlmProvider::OpenAi => Arc::new(OpenAiCompatClient::new(config)),
    };
    Ok(model)
}

/// Gemini API 客户端
///
/// 直接调用 Generative Language REST 接口 `models/{model}:generateContent`，
/// 完整传递 `generationConfig`（含 topK 与 responseMimeType）。
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clients::ChatModel;
use crate::config::{Config, SamplingConfig};
use crate::error::GenerationError;

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

impl<'a> From<&'a SamplingConfig> for GenerationConfig<'a> {
    fn from(sampling: &'a SamplingConfig) -> Self {
        Self {
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            top_k: sampling.top_k,
            max_output_tokens: sampling.max_output_tokens,
            response_mime_type: &sampling.response_mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    status: Option<String>,
}

impl GeminiClient {
    /// 创建新的 Gemini 客户端
    pub fn new(config: &Config) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.llm_timeout)
            .build()
            .map_err(|e| GenerationError::api_call_failed(&config.llm_model_name, e))?;

        Ok(Self {
            http,
            api_key: config.llm_api_key.clone(),
            api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.llm_model_name.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base_url, self.model_name
        )
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send_message(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, GenerationError> {
        debug!("调用 Gemini API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", prompt.len());

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: sampling.into(),
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Gemini API 调用失败: {}", e);
                GenerationError::api_call_failed(&self.model_name, e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::api_call_failed(&self.model_name, e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => match envelope.error.status {
                    Some(code) => format!("{} ({})", envelope.error.message, code),
                    None => envelope.error.message,
                },
                Err(_) => format!("HTTP {status}"),
            };
            warn!("Gemini API 返回错误 {}: {}", status, message);
            return Err(GenerationError::api_call_failed(&self.model_name, message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            GenerationError::api_call_failed(
                &self.model_name,
                format!("unexpected response body: {e}"),
            )
        })?;

        debug!("Gemini API 调用成功");

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::EmptyResponse {
                model: self.model_name.clone(),
            })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            warn!(
                "Gemini 返回内容为空 (finishReason: {:?})",
                candidate.finish_reason
            );
            return Err(GenerationError::EmptyResponse {
                model: self.model_name.clone(),
            });
        }

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_config(base_url: &str) -> Config {
        Config {
            llm_api_key: "test-key".to_string(),
            llm_api_base_url: format!("{base_url}/v1beta/"),
            llm_model_name: "gemini-pro".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_sends_generation_config_and_joins_parts() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-pro:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                "generationConfig": {
                    "topK": 40,
                    "maxOutputTokens": 8192,
                    "responseMimeType": "text/plain"
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "[{\"id\": 1,"}, {"text": " \"text\": \"Q\"}]\n"}]},
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GeminiClient::new(&test_config(&server.url())).unwrap();
        let reply = client
            .send_message("hello", &SamplingConfig::default())
            .await
            .unwrap();

        assert_eq!(reply, "[{\"id\": 1, \"text\": \"Q\"}]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_keeps_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-pro:generateContent")
            .with_status(429)
            .with_body(
                r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#,
            )
            .create_async()
            .await;

        let client = GeminiClient::new(&test_config(&server.url())).unwrap();
        let err = client
            .send_message("hello", &SamplingConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::ApiCallFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("Quota exceeded"));
        assert!(message.contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_empty_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&test_config(&server.url())).unwrap();
        let err = client
            .send_message("hello", &SamplingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse { .. }));

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-pro:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new(&test_config(&server.url())).unwrap();
        let err = client
            .send_message("hello", &SamplingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse { .. }));
    }
}

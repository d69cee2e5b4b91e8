//! 题目生成服务 - 业务能力层
//!
//! 流程：截断文本 → 构建 prompt → 调用模型 → 解析回复。
//! 不关心文件、不关心 HTTP。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clients::ChatModel;
use crate::config::{Config, SamplingConfig};
use crate::error::GenerationError;
use crate::models::QuestionSet;
use crate::services::reply_parser::parse_model_reply;
use crate::utils::logging::truncate_text;

/// 发送给模型的最大单词数
pub const MAX_PROMPT_WORDS: usize = 5000;
/// 请求生成的题目数量
pub const REQUESTED_QUESTIONS: usize = 100;

/// 题目生成服务
pub struct QuestionGenerator {
    model: Arc<dyn ChatModel>,
    sampling: SamplingConfig,
    timeout: Duration,
    verbose_logging: bool,
}

impl QuestionGenerator {
    pub fn new(model: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self {
            model,
            sampling: config.sampling.clone(),
            timeout: config.llm_timeout,
            verbose_logging: config.verbose_logging,
        }
    }

    /// 由文档文本生成题目
    pub async fn generate(&self, text: &str) -> Result<QuestionSet, GenerationError> {
        let truncated = truncate_words(text, MAX_PROMPT_WORDS);
        let prompt = build_prompt(&truncated);

        if self.verbose_logging {
            debug!("Prompt 预览: {}", truncate_text(&prompt, 300));
        }

        info!("🤖 正在调用 {} 生成题目...", self.model.model_name());

        let reply = tokio::time::timeout(
            self.timeout,
            self.model.send_message(&prompt, &self.sampling),
        )
        .await
        .map_err(|_| GenerationError::Timeout {
            model: self.model.model_name().to_string(),
            secs: self.timeout.as_secs(),
        })??;

        let questions = match parse_model_reply(&reply) {
            Ok(questions) => questions,
            Err(e) => {
                error!("无法解析模型回复: {}\n原始回复: {}", e, reply);
                return Err(e.into());
            }
        };

        let malformed = questions.iter().filter(|q| !q.is_well_formed()).count();
        if malformed > 0 {
            warn!(
                "⚠️ {}/{} 道题选项数量不是 4 或正确答案不在选项中",
                malformed,
                questions.len()
            );
        }

        info!("✓ 模型返回 {} 道题", questions.len());
        Ok(questions)
    }
}

/// 保留前 `max_words` 个以空白分隔的单词，用单个空格重新拼接
pub fn truncate_words(text: &str, max_words: usize) -> String {
    let total = text.split_whitespace().count();
    if total > max_words {
        debug!("文本共 {} 个单词，截断为 {}", total, max_words);
    }

    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 构建题目生成 prompt
pub fn build_prompt(content: &str) -> String {
    format!(
        "Generate random {REQUESTED_QUESTIONS} multiple-choice questions from the following content:\n\n\
         {content}\n\n\
         This should proceed from basic to intermediate and then advanced at an appropriate proportion \
         to make the reader better understand the context. \
         Format the output as a JSON array where each question has an id (starting from 1), text, \
         options (an array of 4 choices), and correctAnswer."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 按脚本返回固定回复，并记录收到的 prompt
    struct ScriptedModel {
        reply: Result<String, String>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn send_message(
            &self,
            prompt: &str,
            sampling: &SamplingConfig,
        ) -> Result<String, GenerationError> {
            assert_eq!(sampling, &SamplingConfig::default());
            self.prompts.lock().unwrap().push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            self.reply
                .clone()
                .map_err(|message| GenerationError::api_call_failed("scripted", message))
        }
    }

    fn generator(model: Arc<ScriptedModel>, timeout: Duration) -> QuestionGenerator {
        let config = Config {
            llm_timeout: timeout,
            ..Config::default()
        };
        QuestionGenerator::new(model, &config)
    }

    #[test]
    fn test_truncate_words_bounds_tokens() {
        let text = (0..6000).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" \n\t ");
        let truncated = truncate_words(&text, MAX_PROMPT_WORDS);
        let words: Vec<&str> = truncated.split(' ').collect();
        assert_eq!(words.len(), MAX_PROMPT_WORDS);
        assert_eq!(words[0], "w0");
        assert_eq!(words[4999], "w4999");
    }

    #[test]
    fn test_truncate_words_normalizes_short_text() {
        assert_eq!(truncate_words("  a\n\nb\tc  ", 5000), "a b c");
        assert_eq!(truncate_words("", 5000), "");
        assert_eq!(truncate_words("one two three", 2), "one two");
    }

    #[test]
    fn test_prompt_shape() {
        let prompt = build_prompt("Cells are small.");
        assert!(prompt.contains("100 multiple-choice questions"));
        assert!(prompt.contains("Cells are small."));
        assert!(prompt.contains("correctAnswer"));
        assert!(prompt.contains("an array of 4 choices"));
        assert!(prompt.contains("basic to intermediate"));
    }

    #[tokio::test]
    async fn test_generate_parses_reply_and_truncates_prompt() {
        let model = Arc::new(ScriptedModel::replying(
            r#"Here you go: [{"id": 1, "text": "Q1", "options": ["a","b","c","d"], "correctAnswer": "a"}] Enjoy!"#,
        ));
        let generator = generator(model.clone(), Duration::from_secs(5));

        let long_text = "word ".repeat(MAX_PROMPT_WORDS + 10);
        let questions = generator.generate(&long_text).await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options.len(), 4);

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].matches("word").count(), MAX_PROMPT_WORDS);
    }

    #[tokio::test]
    async fn test_generate_malformed_reply() {
        let model = Arc::new(ScriptedModel::replying("The cell is a fascinating topic."));
        let err = generator(model, Duration::from_secs(5))
            .generate("text")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedReply(_)));
        assert!(!err.to_string().contains("fascinating"));
    }

    #[tokio::test]
    async fn test_generate_remote_failure_keeps_message() {
        let model = Arc::new(ScriptedModel {
            reply: Err("API key not valid".to_string()),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        });
        let err = generator(model, Duration::from_secs(5))
            .generate("text")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let model = Arc::new(ScriptedModel {
            reply: Ok("[]".to_string()),
            delay: Duration::from_secs(10),
            prompts: Mutex::new(Vec::new()),
        });
        let err = generator(model, Duration::from_millis(20))
            .generate("text")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}

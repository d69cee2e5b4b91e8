//! 程序配置
//!
//! 启动时构造一次，之后以引用方式传入各层，不读取任何全局可变状态。

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 默认 Gemini REST 端点
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// 默认 OpenAI 兼容端点
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1";
/// 默认 Gemini 模型
pub const GEMINI_MODEL_NAME: &str = "gemini-pro";
/// 默认 OpenAI 模型
pub const OPENAI_MODEL_NAME: &str = "gpt-4o-mini";

/// LLM 服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Generative Language API（原生 generateContent）
    Gemini,
    /// 任意兼容 OpenAI Chat Completions 的服务
    OpenAi,
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Gemini => GEMINI_API_BASE_URL,
            LlmProvider::OpenAi => OPENAI_API_BASE_URL,
        }
    }

    pub fn default_model_name(self) -> &'static str {
        match self {
            LlmProvider::Gemini => GEMINI_MODEL_NAME,
            LlmProvider::OpenAi => OPENAI_MODEL_NAME,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            "openai" | "openai-compatible" => Ok(LlmProvider::OpenAi),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProvider::Gemini => write!(f, "gemini"),
            LlmProvider::OpenAi => write!(f, "openai"),
        }
    }
}

/// 模型采样参数
///
/// 固定值，不从环境变量读取。
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 监听端口
    pub port: u16,
    /// 上传文件临时存放目录
    pub upload_dir: PathBuf,
    /// 请求体大小上限（字节）
    pub max_upload_bytes: usize,
    /// 是否输出 prompt / 回复预览
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_timeout: Duration,
    pub sampling: SamplingConfig,
    // --- 文本提取 ---
    pub extract_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 50 * 1024 * 1024,
            verbose_logging: false,
            llm_provider: LlmProvider::Gemini,
            llm_api_key: String::new(),
            llm_api_base_url: GEMINI_API_BASE_URL.to_string(),
            llm_model_name: GEMINI_MODEL_NAME.to_string(),
            llm_timeout: Duration::from_secs(120),
            sampling: SamplingConfig::default(),
            extract_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// `LLM_API_KEY` 必须提供；其余变量缺省时使用默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源加载配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let llm_api_key = lookup("LLM_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::EnvVarNotFound {
                var_name: "LLM_API_KEY".to_string(),
            })?;

        let llm_provider = match lookup("LLM_PROVIDER") {
            Some(value) => value
                .parse::<LlmProvider>()
                .map_err(|_| parse_failed("LLM_PROVIDER", &value, "gemini | openai"))?,
            None => default.llm_provider,
        };

        Ok(Self {
            port: parse_var(&lookup, "PORT", "u16")?.unwrap_or(default.port),
            upload_dir: lookup("UPLOAD_DIR").map(PathBuf::from).unwrap_or(default.upload_dir),
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", "usize")?
                .unwrap_or(default.max_upload_bytes),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
            llm_provider,
            llm_api_key,
            llm_api_base_url: lookup("LLM_API_BASE_URL")
                .unwrap_or_else(|| llm_provider.default_base_url().to_string()),
            llm_model_name: lookup("LLM_MODEL_NAME")
                .unwrap_or_else(|| llm_provider.default_model_name().to_string()),
            llm_timeout: parse_var(&lookup, "LLM_TIMEOUT_SECS", "u64")?
                .map(Duration::from_secs)
                .unwrap_or(default.llm_timeout),
            sampling: default.sampling,
            extract_timeout: parse_var(&lookup, "EXTRACT_TIMEOUT_SECS", "u64")?
                .map(Duration::from_secs)
                .unwrap_or(default.extract_timeout),
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, expected_type: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| parse_failed(name, &value, expected_type)),
        None => Ok(None),
    }
}

fn parse_failed(var_name: &str, value: &str, expected_type: &str) -> ConfigError {
    ConfigError::EnvVarParseFailed {
        var_name: var_name.to_string(),
        value: value.to_string(),
        expected_type: expected_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_api_key_is_required() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { ref var_name } if var_name == "LLM_API_KEY"));

        let err = Config::from_lookup(lookup_from(&[("LLM_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { .. }));
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("LLM_API_KEY", "k")])).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.llm_provider, LlmProvider::Gemini);
        assert_eq!(config.llm_api_base_url, GEMINI_API_BASE_URL);
        assert_eq!(config.sampling, SamplingConfig::default());
        assert_eq!(config.sampling.top_k, 40);
        assert_eq!(config.sampling.max_output_tokens, 8192);
    }

    #[test]
    fn test_openai_provider_switches_base_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("LLM_API_KEY", "k"),
            ("LLM_PROVIDER", "OpenAI"),
            ("LLM_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.llm_provider, LlmProvider::OpenAi);
        assert_eq!(config.llm_api_base_url, OPENAI_API_BASE_URL);
        assert_eq!(config.llm_model_name, OPENAI_MODEL_NAME);
        assert_eq!(config.llm_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_model_name_follows_provider_unless_set() {
        let config = Config::from_lookup(lookup_from(&[("LLM_API_KEY", "k")])).unwrap();
        assert_eq!(config.llm_model_name, GEMINI_MODEL_NAME);

        let config = Config::from_lookup(lookup_from(&[
            ("LLM_API_KEY", "k"),
            ("LLM_PROVIDER", "openai"),
            ("LLM_MODEL_NAME", "deepseek-chat"),
        ]))
        .unwrap();
        assert_eq!(config.llm_model_name, "deepseek-chat");
    }

    #[test]
    fn test_bad_number_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("LLM_API_KEY", "k"), ("PORT", "abc")]))
            .unwrap_err();
        match err {
            ConfigError::EnvVarParseFailed { var_name, value, .. } => {
                assert_eq!(var_name, "PORT");
                assert_eq!(value, "abc");
            }
            other => panic!("意外的错误: {other}"),
        }
    }
}

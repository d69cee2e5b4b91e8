use thiserror::Error;

/// 应用程序错误类型
///
/// 每个阶段的错误在请求边界被统一捕获，再转换成 HTTP 响应（见 `api::response`）。
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求中没有上传文件
    #[error("No file uploaded.")]
    MissingFile,
    /// 上传接收错误
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// 文本提取错误
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// 题目生成错误
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 是否属于客户端错误（4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::MissingFile
                | AppError::Upload(UploadError::Multipart { .. })
                | AppError::Upload(UploadError::TooLarge { .. })
        )
    }

    /// 用于日志的错误类别
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::MissingFile => "missing_file",
            AppError::Upload(_) => "upload",
            AppError::Extraction(ExtractionError::FileNotFound { .. }) => "file_not_found",
            AppError::Extraction(_) => "extraction",
            AppError::Generation(_) => "generation",
            AppError::Config(_) => "config",
        }
    }
}

/// 上传接收错误
#[derive(Debug, Error)]
pub enum UploadError {
    /// multipart 请求体无法读取
    #[error("Invalid multipart request: {message}")]
    Multipart { message: String },
    /// 请求体超过上限
    #[error("Upload exceeds the {limit_bytes} byte limit")]
    TooLarge { limit_bytes: usize },
    /// 写入临时文件失败
    #[error("Failed to store upload in {dir}: {source}")]
    PersistFailed {
        dir: String,
        #[source]
        source: std::io::Error,
    },
}

/// 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 文件不存在
    #[error("File not found: {path}")]
    FileNotFound { path: String },
    /// 没有可用的提取器
    #[error("Unsupported file format: {extension:?}")]
    UnsupportedFormat { extension: String },
    /// 读取文件失败
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文本文件不是合法的 UTF-8
    #[error("File is not valid UTF-8 text: {path}")]
    InvalidUtf8 { path: String },
    /// 压缩包结构错误（docx / pptx / xlsx / odt）
    #[error("Failed to open {format} archive: {message}")]
    Archive { format: &'static str, message: String },
    /// 解析器报错
    #[error("Failed to parse {format} document: {message}")]
    Parser { format: &'static str, message: String },
    /// 提取结果为空
    #[error("No text could be extracted from {path}")]
    EmptyDocument { path: String },
    /// 超时
    #[error("Text extraction timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// 模型回复解析失败
///
/// Display 不包含原始回复内容，原始回复只写入日志。
#[derive(Debug, Error)]
#[error("Invalid response format from AI")]
pub struct ParseError {
    #[source]
    pub source: serde_json::Error,
}

/// 题目生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 远程调用失败（网络 / 鉴权 / 配额）
    #[error("Failed to generate questions from {model}: {message}")]
    ApiCallFailed { model: String, message: String },
    /// 模型返回内容为空
    #[error("{model} returned an empty response")]
    EmptyResponse { model: String },
    /// 调用超时
    #[error("{model} did not respond within {secs}s")]
    Timeout { model: String, secs: u64 },
    /// 回复无法解析为题目列表
    #[error(transparent)]
    MalformedReply(#[from] ParseError),
}

impl GenerationError {
    /// 创建远程调用错误
    pub fn api_call_failed(model: impl Into<String>, message: impl std::fmt::Display) -> Self {
        GenerationError::ApiCallFailed {
            model: model.into(),
            message: message.to_string(),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("environment variable {var_name} has invalid value '{value}', expected {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("environment variable {var_name} is not set")]
    EnvVarNotFound { var_name: String },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

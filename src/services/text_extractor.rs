//! 文本提取服务 - 业务能力层
//!
//! 只负责"把一个文件变成纯文本"，按小写扩展名分派：
//!
//! | 扩展名 | 处理 |
//! |--------|------|
//! | txt    | 按 UTF-8 原样读取 |
//! | docx   | 解压后取段落文本 |
//! | pdf    | `pdf-extract` 逐页拼接 |
//! | 其他   | `document_formats::generic_text` 兜底 |
//!
//! 不做内容嗅探，分派只看扩展名。

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use phf::phf_map;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::services::document_formats;

/// 主提取表中的格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryFormat {
    PlainText,
    Docx,
    Pdf,
}

static PRIMARY_FORMATS: phf::Map<&'static str, PrimaryFormat> = phf_map! {
    "txt" => PrimaryFormat::PlainText,
    "docx" => PrimaryFormat::Docx,
    "pdf" => PrimaryFormat::Pdf,
};

/// 文本提取服务
#[derive(Debug, Clone)]
pub struct TextExtractor {
    timeout: Duration,
}

impl TextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 提取文本，超时返回 `ExtractionError::Timeout`
    pub async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        self.bounded(path, extract_text(path)).await
    }

    async fn bounded<F>(&self, path: &Path, extraction: F) -> Result<String, ExtractionError>
    where
        F: Future<Output = Result<String, ExtractionError>>,
    {
        match tokio::time::timeout(self.timeout, extraction).await {
            Ok(result) => result,
            Err(_) => {
                warn!("⏱️ 文本提取超时: {}", path.display());
                Err(ExtractionError::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// 提取文件的纯文本内容
pub async fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let display_path = path.display().to_string();

    // 读取前再确认一次文件存在，避免底层库抛出无关的错误
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ExtractionError::FileNotFound { path: display_path });
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Io {
            path: display_path.clone(),
            source,
        })?;

    if bytes.is_empty() {
        return Err(ExtractionError::EmptyDocument { path: display_path });
    }

    debug!(
        "开始提取文本: {} ({} 字节, 扩展名: {:?})",
        display_path,
        bytes.len(),
        extension
    );

    let text = match PRIMARY_FORMATS.get(extension.as_str()).copied() {
        Some(PrimaryFormat::PlainText) => {
            String::from_utf8(bytes).map_err(|_| ExtractionError::InvalidUtf8 {
                path: display_path.clone(),
            })?
        }
        Some(PrimaryFormat::Docx) => {
            run_blocking("docx", move || document_formats::docx_text(&bytes)).await?
        }
        Some(PrimaryFormat::Pdf) => run_blocking("pdf", move || pdf_text(&bytes)).await?,
        None => {
            run_blocking("fallback", move || {
                document_formats::generic_text(&extension, &bytes)
            })
            .await?
        }
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument { path: display_path });
    }

    debug!("✓ 提取完成: {} ({} 字符)", display_path, text.chars().count());
    Ok(text)
}

fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Parser {
        format: "pdf",
        message: e.to_string(),
    })
}

// 解析器在阻塞线程池中运行；解析器 panic 时 JoinError 转为解析错误
async fn run_blocking<F>(format: &'static str, f: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractionError::Parser {
            format,
            message: format!("parser aborted: {e}"),
        })?
}

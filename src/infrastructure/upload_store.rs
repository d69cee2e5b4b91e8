//! 上传文件存储 - 基础设施层
//!
//! 唯一持有上传临时文件的地方。`UploadedFile` 是作用域资源：
//! 显式调用 `cleanup()` 删除文件，未调用时由 `Drop` 兜底删除，
//! 所有权保证删除只发生一次。

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::UploadError;

/// 上传目录
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 将上传内容写入上传目录
    ///
    /// 文件名 = 当前毫秒时间戳 + 随机字符 + 原始扩展名。
    pub async fn persist(
        &self,
        original_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, UploadError> {
        let dir = self.dir.clone();
        let original_name = original_name.to_string();

        tokio::task::spawn_blocking(move || write_upload(&dir, original_name, bytes))
            .await
            .map_err(|e| UploadError::PersistFailed {
                dir: self.dir.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
            })?
    }
}

fn write_upload(
    dir: &Path,
    original_name: String,
    bytes: Vec<u8>,
) -> Result<UploadedFile, UploadError> {
    let persist_failed = |source: std::io::Error| UploadError::PersistFailed {
        dir: dir.display().to_string(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(persist_failed)?;

    let extension = extension_of(&original_name);
    let prefix = format!("{}-", chrono::Utc::now().timestamp_millis());
    let suffix = if extension.is_empty() {
        String::new()
    } else {
        format!(".{extension}")
    };

    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(persist_failed)?;
    file.write_all(&bytes).map_err(persist_failed)?;
    file.flush().map_err(persist_failed)?;

    debug!(
        "上传文件已保存: {} -> {}",
        original_name,
        file.path().display()
    );

    Ok(UploadedFile {
        original_name,
        extension,
        size: bytes.len() as u64,
        file,
    })
}

/// 原始文件名中的扩展名（小写，不含点）
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// 一次请求内的上传文件
#[derive(Debug)]
pub struct UploadedFile {
    original_name: String,
    extension: String,
    size: u64,
    file: NamedTempFile,
}

impl UploadedFile {
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// 删除临时文件
    ///
    /// 文件已被外部删除时只记录警告，不视为请求失败。
    pub fn cleanup(self) {
        let path = self.file.path().to_path_buf();
        match self.file.close() {
            Ok(()) => debug!("🧹 已删除临时文件: {}", path.display()),
            Err(e) => warn!("删除临时文件 {} 失败: {}", path.display(), e),
        }
    }
}

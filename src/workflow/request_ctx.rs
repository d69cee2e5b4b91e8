//! 请求处理上下文
//!
//! 封装"我正在处理哪个上传文件、走到了哪一步"这一信息

use std::fmt::Display;

use tracing::debug;

/// 请求处理阶段，只能按顺序前进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestStage {
    Received,
    FileValidated,
    TextExtracted,
    QuestionsGenerated,
    Cleaned,
    Responded,
}

impl RequestStage {
    pub fn label(self) -> &'static str {
        match self {
            RequestStage::Received => "received",
            RequestStage::FileValidated => "file_validated",
            RequestStage::TextExtracted => "text_extracted",
            RequestStage::QuestionsGenerated => "questions_generated",
            RequestStage::Cleaned => "cleaned",
            RequestStage::Responded => "responded",
        }
    }
}

/// 请求处理上下文
#[derive(Debug, Clone)]
pub struct RequestCtx {
    /// 原始文件名（仅用于日志显示）
    pub file_name: String,

    /// 当前阶段
    stage: RequestStage,
}

impl RequestCtx {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            stage: RequestStage::Received,
        }
    }

    pub fn stage(&self) -> RequestStage {
        self.stage
    }

    /// 进入下一阶段
    ///
    /// 失败路径会跳过中间阶段直接进入 `Cleaned`，但不会后退。
    pub fn enter(&mut self, next: RequestStage) {
        debug_assert!(next > self.stage, "阶段不能后退: {:?} -> {:?}", self.stage, next);
        debug!("{} {} -> {}", self, self.stage.label(), next.label());
        self.stage = next;
    }
}

impl Display for RequestCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文件 {}]", self.file_name)
    }
}

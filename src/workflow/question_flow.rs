//! 出题流程 - 流程层
//!
//! 核心职责：定义"一次上传"的完整处理流程
//!
//! 流程顺序：
//! 1. 提取文本
//! 2. 生成题目
//! 3. 删除临时文件（无论成功失败，只执行一次）

use std::sync::Arc;

use tracing::{error, info};

use crate::clients::ChatModel;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::UploadedFile;
use crate::models::QuestionSet;
use crate::services::{QuestionGenerator, TextExtractor};
use crate::utils::logging::truncate_text;
use crate::workflow::request_ctx::{RequestCtx, RequestStage};

/// 出题流程
///
/// - 编排 提取 → 生成 → 清理
/// - 持有上传文件的所有权直到清理完成
/// - 不关心 HTTP
pub struct QuestionFlow {
    extractor: TextExtractor,
    generator: QuestionGenerator,
    verbose_logging: bool,
}

impl QuestionFlow {
    pub fn new(model: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self {
            extractor: TextExtractor::new(config.extract_timeout),
            generator: QuestionGenerator::new(model, config),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn run(&self, upload: UploadedFile, ctx: &mut RequestCtx) -> AppResult<QuestionSet> {
        ctx.enter(RequestStage::FileValidated);
        info!(
            "{} 📄 已保存到 {} ({} 字节)",
            ctx,
            upload.path().display(),
            upload.size()
        );

        let result = self.process(&upload, ctx).await;

        upload.cleanup();
        ctx.enter(RequestStage::Cleaned);

        match &result {
            Ok(questions) => info!("{} ✅ 生成完成，共 {} 道题", ctx, questions.len()),
            Err(e) => error!("{} ❌ 处理失败: {}", ctx, e),
        }

        result
    }

    async fn process(&self, upload: &UploadedFile, ctx: &mut RequestCtx) -> AppResult<QuestionSet> {
        let text = self.extractor.extract(upload.path()).await?;
        ctx.enter(RequestStage::TextExtracted);

        info!(
            "{} ✓ 文本提取完成，共 {} 个单词",
            ctx,
            text.split_whitespace().count()
        );
        if self.verbose_logging {
            info!("{} 文本预览: {}", ctx, truncate_text(&text, 200));
        }

        let questions = self.generator.generate(&text).await?;
        ctx.enter(RequestStage::QuestionsGenerated);

        Ok(questions)
    }
}

//! 路由处理函数
//!
//! 只负责读取 multipart 请求体并把结果映射为响应，处理流程见 `workflow::QuestionFlow`。

use std::sync::Arc;

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{debug, info};

use crate::api::response::QuestionsResponse;
use crate::error::{AppError, AppResult, UploadError};
use crate::models::QuestionSet;
use crate::state::AppState;
use crate::workflow::{RequestCtx, RequestStage};

/// 上传字段名
pub const FILE_FIELD: &str = "file";

/// `POST /generate-questions`
pub async fn generate_questions(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<QuestionsResponse>, AppError> {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!("请求不是 multipart: {}", rejection);
            return Err(AppError::MissingFile);
        }
    };

    let limit_bytes = state.config.max_upload_bytes;
    let (file_name, bytes) = read_file_field(multipart, limit_bytes).await?;

    let (_ctx, result) = handle_upload(&state, file_name, bytes).await;
    let questions = result?;
    Ok(Json(QuestionsResponse { questions }))
}

/// 处理一次上传，成功或失败都以 `Responded` 阶段结束
async fn handle_upload(
    state: &AppState,
    file_name: String,
    bytes: Vec<u8>,
) -> (RequestCtx, AppResult<QuestionSet>) {
    let mut ctx = RequestCtx::new(file_name.as_str());
    info!("{} 📥 收到上传，{} 字节", ctx, bytes.len());

    let result = process_upload(state, &file_name, bytes, &mut ctx).await;
    ctx.enter(RequestStage::Responded);

    (ctx, result)
}

async fn process_upload(
    state: &AppState,
    file_name: &str,
    bytes: Vec<u8>,
    ctx: &mut RequestCtx,
) -> AppResult<QuestionSet> {
    let upload = state.upload_store.persist(file_name, bytes).await?;
    state.flow.run(upload, ctx).await
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// 读取唯一的 `file` 字段，返回 (原始文件名, 内容)
///
/// 没有文件名或文件名为空的 `file` 字段视为未上传。
async fn read_file_field(
    mut multipart: Multipart,
    limit_bytes: usize,
) -> Result<(String, Vec<u8>), AppError> {
    let to_app_error = |e: MultipartError| multipart_error(e, limit_bytes);
    let mut found: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(to_app_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => continue,
        };

        if found.is_some() {
            return Err(UploadError::Multipart {
                message: format!("Multiple '{FILE_FIELD}' fields are not allowed"),
            }
            .into());
        }

        let data = field.bytes().await.map_err(to_app_error)?;
        found = Some((file_name, data.to_vec()));
    }

    found.ok_or(AppError::MissingFile)
}

// 超过 `DefaultBodyLimit` 时 axum 给出 413，其余都是请求体格式问题
fn multipart_error(e: MultipartError, limit_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return UploadError::TooLarge { limit_bytes }.into();
    }

    UploadError::Multipart {
        message: e.body_text(),
    }
    .into()
}

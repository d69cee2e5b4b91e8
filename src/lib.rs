//! # Question Forge
//!
//! 上传文档，自动生成多项选择题的 HTTP 服务
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有上传的临时文件，保证只删除一次
//! - `UploadStore` / `UploadedFile`
//!
//! ### ② 外部客户端层（Clients）
//! - `clients/` - 与大模型交互，统一为 `ChatModel` trait
//! - `GeminiClient` - generateContent 原生接口
//! - `OpenAiCompatClient` - OpenAI 兼容接口
//!
//! ### ③ 业务能力层（Services）
//! - `TextExtractor` - 按扩展名提取文本
//! - `QuestionGenerator` - 截断 → prompt → 调用模型 → 解析回复
//!
//! ### ④ 流程层（Workflow）
//! - `RequestCtx` - 请求上下文（文件名 + 阶段）
//! - `QuestionFlow` - 流程编排（提取 → 生成 → 清理）
//!
//! ### ⑤ 接口层（API）
//! - `api/` - axum 路由，错误统一映射为 JSON 响应

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use clients::{build_chat_model, ChatModel};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GeneratedQuestion, QuestionSet};
pub use state::AppState;
pub use workflow::QuestionFlow;

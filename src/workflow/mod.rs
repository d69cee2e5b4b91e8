pub mod question_flow;
pub mod request_ctx;

pub use question_flow::QuestionFlow;
pub use request_ctx::{RequestCtx, RequestStage};

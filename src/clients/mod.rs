pub mod gemini_client;
pub mod llm_client;
pub mod openai_client;

pub use gemini_client::GeminiClient;
pub use llm_client::{build_chat_model, ChatModel};
pub use openai_client::OpenAiCompatClient;

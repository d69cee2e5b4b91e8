pub mod document_formats;
pub mod question_generator;
pub mod reply_parser;
pub mod text_extractor;

pub use question_generator::QuestionGenerator;
pub use reply_parser::parse_model_reply;
pub use text_extractor::TextExtractor;

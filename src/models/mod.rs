pub mod question;

pub use question::{GeneratedQuestion, QuestionSet, OPTIONS_PER_QUESTION};

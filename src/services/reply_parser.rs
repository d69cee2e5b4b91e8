//! 模型回复解析
//!
//! 模型经常在 JSON 前后附带说明文字，所以先找第一个 `[` 到最后一个 `]`
//! 之间的内容；找不到再把整段回复当作 JSON 解析。

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ParseError;
use crate::models::QuestionSet;

fn json_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("静态正则"))
}

/// 从模型回复中解析题目列表
pub fn parse_model_reply(raw: &str) -> Result<QuestionSet, ParseError> {
    if let Some(found) = json_array_re().find(raw) {
        return serde_json::from_str(found.as_str()).map_err(|source| ParseError { source });
    }

    serde_json::from_str(raw.trim()).map_err(|source| ParseError { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRAY: &str = r#"[
  {"id": 1, "text": "What is the powerhouse of the cell?", "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi"], "correctAnswer": "Mitochondria"},
  {"id": 2, "text": "Which organelle makes proteins?", "options": ["Ribosome", "Lysosome", "Vacuole", "Centriole"], "correctAnswer": "Ribosome"}
]"#;

    #[test]
    fn test_pure_json() {
        let questions = parse_model_reply(ARRAY).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, 1);
        assert_eq!(questions[1].correct_answer, "Ribosome");
    }

    #[test]
    fn test_array_inside_prose_and_fences() {
        let reply = format!("Sure! Here are your questions:\n```json\n{ARRAY}\n```\nGood luck with your studies.");
        let framed = parse_model_reply(&reply).unwrap();
        assert_eq!(framed, parse_model_reply(ARRAY).unwrap());
    }

    #[test]
    fn test_no_json_anywhere() {
        let err = parse_model_reply("I'm sorry, I can't help with that.").unwrap_err();
        assert_eq!(err.to_string(), "Invalid response format from AI");
    }

    #[test]
    fn test_broken_array_is_error() {
        let err = parse_model_reply(r#"Here: [{"id": 1, "text": "cut off"#).unwrap_err();
        assert_eq!(err.to_string(), "Invalid response format from AI");

        let err = parse_model_reply(r#"Options are [a] and [b]"#).unwrap_err();
        assert!(!err.to_string().contains("[a]"));
    }

    #[test]
    fn test_loosely_typed_questions_are_accepted() {
        let reply = r#"Sure: [{"id":1,"text":"2+2?","options":[3,4,5,6],"correctAnswer":4},
            {"id":2,"text":"Capital of France?","options":["Paris","Rome","Madrid","Berlin"]}]"#;
        let questions = parse_model_reply(reply).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].correct_answer, "4");
        assert!(questions[0].is_well_formed());
        assert_eq!(questions[1].correct_answer, "");
        assert!(!questions[1].is_well_formed());
    }

    #[test]
    fn test_empty_array() {
        assert!(parse_model_reply("[]").unwrap().is_empty());
    }
}

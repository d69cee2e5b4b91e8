use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 每道题的选项数量
pub const OPTIONS_PER_QUESTION: usize = 4;

/// 模型生成的一道选择题
///
/// 模型输出不总是严格符合约定：选项或答案可能是数字，答案字段可能缺失。
/// 这里尽量接收并转为字符串，是否合规交给 `is_well_formed` 判断。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u32,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<String>,
    #[serde(
        rename = "correctAnswer",
        default,
        deserialize_with = "deserialize_text"
    )]
    pub correct_answer: String,
}

impl GeneratedQuestion {
    /// 选项数量为 4 且正确答案在选项之中
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == OPTIONS_PER_QUESTION
            && self.options.iter().any(|o| o == &self.correct_answer)
    }
}

/// 一次请求返回的题目列表
pub type QuestionSet = Vec<GeneratedQuestion>;

// 模型偶尔把 id 写成字符串或 1.0，这里都接受
fn deserialize_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = u32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a positive integer or a numeric string")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u32::try_from(value).map_err(|_| E::custom("id out of range"))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            u32::try_from(value).map_err(|_| E::custom("id out of range"))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX) {
                Ok(value as u32)
            } else {
                Err(E::custom("id is not a whole number"))
            }
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| E::custom("id is not a number"))
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

// 单个标量也当作只有一个选项的列表
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_text(other)],
    })
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

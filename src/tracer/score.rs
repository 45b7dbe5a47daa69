//! Evaluation scores attached to traces and observations.

use super::events::{ScoreBody, ScoreDataType};
use serde_json::Value;

/// Value of a score
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreValue {
    Numeric(f64),
    Categorical(String),
    Boolean(bool),
}

impl ScoreValue {
    pub fn data_type(&self) -> ScoreDataType {
        match self {
            ScoreValue::Numeric(_) => ScoreDataType::Numeric,
            ScoreValue::Categorical(_) => ScoreDataType::Categorical,
            ScoreValue::Boolean(_) => ScoreDataType::Boolean,
        }
    }

    /// JSON value as sent on the wire; booleans are encoded as 0 or 1.
    pub fn to_json(&self) -> Value {
        match self {
            ScoreValue::Numeric(value) => serde_json::json!(value),
            ScoreValue::Categorical(label) => Value::String(label.clone()),
            ScoreValue::Boolean(flag) => serde_json::json!(if *flag { 1 } else { 0 }),
        }
    }
}

impl From<f64> for ScoreValue {
    fn from(value: f64) -> Self {
        ScoreValue::Numeric(value)
    }
}

impl From<f32> for ScoreValue {
    fn from(value: f32) -> Self {
        ScoreValue::Numeric(f64::from(value))
    }
}

impl From<bool> for ScoreValue {
    fn from(value: bool) -> Self {
        ScoreValue::Boolean(value)
    }
}

impl From<&str> for ScoreValue {
    fn from(value: &str) -> Self {
        ScoreValue::Categorical(value.to_string())
    }
}

impl From<String> for ScoreValue {
    fn from(value: String) -> Self {
        ScoreValue::Categorical(value)
    }
}

/// An evaluation to attach to a trace, or to one observation within it
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub name: String,
    pub value: ScoreValue,
    pub comment: Option<String>,
    pub id: Option<String>,
}

impl Score {
    pub fn new(name: impl Into<String>, value: impl Into<ScoreValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            comment: None,
            id: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Use a caller-chosen id, making repeated submissions idempotent.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn into_body(self, trace_id: &str, observation_id: Option<String>) -> ScoreBody {
        ScoreBody {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            trace_id: trace_id.to_string(),
            observation_id,
            name: self.name,
            value: self.value.to_json(),
            data_type: self.value.data_type(),
            comment: self.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_score() {
        let score = Score::new("creativity", 0.95).with_comment("very creative");
        let body = score.into_body("trace-1", None);

        assert_eq!(body.data_type, ScoreDataType::Numeric);
        assert_eq!(body.value, serde_json::json!(0.95));
        assert_eq!(body.comment.as_deref(), Some("very creative"));
        assert!(!body.id.is_empty());
    }

    #[test]
    fn test_categorical_score() {
        let body = Score::new("sentiment", "POSITIVE").into_body("trace-1", Some("obs".into()));

        assert_eq!(body.data_type, ScoreDataType::Categorical);
        assert_eq!(body.value, "POSITIVE");
        assert_eq!(body.observation_id.as_deref(), Some("obs"));
    }

    #[test]
    fn test_boolean_score_encoded_as_number() {
        assert_eq!(ScoreValue::Boolean(true).to_json(), serde_json::json!(1));
        assert_eq!(ScoreValue::Boolean(false).to_json(), serde_json::json!(0));
        assert_eq!(ScoreValue::from(true).data_type(), ScoreDataType::Boolean);
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let body = Score::new("clarity", 0.8).with_id("fixed").into_body("t", None);
        assert_eq!(body.id, "fixed");
    }
}

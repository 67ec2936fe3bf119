use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A user-entered value, parsed according to the implementation kind of its
/// declared data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Datetime(NaiveDateTime),
    PhoneNumber(String),
}

impl TypedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Text(_) => "text",
            TypedValue::Integer(_) => "integer",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::Datetime(_) => "datetime",
            TypedValue::PhoneNumber(_) => "phone_number",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("unknown data type kind {0}")]
    UnknownKind(String),
    #[error("invalid {kind} value '{value}': {reason}")]
    Invalid {
        kind: String,
        value: String,
        reason: String,
    },
}

/// Converts between stored text and typed values. Implementations must be
/// lossless: `create(kind, &serialize(v)) == v` for every value they produce.
pub trait ValueFactory: Send + Sync {
    fn create(&self, kind: &str, text: &str) -> Result<TypedValue, ValueError>;

    fn serialize(&self, value: &TypedValue) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardValueFactory;

impl ValueFactory for StandardValueFactory {
    fn create(&self, kind: &str, text: &str) -> Result<TypedValue, ValueError> {
        let invalid = |reason: String| ValueError::Invalid {
            kind: kind.to_string(),
            value: text.to_string(),
            reason,
        };

        match kind {
            "text" => Ok(TypedValue::Text(text.to_string())),
            "integer" => text
                .trim()
                .parse()
                .map(TypedValue::Integer)
                .map_err(|err| invalid(err.to_string())),
            "boolean" => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(TypedValue::Boolean(true)),
                "false" | "0" | "no" => Ok(TypedValue::Boolean(false)),
                _ => Err(invalid("expected true or false".into())),
            },
            "datetime" => NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                .map(TypedValue::Datetime)
                .map_err(|err| invalid(err.to_string())),
            "phone_number" => normalize_phone_number(text)
                .map(TypedValue::PhoneNumber)
                .ok_or_else(|| invalid("expected digits with an optional leading +".into())),
            other => Err(ValueError::UnknownKind(other.to_string())),
        }
    }

    fn serialize(&self, value: &TypedValue) -> String {
        match value {
            TypedValue::Text(text) | TypedValue::PhoneNumber(text) => text.clone(),
            TypedValue::Integer(number) => number.to_string(),
            TypedValue::Boolean(flag) => flag.to_string(),
            TypedValue::Datetime(at) => at.format(DATETIME_FORMAT).to_string(),
        }
    }
}

fn normalize_phone_number(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (prefix, rest) = match raw.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", raw),
    };

    let mut digits = String::with_capacity(rest.len());
    for ch in rest.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            ' ' | '-' | '.' | '(' | ')' => {}
            _ => return None,
        }
    }

    if digits.is_empty() {
        None
    } else {
        Some(format!("{prefix}{digits}"))
    }
}

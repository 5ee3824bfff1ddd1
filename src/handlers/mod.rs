//! HTTP handlers. Each handler parses its input, delegates to a service on
//! `AppState`, and converts service errors into `AppError` responses.

pub mod auth_handlers;
pub mod file_handlers;
pub mod folder_handlers;
pub mod health_handlers;

use crate::errors::AppError;
use serde::Deserialize;

/// A group number sent either as a JSON number or as numeric text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupNumber {
    Int(i64),
    Text(String),
}

impl GroupNumber {
    pub fn value(&self) -> Result<i64, AppError> {
        match self {
            GroupNumber::Int(n) => Ok(*n),
            GroupNumber::Text(raw) => parse_group(raw),
        }
    }
}

/// One group number or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GroupList {
    Many(Vec<GroupNumber>),
    One(GroupNumber),
}

impl GroupList {
    pub fn values(&self) -> Result<Vec<i64>, AppError> {
        match self {
            GroupList::Many(items) => items.iter().map(GroupNumber::value).collect(),
            GroupList::One(item) => Ok(vec![item.value()?]),
        }
    }
}

/// A visibility flag sent as a JSON boolean or as the text `"true"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    pub fn value(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(raw) => parse_flag(raw),
        }
    }
}

pub(crate) fn parse_group(raw: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("invalid group number `{raw}`")))
}

pub(crate) fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_list_accepts_single_and_many() {
        let one: GroupList = serde_json::from_str("3").unwrap();
        assert_eq!(one.values().unwrap(), vec![3]);

        let many: GroupList = serde_json::from_str(r#"[1, "2", 5]"#).unwrap();
        assert_eq!(many.values().unwrap(), vec![1, 2, 5]);

        let bad: GroupList = serde_json::from_str(r#"["two"]"#).unwrap();
        assert!(bad.values().is_err());
    }

    #[test]
    fn flag_accepts_bool_and_text() {
        assert!(serde_json::from_str::<Flag>("true").unwrap().value());
        assert!(serde_json::from_str::<Flag>(r#""true""#).unwrap().value());
        assert!(!serde_json::from_str::<Flag>(r#""false""#).unwrap().value());
        assert!(!serde_json::from_str::<Flag>(r#""yes""#).unwrap().value());
    }
}

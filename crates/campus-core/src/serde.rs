//! Deserialization helpers for query strings.
//!
//! Filter structs flatten [`PaginationParams`](crate::PaginationParams), and
//! serde buffers flattened query values as strings. Non-string fields must
//! therefore parse from a string, and an empty string means "not set".

use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use uuid::Uuid;

fn deserialize_optional_parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_parsed(deserializer)
}

pub fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_parsed(deserializer)
}

pub fn deserialize_optional_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_parsed(deserializer)
}

/// Works for any `FromStr` type: typed ids, enums, dates.
pub fn deserialize_optional_from_str<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    deserialize_optional_parsed(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Filter {
        #[serde(default, deserialize_with = "deserialize_optional_bool")]
        is_active: Option<bool>,
        #[serde(default, deserialize_with = "deserialize_optional_i32")]
        level: Option<i32>,
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        id: Option<Uuid>,
    }

    #[test]
    fn test_parses_string_values() {
        let f: Filter = serde_json::from_str(
            r#"{"is_active":"true","level":"3","id":"6f1b3c1e-7f6e-4d3c-9a62-0d3b9c1b2a11"}"#,
        )
        .unwrap();
        assert_eq!(f.is_active, Some(true));
        assert_eq!(f.level, Some(3));
        assert!(f.id.is_some());
    }

    #[test]
    fn test_empty_strings_are_none() {
        let f: Filter = serde_json::from_str(r#"{"is_active":"","level":" ","id":""}"#).unwrap();
        assert!(f.is_active.is_none());
        assert!(f.level.is_none());
        assert!(f.id.is_none());
    }

    #[test]
    fn test_missing_fields_are_none() {
        let f: Filter = serde_json::from_str("{}").unwrap();
        assert!(f.is_active.is_none());
    }

    #[test]
    fn test_invalid_value_errors() {
        let result = serde_json::from_str::<Filter>(r#"{"level":"abc"}"#);
        assert!(result.is_err());
    }
}

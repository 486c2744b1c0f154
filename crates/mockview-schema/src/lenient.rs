//! Deserialisation helpers for records produced by a generative model.
//!
//! Model output drifts: numbers arrive as strings, lists arrive as a single
//! string or `null`, labels change case. These helpers accept the common
//! variants and fall back to the field default instead of failing the whole
//! record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse the field as `T`, or use `T::default()` when the value has the wrong shape.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Accepts a string, a number, or `null`.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Accepts a list of strings, a single string, or `null`. Non-string items are skipped.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// Accepts integers, floats, and numeric strings such as `"75"` or `"75%"`.
pub fn number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

pub fn number_from_value(value: &Value) -> u32 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Normalise a label for matching: lowercase, trimmed, separators folded to `_`.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "string_list")]
        items: Vec<String>,
        #[serde(default, deserialize_with = "number")]
        score: u32,
        #[serde(default, deserialize_with = "text")]
        note: String,
    }

    #[test]
    fn string_list_accepts_single_string_and_null() {
        let p: Sample = serde_json::from_str(r#"{"items": "sql"}"#).unwrap();
        assert_eq!(p.items, vec!["sql"]);
        let p: Sample = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(p.items.is_empty());
        let p: Sample = serde_json::from_str(r#"{"items": ["git", 3, "", "docker"]}"#).unwrap();
        assert_eq!(p.items, vec!["git", "docker"]);
    }

    #[test]
    fn number_accepts_strings_and_floats() {
        let p: Sample = serde_json::from_str(r#"{"score": "75%"}"#).unwrap();
        assert_eq!(p.score, 75);
        let p: Sample = serde_json::from_str(r#"{"score": 6.6}"#).unwrap();
        assert_eq!(p.score, 7);
        let p: Sample = serde_json::from_str(r#"{"score": "high"}"#).unwrap();
        assert_eq!(p.score, 0);
        let p: Sample = serde_json::from_str(r#"{"score": -3}"#).unwrap();
        assert_eq!(p.score, 0);
    }

    #[test]
    fn text_accepts_null_and_numbers() {
        let p: Sample = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(p.note, "");
        let p: Sample = serde_json::from_str(r#"{"note": 42}"#).unwrap();
        assert_eq!(p.note, "42");
    }

    #[test]
    fn normalize_label_folds_case_and_separators() {
        assert_eq!(normalize_label(" Off-Topic "), "off_topic");
        assert_eq!(normalize_label("No Technical"), "no_technical");
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single free-form metadata value. The API stores metadata as an
/// untyped JSON object; only strings and numbers are meaningful here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

/// Free-form device metadata used for typed lookups.
///
/// All limit/mail/phone/silenced-until reads go through the `text` and
/// `seconds` accessors so the absent/empty/unparseable rules live in one
/// place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.0.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Look up a textual value. Empty or whitespace-only strings count as
    /// absent. Whole numbers render without a fraction so numeric phone
    /// values stay usable.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            MetadataValue::Text(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            MetadataValue::Number(value) => {
                if value.fract() == 0.0 {
                    Some(format!("{}", *value as i64))
                } else {
                    Some(value.to_string())
                }
            }
        }
    }

    /// Look up a duration in seconds. Non-numeric text counts as absent.
    pub fn seconds(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            MetadataValue::Number(value) => Some(*value as i64),
            MetadataValue::Text(value) => value.trim().parse::<i64>().ok(),
        }
    }
}

impl From<BTreeMap<String, MetadataValue>> for Metadata {
    fn from(map: BTreeMap<String, MetadataValue>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(entries: &[(&str, MetadataValue)]) -> Metadata {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_text_returns_trimmed_value() {
        let meta = metadata(&[("mail", MetadataValue::Text(" ops@example.com ".into()))]);
        assert_eq!(meta.text("mail").as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_text_treats_empty_as_absent() {
        let meta = metadata(&[("mail", MetadataValue::Text("   ".into()))]);
        assert_eq!(meta.text("mail"), None);
        assert_eq!(meta.text("missing"), None);
    }

    #[test]
    fn test_text_formats_whole_numbers_without_fraction() {
        let meta = metadata(&[("phone", MetadataValue::Number(4512345678.0))]);
        assert_eq!(meta.text("phone").as_deref(), Some("4512345678"));
    }

    #[test]
    fn test_seconds_from_number_and_numeric_text() {
        let meta = metadata(&[
            ("limit", MetadataValue::Number(60.0)),
            ("limit_text", MetadataValue::Text("120".into())),
        ]);
        assert_eq!(meta.seconds("limit"), Some(60));
        assert_eq!(meta.seconds("limit_text"), Some(120));
    }

    #[test]
    fn test_seconds_treats_non_numeric_as_absent() {
        let meta = metadata(&[("limit", MetadataValue::Text("an hour".into()))]);
        assert_eq!(meta.seconds("limit"), None);
        assert_eq!(meta.seconds("missing"), None);
    }

    #[test]
    fn test_deserialize_from_api_json() {
        let meta: Metadata =
            serde_json::from_str(r#"{"limit": 60, "mail": "a@b.dk"}"#).unwrap();
        assert_eq!(meta.seconds("limit"), Some(60));
        assert_eq!(meta.text("mail").as_deref(), Some("a@b.dk"));
    }
}

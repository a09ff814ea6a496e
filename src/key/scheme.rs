use crate::errors::KeyError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Timestamp layout appended to sort key prefixes (microsecond precision)
pub const SORT_KEY_TIMESTAMP_FORMAT: &str = "%Y:%m:%d:%H:%M:%S:%6f";

/// Registry of sort key prefixes, one per entity type.
///
/// Generated sort keys are `<prefix><timestamp>` so that items of one type sort by creation
/// time inside a partition. No uniqueness check is made: two keys generated for the same
/// entity type within the same microsecond are identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    prefixes: BTreeMap<String, String>,
}

impl KeyScheme {
    /// A scheme with no registered entity types
    pub fn empty() -> Self {
        Self {
            prefixes: BTreeMap::new(),
        }
    }

    pub fn with_prefix(mut self, entity_type: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prefixes.insert(entity_type.into(), prefix.into());
        self
    }

    pub fn prefix(&self, entity_type: &str) -> Result<&str, KeyError> {
        self.prefixes
            .get(entity_type)
            .map(String::as_str)
            .ok_or_else(|| KeyError::UnknownEntityType(entity_type.to_string()))
    }

    pub fn generate_sort_key(&self, entity_type: &str) -> Result<String, KeyError> {
        self.generate_sort_key_at(entity_type, Utc::now())
    }

    pub fn generate_sort_key_at(
        &self,
        entity_type: &str,
        at: DateTime<Utc>,
    ) -> Result<String, KeyError> {
        let prefix = self.prefix(entity_type)?;
        Ok(format!("{prefix}{}", at.format(SORT_KEY_TIMESTAMP_FORMAT)))
    }

    /// Find the entity type whose prefix starts `sort_key`.
    /// The longest matching prefix wins.
    pub fn entity_type_of(&self, sort_key: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .filter(|(_, prefix)| sort_key.starts_with(prefix.as_str()))
            .max_by_key(|(_, prefix)| prefix.len())
            .map(|(entity_type, _)| entity_type.as_str())
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.prefixes.keys().map(String::as_str)
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::empty()
            .with_prefix("VIDEO", "vid#")
            .with_prefix("POST", "pst#")
            .with_prefix("COMMENT", "cmt#")
            .with_prefix("PLIKE", "plk#")
            .with_prefix("CLIKE", "clk#")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn generated_key_has_prefix_and_microsecond_timestamp() {
        let scheme = KeyScheme::default();
        let at = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .expect("valid timestamp")
            + chrono::Duration::microseconds(42);

        let sk = scheme
            .generate_sort_key_at("VIDEO", at)
            .expect("VIDEO is registered");

        assert_eq!(sk, "vid#2024:03:09:07:05:01:000042");
    }

    #[test]
    fn every_default_type_generates_with_its_prefix() {
        let scheme = KeyScheme::default();

        for entity_type in ["VIDEO", "POST", "COMMENT", "PLIKE", "CLIKE"] {
            let sk = scheme.generate_sort_key(entity_type).unwrap();
            let prefix = scheme.prefix(entity_type).unwrap();
            assert!(sk.starts_with(prefix), "{sk} should start with {prefix}");
        }
    }

    #[test]
    fn generated_keys_do_not_decrease() {
        let scheme = KeyScheme::default();

        let keys: Vec<String> = (0..50)
            .map(|_| scheme.generate_sort_key("POST").unwrap())
            .collect();

        assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        let scheme = KeyScheme::default();

        assert_eq!(
            scheme.generate_sort_key("ALBUM"),
            Err(KeyError::UnknownEntityType("ALBUM".into()))
        );
        assert!(KeyScheme::empty().generate_sort_key("VIDEO").is_err());
    }

    #[test]
    fn entity_type_is_recovered_from_sort_key() {
        let scheme = KeyScheme::default().with_prefix("VIDEO_DRAFT", "vid#draft#");

        assert_eq!(scheme.entity_type_of("pst#2024:01:01"), Some("POST"));
        assert_eq!(scheme.entity_type_of("vid#draft#2024"), Some("VIDEO_DRAFT"));
        assert_eq!(scheme.entity_type_of("vid#2024"), Some("VIDEO"));
        assert_eq!(scheme.entity_type_of("usr#2024"), None);
    }
}

mod scheme;
pub use scheme::*;

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

pub const DEFAULT_PARTITION_KEY: &str = "pk";
pub const DEFAULT_SORT_KEY: &str = "sk";

/// Names of the two key attributes of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: String,
    pub sort_key: String,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    pub fn is_key_attribute(&self, name: &str) -> bool {
        name == self.partition_key || name == self.sort_key
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::new(DEFAULT_PARTITION_KEY, DEFAULT_SORT_KEY)
    }
}

/// The primary key of one item: partition key value plus sort key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub pk: String,
    pub sk: String,
}

impl Key {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// The key map sent to the store for single item operations
    pub fn to_attributes(&self, schema: &KeySchema) -> HashMap<String, AttributeValue> {
        HashMap::from([
            (
                schema.partition_key.clone(),
                AttributeValue::S(self.pk.clone()),
            ),
            (schema.sort_key.clone(), AttributeValue::S(self.sk.clone())),
        ])
    }

    /// Read a key back out of an attribute map. Both attributes must be strings.
    pub fn from_attributes(
        attributes: &HashMap<String, AttributeValue>,
        schema: &KeySchema,
    ) -> Option<Self> {
        let pk = attributes.get(&schema.partition_key)?.as_s().ok()?;
        let sk = attributes.get(&schema.sort_key)?.as_s().ok()?;

        Some(Self::new(pk, sk))
    }
}

impl<P: Into<String>, S: Into<String>> From<(P, S)> for Key {
    fn from(value: (P, S)) -> Self {
        Self::new(value.0, value.1)
    }
}

use crate::{
    expression::{
        path::{steps, Step},
        resolve,
    },
    key::{Key, KeySchema},
};
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// A single table item: an attribute map that always carries the partition and sort key.
/// No further schema is enforced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item(HashMap<String, AttributeValue>);

impl Item {
    pub fn new(key: impl Into<Key>, schema: &KeySchema) -> Self {
        Self(key.into().to_attributes(schema))
    }

    /// Convert any serializable value into an item via `serde_dynamo`
    pub fn from_serde<T: Serialize>(value: T) -> Result<Self, serde_dynamo::Error> {
        serde_dynamo::to_item(value).map(Self)
    }

    /// Convert the item into any deserializable value via `serde_dynamo`
    pub fn into_serde<T: DeserializeOwned>(self) -> Result<T, serde_dynamo::Error> {
        serde_dynamo::from_item(self.0)
    }

    pub fn with(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn get_s(&self, name: &str) -> Option<&str> {
        self.get(name)?.as_s().ok().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.0.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn key(&self, schema: &KeySchema) -> Option<Key> {
        Key::from_attributes(&self.0, schema)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Keep only the values at the given document paths. Nested maps keep just the projected
    /// members and projected list elements keep their relative order. No paths keeps everything.
    pub(crate) fn project<S: AsRef<str>>(self, paths: &[S]) -> Self {
        if paths.is_empty() {
            return self;
        }

        let mut found: Vec<(Vec<Step>, &AttributeValue)> = paths
            .iter()
            .filter_map(|path| {
                let path = path.as_ref();
                Some((steps(path)?, resolve(&self.0, path)?))
            })
            .collect();
        found.sort_by(|(a, _), (b, _)| a.cmp(b));

        let mut projected = HashMap::new();
        for (steps, value) in found {
            insert_projected(&mut projected, &steps, value.clone());
        }

        Self(projected)
    }

    pub(crate) fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.0
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut HashMap<String, AttributeValue> {
        &mut self.0
    }

    pub fn into_inner(self) -> HashMap<String, AttributeValue> {
        self.0
    }
}

impl From<HashMap<String, AttributeValue>> for Item {
    fn from(map: HashMap<String, AttributeValue>) -> Self {
        Self(map)
    }
}

impl From<Item> for HashMap<String, AttributeValue> {
    fn from(item: Item) -> Self {
        item.0
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for Item {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for Item {
    type Item = (String, AttributeValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn insert_projected(
    attributes: &mut HashMap<String, AttributeValue>,
    steps: &[Step],
    value: AttributeValue,
) {
    let Some((Step::Attribute(name), rest)) = steps.split_first() else {
        return;
    };

    match rest.first() {
        None => {
            attributes.insert(name.to_string(), value);
        }
        Some(next) => {
            let child = attributes
                .entry(name.to_string())
                .or_insert_with(|| empty_container(next));
            insert_nested(child, rest, value);
        }
    }
}

fn insert_nested(container: &mut AttributeValue, steps: &[Step], value: AttributeValue) {
    match (container, steps.first()) {
        (AttributeValue::M(map), Some(Step::Attribute(_))) => insert_projected(map, steps, value),
        (AttributeValue::L(list), Some(Step::Index(_))) => match steps.get(1) {
            None => list.push(value),
            Some(next) => {
                list.push(empty_container(next));
                if let Some(child) = list.last_mut() {
                    insert_nested(child, &steps[1..], value);
                }
            }
        },
        _ => {}
    }
}

fn empty_container(step: &Step) -> AttributeValue {
    match step {
        Step::Attribute(_) => AttributeValue::M(HashMap::new()),
        Step::Index(_) => AttributeValue::L(Vec::new()),
    }
}

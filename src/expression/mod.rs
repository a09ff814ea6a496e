//! Expression text and placeholder tables for DynamoDB requests.
//!
//! Values never appear inside expression text. Each bound value gets a generated `:X` token and
//! each attribute name a generated `#X` alias, recorded in a [`Placeholders`] table that travels
//! with the request.
mod condition;
pub(crate) mod path;
mod update;

pub use condition::{Comparison, Condition, SortKeyCondition};
pub(crate) use condition::{compare_numbers, resolve};
pub(crate) use update::is_empty_set;
pub use update::{Directive, DirectiveKind, UpdateExpression};

use aws_sdk_dynamodb::types::AttributeValue;
use itertools::Itertools;
use std::collections::HashMap;

const ALPHABET_LEN: usize = 26;

/// Letters for the `index`th placeholder in bijective base 26: `A`..`Z`, `AA`..`ZZ`, `AAA`, ...
pub fn placeholder_token(index: usize) -> String {
    let mut letters = Vec::new();
    let mut index = index;

    loop {
        // index % 26 always fits in a u8
        letters.push(char::from(b'A' + (index % ALPHABET_LEN) as u8));
        if index < ALPHABET_LEN {
            break;
        }
        index = index / ALPHABET_LEN - 1;
    }

    letters.iter().rev().collect()
}

/// Placeholder allocator and table for one request.
///
/// Value tokens (`:A`, `:B`, ...) are allocated in strict sequence, one per bound value.
/// Name aliases (`#A`, `#B`, ...) are allocated once per distinct attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placeholders {
    names: HashMap<String, String>,
    aliases: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue allocating after existing name and value tables
    pub fn with_tables(
        names: HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
    ) -> Self {
        let aliases = names
            .iter()
            .map(|(alias, name)| (name.clone(), alias.clone()))
            .collect();

        Self {
            names,
            aliases,
            values,
        }
    }

    /// Bind a value and return its token
    pub fn value(&mut self, value: AttributeValue) -> String {
        let token = format!(":{}", placeholder_token(self.values.len()));
        self.values.insert(token.clone(), value);
        token
    }

    /// Alias a single attribute name
    pub fn name(&mut self, attribute: &str) -> String {
        if let Some(alias) = self.aliases.get(attribute) {
            return alias.clone();
        }

        let alias = format!("#{}", placeholder_token(self.names.len()));
        self.names.insert(alias.clone(), attribute.to_string());
        self.aliases.insert(attribute.to_string(), alias.clone());
        alias
    }

    /// Alias every segment of a dotted document path. List indexes stay outside the alias,
    /// so `tags[0]` renders as `#A[0]`.
    pub fn path(&mut self, path: &str) -> String {
        path.split('.')
            .map(|segment| {
                let (name, indexes) = path::split_segment(segment);
                format!("{}{indexes}", self.name(name))
            })
            .join(".")
    }

    /// Render a projection expression for `attributes`, or `None` when there is nothing to project
    pub fn projection<S: AsRef<str>>(&mut self, attributes: &[S]) -> Option<String> {
        if attributes.is_empty() {
            return None;
        }

        Some(
            attributes
                .iter()
                .map(|attribute| self.path(attribute.as_ref()))
                .join(", "),
        )
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    /// Split into the request's name and value maps. Empty maps are dropped because the
    /// store rejects empty `ExpressionAttributeNames`/`ExpressionAttributeValues`.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_count_in_bijective_base_26() {
        assert_eq!(placeholder_token(0), "A");
        assert_eq!(placeholder_token(1), "B");
        assert_eq!(placeholder_token(25), "Z");
        assert_eq!(placeholder_token(26), "AA");
        assert_eq!(placeholder_token(27), "AB");
        assert_eq!(placeholder_token(51), "AZ");
        assert_eq!(placeholder_token(52), "BA");
        assert_eq!(placeholder_token(701), "ZZ");
        assert_eq!(placeholder_token(702), "AAA");
    }

    #[test]
    fn tokens_never_collide() {
        let tokens: std::collections::HashSet<String> = (0..5000).map(placeholder_token).collect();
        assert_eq!(tokens.len(), 5000);
    }

    #[test]
    fn values_are_bound_in_sequence() {
        let mut placeholders = Placeholders::new();

        assert_eq!(placeholders.value(AttributeValue::S("a".into())), ":A");
        assert_eq!(placeholders.value(AttributeValue::S("a".into())), ":B");
        assert_eq!(placeholders.values().len(), 2);
    }

    #[test]
    fn names_are_reused_per_attribute() {
        let mut placeholders = Placeholders::new();

        assert_eq!(placeholders.name("status"), "#A");
        assert_eq!(placeholders.path("profile.status"), "#B.#A");
        assert_eq!(placeholders.name("status"), "#A");
        assert_eq!(placeholders.names().get("#B").map(String::as_str), Some("profile"));
    }

    #[test]
    fn list_indexes_stay_outside_aliases() {
        let mut placeholders = Placeholders::new();

        assert_eq!(placeholders.path("tags[0]"), "#A[0]");
        assert_eq!(placeholders.path("comments[1][2].author"), "#B[1][2].#C");
        assert_eq!(placeholders.names().get("#A").map(String::as_str), Some("tags"));
        assert_eq!(placeholders.names().len(), 3);
    }

    #[test]
    fn projection_aliases_each_attribute() {
        let mut placeholders = Placeholders::new();

        let projection = placeholders.projection(&["name", "size", "name"]);

        assert_eq!(projection.as_deref(), Some("#A, #B, #A"));
        assert_eq!(placeholders.projection::<&str>(&[]), None);
    }

    #[test]
    fn empty_tables_are_dropped() {
        assert_eq!(Placeholders::new().into_parts(), (None, None));

        let mut placeholders = Placeholders::with_tables(
            HashMap::new(),
            HashMap::from([(":A".to_string(), AttributeValue::Bool(true))]),
        );
        assert_eq!(placeholders.value(AttributeValue::Bool(false)), ":B");
        let (names, values) = placeholders.into_parts();
        assert!(names.is_none());
        assert_eq!(values.map(|v| v.len()), Some(2));
    }

    #[test]
    fn existing_names_are_reused() {
        let mut placeholders = Placeholders::with_tables(
            HashMap::from([("#A".to_string(), "views".to_string())]),
            HashMap::new(),
        );

        assert_eq!(placeholders.name("views"), "#A");
        assert_eq!(placeholders.name("status"), "#B");
    }
}

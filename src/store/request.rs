use super::PageToken;
use crate::{
    config::DEFAULT_PAGE_SIZE,
    expression::{Condition, Placeholders, SortKeyCondition, UpdateExpression},
    item::Item,
    key::{Key, KeySchema},
};
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use std::collections::HashMap;

/// The expression parameters of one request, ready for the wire
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expressions {
    pub key_condition: Option<String>,
    pub condition: Option<String>,
    pub update: Option<String>,
    pub filter: Option<String>,
    pub projection: Option<String>,
    pub select: Option<Select>,
    pub names: Option<HashMap<String, String>>,
    pub values: Option<HashMap<String, AttributeValue>>,
}

impl Expressions {
    fn finish(mut self, placeholders: Placeholders) -> Self {
        let (names, values) = placeholders.into_parts();
        self.names = names;
        self.values = values;
        self
    }
}

/// Write a whole item. Unless `overwrite` is set the write is guarded so that it fails when an
/// item with the same key already exists.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    pub item: Item,
    pub overwrite: bool,
}

impl PutRequest {
    pub fn guard(&self, schema: &KeySchema) -> Option<Condition> {
        (!self.overwrite).then(|| {
            Condition::not_exists(&schema.partition_key)
                .and(Condition::not_exists(&schema.sort_key))
        })
    }

    pub fn expressions(&self, schema: &KeySchema) -> Expressions {
        let mut placeholders = Placeholders::new();
        Expressions {
            condition: self
                .guard(schema)
                .map(|guard| guard.render(&mut placeholders)),
            ..Default::default()
        }
        .finish(placeholders)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    pub key: Key,
    pub attributes: Vec<String>,
    pub consistent_read: bool,
}

impl GetRequest {
    pub fn expressions(&self, _schema: &KeySchema) -> Expressions {
        let mut placeholders = Placeholders::new();
        Expressions {
            projection: placeholders.projection(&self.attributes),
            ..Default::default()
        }
        .finish(placeholders)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub key: Key,
    pub update: UpdateExpression,
}

impl UpdateRequest {
    pub fn expressions(&self, _schema: &KeySchema) -> Expressions {
        let placeholders =
            Placeholders::with_tables(self.update.names().clone(), self.update.values().clone());
        Expressions {
            update: Some(self.update.expression().to_string()),
            ..Default::default()
        }
        .finish(placeholders)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub key: Key,
}

/// Paging, filtering, projection and consistency settings shared by queries and scans
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub page_size: usize,
    pub start: Option<PageToken>,
    pub filter: Option<Condition>,
    pub attributes: Vec<String>,
    pub consistent_read: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            start: None,
            filter: None,
            attributes: Vec::new(),
            consistent_read: false,
        }
    }
}

impl PageOptions {
    fn render(&self, mut expressions: Expressions, mut placeholders: Placeholders) -> Expressions {
        expressions.filter = self
            .filter
            .as_ref()
            .map(|filter| filter.render(&mut placeholders));
        expressions.projection = placeholders.projection(&self.attributes);
        expressions.select = expressions
            .projection
            .is_some()
            .then_some(Select::SpecificAttributes);
        expressions.finish(placeholders)
    }

    pub(crate) fn limit(&self) -> i32 {
        i32::try_from(self.page_size).unwrap_or(i32::MAX)
    }
}

/// Items of one partition, optionally narrowed by a sort key condition.
/// Results come newest first unless `descending` is cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub partition_key: String,
    pub sort_key: Option<SortKeyCondition>,
    pub descending: bool,
    pub options: PageOptions,
}

impl QueryRequest {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            descending: true,
            options: PageOptions::default(),
        }
    }

    pub fn key_condition(&self, schema: &KeySchema) -> Condition {
        let partition = Condition::eq(
            &schema.partition_key,
            AttributeValue::S(self.partition_key.clone()),
        );

        match &self.sort_key {
            Some(sort_key) => partition.and(sort_key.to_condition(&schema.sort_key)),
            None => partition,
        }
    }

    pub fn expressions(&self, schema: &KeySchema) -> Expressions {
        let mut placeholders = Placeholders::new();
        let expressions = Expressions {
            key_condition: Some(self.key_condition(schema).render(&mut placeholders)),
            ..Default::default()
        };
        self.options.render(expressions, placeholders)
    }
}

/// Every item of the table, in store order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanRequest {
    pub options: PageOptions,
}

impl ScanRequest {
    pub fn expressions(&self, _schema: &KeySchema) -> Expressions {
        self.options
            .render(Expressions::default(), Placeholders::new())
    }
}

//! An in-process [`Store`] that follows DynamoDB semantics closely enough to test against.
//!
//! Partitions are kept in key order and each partition keeps its items in sort key order.
//! Queries and scans apply the page size to evaluated items before the filter, and only hand
//! out a token when evaluation stopped early. Updates upsert, and they reject key attribute
//! updates and overlapping document paths.
use super::{
    DeleteRequest, GetRequest, Page, PageOptions, PageToken, PutRequest, QueryRequest,
    ScanRequest, Store, UpdateRequest,
};
use crate::{
    errors::StoreError,
    expression::{
        compare_numbers, is_empty_set,
        path::{steps, Step},
        resolve, Directive,
    },
    item::Item,
    key::{Key, KeySchema},
};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use itertools::Itertools;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

type Partitions = BTreeMap<String, BTreeMap<String, Item>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    schema: KeySchema,
    partitions: RwLock<Partitions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_schema(schema: KeySchema) -> Self {
        Self {
            schema,
            partitions: Default::default(),
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.partitions.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn start_key(&self, options: &PageOptions) -> Result<Option<Key>, StoreError> {
        options
            .start
            .as_ref()
            .map(|token| {
                token.key(&self.schema).ok_or_else(|| {
                    validation("the exclusive start key does not match the key schema")
                })
            })
            .transpose()
    }

    /// Cut a page out of the evaluated candidates, then filter and project it
    fn page(&self, candidates: Vec<&Item>, options: &PageOptions) -> Result<Page, StoreError> {
        if options.page_size == 0 {
            return Err(validation("the page size must be at least 1"));
        }

        let has_more = candidates.len() > options.page_size;
        let evaluated = &candidates[..candidates.len().min(options.page_size)];

        let next = if has_more {
            evaluated
                .last()
                .and_then(|item| item.key(&self.schema))
                .map(|key| PageToken::from(key.to_attributes(&self.schema)))
        } else {
            None
        };

        let items = evaluated
            .iter()
            .filter(|item| {
                options
                    .filter
                    .as_ref()
                    .map_or(true, |filter| filter.evaluate(item))
            })
            .map(|item| Item::clone(item).project(&options.attributes))
            .collect();

        Ok(Page { items, next })
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn put_item(&self, request: PutRequest) -> Result<(), StoreError> {
        let key = request
            .item
            .key(&self.schema)
            .ok_or_else(|| validation("the item is missing a string key attribute"))?;

        let mut partitions = self.partitions.write();
        let partition = partitions.entry(key.pk.clone()).or_default();

        if let Some(guard) = request.guard(&self.schema) {
            let empty = Item::default();
            let existing = partition.get(&key.sk).unwrap_or(&empty);

            if !guard.evaluate(existing) {
                warn!("PutItem rejected: {key:?} already exists");
                return Err(StoreError::ConditionalCheckFailed);
            }
        }

        debug!("PutItem {key:?}");
        partition.insert(key.sk, request.item);
        Ok(())
    }

    async fn get_item(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        let partitions = self.partitions.read();

        Ok(partitions
            .get(&request.key.pk)
            .and_then(|partition| partition.get(&request.key.sk))
            .map(|item| item.clone().project(&request.attributes)))
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError> {
        let directives = request
            .update
            .directives()
            .map_err(|e| validation(e.to_string()))?;

        for directive in &directives {
            let top_level = match steps(directive.path()).as_deref() {
                Some([Step::Attribute(name), ..]) => *name,
                _ => return Err(invalid_path(directive.path())),
            };
            if self.schema.is_key_attribute(top_level) {
                return Err(validation(format!(
                    "cannot update attribute {top_level}; this attribute is part of the key"
                )));
            }
        }

        if let Some((a, b)) = directives
            .iter()
            .map(Directive::path)
            .tuple_combinations()
            .find(|(a, b)| overlaps(a, b))
        {
            return Err(validation(format!(
                "two document paths overlap with each other: [{a}], [{b}]"
            )));
        }

        let mut partitions = self.partitions.write();
        let partition = partitions.entry(request.key.pk.clone()).or_default();

        let mut item = partition
            .get(&request.key.sk)
            .cloned()
            .unwrap_or_else(|| Item::new(request.key.clone(), &self.schema));

        for directive in &directives {
            apply(item.attributes_mut(), directive)?;
        }

        debug!("UpdateItem {:?} ({} directives)", request.key, directives.len());
        partition.insert(request.key.sk, item);
        Ok(())
    }

    async fn delete_item(&self, request: DeleteRequest) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write();

        if let Some(partition) = partitions.get_mut(&request.key.pk) {
            partition.remove(&request.key.sk);
            if partition.is_empty() {
                partitions.remove(&request.key.pk);
            }
        }

        debug!("DeleteItem {:?}", request.key);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError> {
        let start = self.start_key(&request.options)?;
        let partitions = self.partitions.read();

        let mut candidates: Vec<&Item> = partitions
            .get(&request.partition_key)
            .into_iter()
            .flatten()
            .filter(|(sk, _)| {
                request
                    .sort_key
                    .as_ref()
                    .map_or(true, |condition| condition.matches(sk))
            })
            .map(|(_, item)| item)
            .collect();

        if request.descending {
            candidates.reverse();
        }

        if let Some(start) = start {
            candidates.retain(|item| {
                item.key(&self.schema).is_some_and(|key| {
                    if request.descending {
                        key.sk < start.sk
                    } else {
                        key.sk > start.sk
                    }
                })
            });
        }

        self.page(candidates, &request.options)
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError> {
        let start = self.start_key(&request.options)?;
        let partitions = self.partitions.read();

        let candidates: Vec<&Item> = partitions
            .iter()
            .flat_map(|(pk, partition)| partition.iter().map(move |(sk, item)| (pk, sk, item)))
            .filter(|(pk, sk, _)| {
                start.as_ref().map_or(true, |start| {
                    (pk.as_str(), sk.as_str()) > (start.pk.as_str(), start.sk.as_str())
                })
            })
            .map(|(_, _, item)| item)
            .collect();

        self.page(candidates, &request.options)
    }
}

fn validation(message: impl Into<String>) -> StoreError {
    StoreError::Validation(message.into())
}

fn invalid_path(path: &str) -> StoreError {
    validation(format!(
        "the document path provided in the update expression is invalid for update: {path}"
    ))
}

fn overlaps(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.starts_with(['.', '[']))
    };

    a == b || nested(a, b) || nested(b, a)
}

fn apply(
    attributes: &mut HashMap<String, AttributeValue>,
    directive: &Directive,
) -> Result<(), StoreError> {
    match directive {
        Directive::Set {
            path,
            value,
            overwrite,
        } => {
            if *overwrite || resolve(attributes, path).is_none() {
                set_path(attributes, path, value.clone())?;
            }
        }
        Directive::ListAppend { path, value } => {
            let merged = match (resolve(attributes, path), value) {
                (None, _) => {
                    return Err(validation(format!(
                        "the provided expression refers to an attribute that does not exist in the item: {path}"
                    )))
                }
                (Some(AttributeValue::L(existing)), AttributeValue::L(appended)) => {
                    existing.iter().chain(appended).cloned().collect()
                }
                _ => {
                    return Err(validation(format!(
                        "list_append needs list operands at {path}"
                    )))
                }
            };
            set_path(attributes, path, AttributeValue::L(merged))?;
        }
        Directive::AddNumber { path, value } => {
            let increment = value
                .as_n()
                .map_err(|_| validation(format!("ADD needs a number at {path}")))?;

            let sum = match resolve(attributes, path) {
                None => increment.clone(),
                Some(AttributeValue::N(existing)) => add_numbers(existing, increment)?,
                Some(_) => {
                    return Err(validation(format!(
                        "an operand in the update expression has an incorrect data type at {path}"
                    )))
                }
            };
            set_path(attributes, path, AttributeValue::N(sum))?;
        }
        Directive::Remove { path } => remove_path(attributes, path),
        Directive::DeleteFromSet { path, value } => {
            let remaining = match (resolve(attributes, path), value) {
                (None, _) => return Ok(()),
                (Some(AttributeValue::Ss(set)), AttributeValue::Ss(removed)) => {
                    AttributeValue::Ss(without(set, removed))
                }
                (Some(AttributeValue::Ns(set)), AttributeValue::Ns(removed)) => {
                    AttributeValue::Ns(
                        set.iter()
                            .filter(|member| {
                                !removed.iter().any(|r| {
                                    compare_numbers(member, r) == Some(std::cmp::Ordering::Equal)
                                })
                            })
                            .cloned()
                            .collect(),
                    )
                }
                (Some(AttributeValue::Bs(set)), AttributeValue::Bs(removed)) => {
                    AttributeValue::Bs(without(set, removed))
                }
                _ => {
                    return Err(validation(format!(
                        "DELETE needs a set of the same type at {path}"
                    )))
                }
            };

            if is_empty_set(&remaining) {
                remove_path(attributes, path);
            } else {
                set_path(attributes, path, remaining)?;
            }
        }
    }

    Ok(())
}

fn without<T: Clone + PartialEq>(set: &[T], removed: &[T]) -> Vec<T> {
    set.iter()
        .filter(|member| !removed.contains(member))
        .cloned()
        .collect()
}

fn add_numbers(a: &str, b: &str) -> Result<String, StoreError> {
    if let (Ok(a), Ok(b)) = (a.parse::<i64>(), b.parse::<i64>()) {
        return a
            .checked_add(b)
            .map(|sum| sum.to_string())
            .ok_or_else(|| validation("number overflow"));
    }

    let (a, b) = a
        .parse::<f64>()
        .ok()
        .zip(b.parse::<f64>().ok())
        .ok_or_else(|| validation(format!("cannot add {a} and {b}")))?;
    Ok((a + b).to_string())
}

/// The map or list holding the last step of `path`, with that step
fn parent<'a, 'p>(
    attributes: &'a mut HashMap<String, AttributeValue>,
    path: &'p str,
) -> Option<(Container<'a>, Step<'p>)> {
    let steps = steps(path)?;
    let (leaf, parents) = steps.split_last()?;

    let Some((first, rest)) = parents.split_first() else {
        return Some((Container::Map(attributes), *leaf));
    };
    let Step::Attribute(first) = first else {
        return None;
    };

    let mut current = attributes.get_mut(*first)?;
    for step in rest {
        current = match (current, step) {
            (AttributeValue::M(map), Step::Attribute(name)) => map.get_mut(*name)?,
            (AttributeValue::L(list), Step::Index(index)) => list.get_mut(*index)?,
            _ => return None,
        };
    }

    let container = match current {
        AttributeValue::M(map) => Container::Map(map),
        AttributeValue::L(list) => Container::List(list),
        _ => return None,
    };

    Some((container, *leaf))
}

enum Container<'a> {
    Map(&'a mut HashMap<String, AttributeValue>),
    List(&'a mut Vec<AttributeValue>),
}

/// Write `value` at `path`. Indexes past the end of a list append.
fn set_path(
    attributes: &mut HashMap<String, AttributeValue>,
    path: &str,
    value: AttributeValue,
) -> Result<(), StoreError> {
    match parent(attributes, path).ok_or_else(|| invalid_path(path))? {
        (Container::Map(map), Step::Attribute(name)) => {
            map.insert(name.to_string(), value);
        }
        (Container::List(list), Step::Index(index)) => match list.get_mut(index) {
            Some(slot) => *slot = value,
            None => list.push(value),
        },
        _ => return Err(invalid_path(path)),
    }

    Ok(())
}

fn remove_path(attributes: &mut HashMap<String, AttributeValue>, path: &str) {
    match parent(attributes, path) {
        Some((Container::Map(map), Step::Attribute(name))) => {
            map.remove(name);
        }
        Some((Container::List(list), Step::Index(index))) if index < list.len() => {
            list.remove(index);
        }
        _ => {}
    }
}

//! The storage boundary.
//!
//! A [`Store`] executes fully rendered requests. [`DynamoStore`] sends them to DynamoDB
//! through the AWS SDK and [`memory::MemoryStore`] evaluates them in process.
mod dynamo;
pub mod memory;
mod request;

pub use self::{
    dynamo::DynamoStore,
    request::{
        DeleteRequest, Expressions, GetRequest, PageOptions, PutRequest, QueryRequest,
        ScanRequest, UpdateRequest,
    },
};

use crate::{
    errors::{QueryError, StoreError},
    item::Item,
    key::{Key, KeySchema},
};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::collections::HashMap;

#[async_trait]
pub trait Store: Send + Sync {
    fn key_schema(&self) -> &KeySchema;

    /// Fails with [`StoreError::ConditionalCheckFailed`] when the request is guarded and an item
    /// with the same key exists
    async fn put_item(&self, request: PutRequest) -> Result<(), StoreError>;

    async fn get_item(&self, request: GetRequest) -> Result<Option<Item>, StoreError>;

    /// Applies the update, creating the item when it does not exist yet
    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError>;

    async fn delete_item(&self, request: DeleteRequest) -> Result<(), StoreError>;

    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError>;

    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError>;
}

/// One page of query or scan results.
///
/// `next` is only set when the store stopped because the page was full; pass it to
/// `start_from` to continue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
    pub next: Option<PageToken>,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Page {
    type Item = Item;
    type IntoIter = std::vec::IntoIter<Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// The key of the last item a store evaluated, used to resume a query or scan.
///
/// Tokens can be handed to clients as opaque strings with [`PageToken::encode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageToken(HashMap<String, AttributeValue>);

impl PageToken {
    pub fn key(&self, schema: &KeySchema) -> Option<Key> {
        Key::from_attributes(&self.0, schema)
    }

    pub fn attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.0
    }

    pub fn into_inner(self) -> HashMap<String, AttributeValue> {
        self.0
    }

    /// URL safe base64 of the token's JSON form
    pub fn encode(&self) -> Result<String, QueryError> {
        let json: serde_json::Value =
            serde_dynamo::from_item(self.0.clone()).map_err(StoreError::from)?;
        let bytes = serde_json::to_vec(&json)
            .map_err(|e| QueryError::InvalidPageToken(e.to_string()))?;

        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn decode(token: &str) -> Result<Self, QueryError> {
        let invalid = |message: String| QueryError::InvalidPageToken(message);

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| invalid(e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

        if !json.is_object() {
            return Err(invalid("expected a JSON object".to_string()));
        }

        let attributes: HashMap<String, AttributeValue> =
            serde_dynamo::to_item(json).map_err(|e| invalid(e.to_string()))?;

        Ok(Self(attributes))
    }
}

impl From<HashMap<String, AttributeValue>> for PageToken {
    fn from(attributes: HashMap<String, AttributeValue>) -> Self {
        Self(attributes)
    }
}

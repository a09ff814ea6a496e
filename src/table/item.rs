use super::Table;
use crate::{
    errors::{ExpressionError, ItemError},
    expression::{Directive, UpdateExpression},
    item::Item,
    key::Key,
    store::{DeleteRequest, GetRequest, PutRequest, Store, UpdateRequest},
};
use log::debug;

/// One fully configured single item request.
///
/// Requests are plain values: build one with [`ItemRequest::create`], [`ItemRequest::read`],
/// [`ItemRequest::update`] or [`ItemRequest::delete`] and hand it to [`ItemRequest::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRequest {
    Create(PutRequest),
    Read(GetRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
}

impl ItemRequest {
    pub fn create(item: impl Into<Item>, overwrite: bool) -> Self {
        Self::Create(PutRequest {
            item: item.into(),
            overwrite,
        })
    }

    pub fn read<A: Into<String>>(
        key: impl Into<Key>,
        attributes: impl IntoIterator<Item = A>,
        consistent_read: bool,
    ) -> Self {
        Self::Read(GetRequest {
            key: key.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            consistent_read,
        })
    }

    pub fn update(
        key: impl Into<Key>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Result<Self, ExpressionError> {
        let directives: Vec<Directive> = directives.into_iter().collect();

        Ok(Self::Update(UpdateRequest {
            key: key.into(),
            update: UpdateExpression::build(&directives)?,
        }))
    }

    pub fn delete(key: impl Into<Key>) -> Self {
        Self::Delete(DeleteRequest { key: key.into() })
    }

    /// Send the request with one store call. Only reads return an item.
    pub async fn execute<S: Store + ?Sized>(self, store: &S) -> Result<Option<Item>, ItemError> {
        match self {
            Self::Create(request) => {
                store.put_item(request).await?;
                Ok(None)
            }
            Self::Read(request) => Ok(store.get_item(request).await?),
            Self::Update(request) => {
                store.update_item(request).await?;
                Ok(None)
            }
            Self::Delete(request) => {
                store.delete_item(request).await?;
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    Unconfigured,
    Configured(ItemRequest),
    Executed,
}

/// Configures exactly one item request against a [`Table`] and then executes it.
///
/// ```no_run
/// # use single_table_dynamodb::{MemoryStore, Table, Item, KeySchema};
/// # async fn run() -> Result<(), single_table_dynamodb::errors::ItemError> {
/// let table = Table::new(MemoryStore::new());
///
/// let mut read = table.item().read_attributes(("user#1", "vid#1"), ["title"]);
/// let item: Option<Item> = read.execute().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ItemWrapper<'t, S> {
    table: &'t Table<S>,
    state: RequestState,
}

impl<'t, S: Store> ItemWrapper<'t, S> {
    pub(crate) fn new(table: &'t Table<S>) -> Self {
        Self {
            table,
            state: RequestState::Unconfigured,
        }
    }

    fn configure(mut self, request: ItemRequest) -> Self {
        self.state = RequestState::Configured(request);
        self
    }

    /// Write `item`. Unless `overwrite` is set, execution fails with
    /// [`ItemError::ConditionalCheckFailed`] when an item with the same key exists.
    pub fn create(self, item: impl Into<Item>, overwrite: bool) -> Self {
        self.configure(ItemRequest::create(item, overwrite))
    }

    pub fn read(self, key: impl Into<Key>) -> Self {
        let consistent_read = self.table.consistent_read();
        self.configure(ItemRequest::read(
            key,
            Vec::<String>::new(),
            consistent_read,
        ))
    }

    /// Read only the named attributes
    pub fn read_attributes<A: Into<String>>(
        self,
        key: impl Into<Key>,
        attributes: impl IntoIterator<Item = A>,
    ) -> Self {
        let consistent_read = self.table.consistent_read();
        self.configure(ItemRequest::read(key, attributes, consistent_read))
    }

    pub fn update(
        self,
        key: impl Into<Key>,
        directives: impl IntoIterator<Item = Directive>,
    ) -> Result<Self, ItemError> {
        Ok(self.configure(ItemRequest::update(key, directives)?))
    }

    pub fn delete(self, key: impl Into<Key>) -> Self {
        self.configure(ItemRequest::delete(key))
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn request(&self) -> Option<&ItemRequest> {
        match &self.state {
            RequestState::Configured(request) => Some(request),
            _ => None,
        }
    }

    /// Execute the configured request and move to [`RequestState::Executed`].
    /// A wrapper executes at most once; configure it again to send another request.
    pub async fn execute(&mut self) -> Result<Option<Item>, ItemError> {
        match std::mem::replace(&mut self.state, RequestState::Executed) {
            RequestState::Configured(request) => {
                debug!("Executing {request:?}");
                request.execute(self.table.store()).await
            }
            state => {
                self.state = state;
                Err(ItemError::RequestNotConfigured)
            }
        }
    }
}

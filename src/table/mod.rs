mod item;
mod query;

pub use self::{
    item::{ItemRequest, ItemWrapper, RequestState},
    query::{QueryBuilder, ScanBuilder},
};

use crate::{
    config::{self, TableConfig, DEFAULT_PAGE_SIZE},
    errors::KeyError,
    key::{KeySchema, KeyScheme},
    store::{DynamoStore, Store},
};
use log::info;

/// A handle on one single-table design.
///
/// The table owns its [`Store`] and hands out short-lived wrappers that borrow it:
/// [`Table::item`] for single item requests and [`Table::query`]/[`Table::scan`] for paged
/// reads.
#[derive(Debug)]
pub struct Table<S = DynamoStore> {
    store: S,
    key_scheme: KeyScheme,
    consistent_read: bool,
    page_size: usize,
}

impl Table<DynamoStore> {
    /// Load an AWS client for `config` and wrap it in a [`DynamoStore`]
    pub async fn connect(config: &TableConfig) -> Self {
        info!("Connecting to table {}...", config.table_name);

        let client = config::load_client(config).await;
        let store = DynamoStore::new(client, &config.table_name)
            .with_key_schema(config.key_schema.clone());

        info!("Ready!");
        Self::configured(store, config)
    }
}

impl<S: Store> Table<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            key_scheme: KeyScheme::default(),
            consistent_read: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Apply the read defaults of `config` to an already built store
    pub fn configured(store: S, config: &TableConfig) -> Self {
        Self::new(store)
            .with_consistent_read(config.consistent_read)
            .with_page_size(config.page_size)
    }

    pub fn with_key_scheme(mut self, key_scheme: KeyScheme) -> Self {
        self.key_scheme = key_scheme;
        self
    }

    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = consistent_read;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key_schema(&self) -> &KeySchema {
        self.store.key_schema()
    }

    pub fn key_scheme(&self) -> &KeyScheme {
        &self.key_scheme
    }

    pub fn consistent_read(&self) -> bool {
        self.consistent_read
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// A sort key for a new item of `entity_type`, stamped with the current time
    pub fn generate_sort_key(&self, entity_type: &str) -> Result<String, KeyError> {
        self.key_scheme.generate_sort_key(entity_type)
    }

    pub fn item(&self) -> ItemWrapper<'_, S> {
        ItemWrapper::new(self)
    }

    pub fn query(&self, partition_key: impl Into<String>) -> QueryBuilder<'_, S> {
        QueryBuilder::new(self, partition_key.into())
    }

    pub fn scan(&self) -> ScanBuilder<'_, S> {
        ScanBuilder::new(self)
    }
}

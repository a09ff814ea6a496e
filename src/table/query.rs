use super::Table;
use crate::{
    errors::{KeyError, QueryError},
    expression::{Condition, SortKeyCondition},
    store::{Page, PageOptions, PageToken, QueryRequest, ScanRequest, Store},
};
use log::debug;

/// Setters shared by both paged read builders
macro_rules! page_options {
    ($builder:ident) => {
        impl<'t, S: Store> $builder<'t, S> {
            /// Maximum number of items the store evaluates for this page
            pub fn page_size(mut self, page_size: usize) -> Self {
                self.request.options.page_size = page_size;
                self
            }

            /// Resume after the token returned with a previous page
            pub fn start_from(mut self, token: impl Into<Option<PageToken>>) -> Self {
                self.request.options.start = token.into();
                self
            }

            /// Drop evaluated items that do not match `condition`. Filtered items still count
            /// towards the page size.
            pub fn filter(mut self, condition: Condition) -> Self {
                self.request.options.filter = Some(condition);
                self
            }

            /// Add one attribute to the projection
            pub fn attribute(mut self, name: impl Into<String>) -> Self {
                self.request.options.attributes.push(name.into());
                self
            }

            pub fn attributes<A: Into<String>>(mut self, names: impl IntoIterator<Item = A>) -> Self {
                self.request
                    .options
                    .attributes
                    .extend(names.into_iter().map(Into::into));
                self
            }

            pub fn consistent_read(mut self, consistent_read: bool) -> Self {
                self.request.options.consistent_read = consistent_read;
                self
            }
        }
    };
}

fn page_options<S: Store>(table: &Table<S>) -> PageOptions {
    PageOptions {
        page_size: table.page_size(),
        consistent_read: table.consistent_read(),
        ..Default::default()
    }
}

/// Reads one partition, newest sort key first
pub struct QueryBuilder<'t, S> {
    table: &'t Table<S>,
    request: QueryRequest,
}

page_options!(QueryBuilder);

impl<'t, S: Store> QueryBuilder<'t, S> {
    pub(crate) fn new(table: &'t Table<S>, partition_key: String) -> Self {
        let mut request = QueryRequest::new(partition_key);
        request.options = page_options(table);

        Self { table, request }
    }

    pub fn sort_key(mut self, condition: SortKeyCondition) -> Self {
        self.request.sort_key = Some(condition);
        self
    }

    /// Only items whose sort key carries the prefix of `entity_type`
    pub fn entity_type(self, entity_type: &str) -> Result<Self, KeyError> {
        let prefix = self.table.key_scheme().prefix(entity_type)?.to_string();
        Ok(self.sort_key(SortKeyCondition::begins_with(prefix)))
    }

    /// Return items in ascending sort key order
    pub fn oldest_first(mut self) -> Self {
        self.request.descending = false;
        self
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub async fn execute(self) -> Result<Page, QueryError> {
        debug!(
            "Query partition={} page_size={}",
            self.request.partition_key, self.request.options.page_size
        );

        Ok(self.table.store().query(self.request).await?)
    }
}

/// Reads the whole table in store order
pub struct ScanBuilder<'t, S> {
    table: &'t Table<S>,
    request: ScanRequest,
}

page_options!(ScanBuilder);

impl<'t, S: Store> ScanBuilder<'t, S> {
    pub(crate) fn new(table: &'t Table<S>) -> Self {
        Self {
            table,
            request: ScanRequest {
                options: page_options(table),
            },
        }
    }

    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    pub async fn execute(self) -> Result<Page, QueryError> {
        debug!("Scan page_size={}", self.request.options.page_size);

        Ok(self.table.store().scan(self.request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{store::memory::MemoryStore, AttributeValue};

    fn table() -> Table<MemoryStore> {
        Table::new(MemoryStore::new())
    }

    #[test]
    fn query_defaults_come_from_the_table() {
        let table = table().with_page_size(5);
        let builder = table.query("u1");

        assert_eq!(builder.request().partition_key, "u1");
        assert!(builder.request().descending);
        assert_eq!(builder.request().options.page_size, 5);
        assert!(!builder.request().options.consistent_read);
    }

    #[test]
    fn projection_accumulates() {
        let table = table();
        let builder = table
            .query("u1")
            .attribute("title")
            .attributes(["views", "sk"])
            .oldest_first()
            .consistent_read(true);

        assert_eq!(
            builder.request().options.attributes,
            ["title", "views", "sk"]
        );
        assert!(!builder.request().descending);
        assert!(builder.request().options.consistent_read);
    }

    #[test]
    fn entity_type_narrows_the_sort_key() {
        let table = table();

        let builder = table.query("u1").entity_type("VIDEO").unwrap();
        assert_eq!(
            builder.request().sort_key,
            Some(SortKeyCondition::begins_with("vid#"))
        );

        assert!(matches!(
            table.query("u1").entity_type("SHORT"),
            Err(KeyError::UnknownEntityType(_))
        ));
    }

    #[test]
    fn scan_takes_filter_and_token() {
        let table = table();
        let token = PageToken::from(std::collections::HashMap::from([(
            "pk".to_string(),
            AttributeValue::S("u1".into()),
        )]));

        let builder = table
            .scan()
            .filter(Condition::exists("title"))
            .start_from(token.clone())
            .page_size(3);

        assert_eq!(builder.request().options.start, Some(token));
        assert_eq!(
            builder.request().options.filter,
            Some(Condition::exists("title"))
        );
        assert_eq!(builder.request().options.page_size, 3);

        let builder = table.scan().start_from(None::<PageToken>);
        assert_eq!(builder.request().options.start, None);
    }
}

//! Request builders and item wrappers for a single-table DynamoDB design.
//!
//! Every item lives in one table keyed by a partition key (`pk`) and a sort key (`sk`).
//! Sort keys are generated from an entity-type prefix and a timestamp, so items of the
//! same type sort by creation time inside their partition.
//!
//! ```no_run
//! # use single_table_dynamodb::{Directive, Table, TableConfig};
//! # use aws_sdk_dynamodb::types::AttributeValue;
//! # async fn run() -> Result<(), single_table_dynamodb::Error> {
//! let config = TableConfig::builder().with_env().build()?;
//! let table = Table::connect(&config).await;
//!
//! let sk = table.generate_sort_key("VIDEO")?;
//! table
//!     .item()
//!     .update(
//!         ("user#1", sk.as_str()),
//!         [Directive::set("title", AttributeValue::S("Hello".into()))],
//!     )?
//!     .execute()
//!     .await?;
//!
//! let page = table.query("user#1").page_size(10).execute().await?;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod errors;
pub mod expression;
mod item;
pub mod key;
pub mod store;
pub mod table;

pub use config::TableConfig;
pub use errors::Error;
pub use expression::{Condition, Directive, DirectiveKind, SortKeyCondition, UpdateExpression};
pub use item::Item;
pub use key::{Key, KeySchema, KeyScheme};
pub use store::{memory::MemoryStore, DynamoStore, Page, PageToken, Store};
pub use table::{ItemRequest, ItemWrapper, QueryBuilder, RequestState, ScanBuilder, Table};

// Re-exports
pub use aws_sdk_dynamodb::types::AttributeValue;

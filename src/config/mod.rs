//! Table configuration and AWS client loading.
//!
//! ```no_run
//! # async fn run() -> Result<(), single_table_dynamodb::errors::ConfigError> {
//! use single_table_dynamodb::{config, TableConfig};
//!
//! let config = TableConfig::builder()
//!     .table_name("videos")
//!     .endpoint_url("http://localhost:8000")
//!     .with_env()
//!     .build()?;
//!
//! let client = config::load_client(&config).await;
//! # Ok(())
//! # }
//! ```
use crate::{errors::ConfigError, key::KeySchema};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{config::Region, Client};
use log::info;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: usize = 30;

const TABLE_NAME_VAR: &str = "DYNAMODB_TABLE_NAME";
const REGION_VAR: &str = "DYNAMODB_REGION";
const ENDPOINT_URL_VAR: &str = "DYNAMODB_ENDPOINT_URL";
const CONSISTENT_READ_VAR: &str = "DYNAMODB_CONSISTENT_READ";
const PAGE_SIZE_VAR: &str = "DYNAMODB_PAGE_SIZE";
const PARTITION_KEY_VAR: &str = "DYNAMODB_PARTITION_KEY";
const SORT_KEY_VAR: &str = "DYNAMODB_SORT_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    /// Falls back to the standard AWS region resolution when unset
    pub region: Option<String>,
    /// Override for DynamoDB Local and similar endpoints
    pub endpoint_url: Option<String>,
    pub consistent_read: bool,
    pub page_size: usize,
    pub key_schema: KeySchema,
}

impl TableConfig {
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableConfigBuilder {
    table_name: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
    consistent_read: Option<bool>,
    page_size: Option<usize>,
    partition_key: Option<String>,
    sort_key: Option<String>,
    error: Option<ConfigError>,
}

impl TableConfigBuilder {
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn partition_key(mut self, name: impl Into<String>) -> Self {
        self.partition_key = Some(name.into());
        self
    }

    pub fn sort_key(mut self, name: impl Into<String>) -> Self {
        self.sort_key = Some(name.into());
        self
    }

    /// Read every `DYNAMODB_*` variable that is set. Values read here replace values set earlier.
    pub fn with_env(self) -> Self {
        self.with_vars(std::env::vars())
    }

    pub fn with_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let name = name.as_ref();
            let value = value.into();

            match name {
                TABLE_NAME_VAR => self.table_name = Some(value),
                REGION_VAR => self.region = Some(value),
                ENDPOINT_URL_VAR => self.endpoint_url = Some(value),
                PARTITION_KEY_VAR => self.partition_key = Some(value),
                SORT_KEY_VAR => self.sort_key = Some(value),
                CONSISTENT_READ_VAR => match parse_bool(&value) {
                    Some(consistent_read) => self.consistent_read = Some(consistent_read),
                    None => self.invalid(name, value),
                },
                PAGE_SIZE_VAR => match usize::from_str(&value) {
                    Ok(page_size) if page_size > 0 => self.page_size = Some(page_size),
                    _ => self.invalid(name, value),
                },
                _ => {}
            }
        }

        self
    }

    pub fn build(self) -> Result<TableConfig, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let table_name = self
            .table_name
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingTableName)?;

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "page_size".to_string(),
                value: page_size.to_string(),
            });
        }

        let defaults = KeySchema::default();

        Ok(TableConfig {
            table_name,
            region: self.region,
            endpoint_url: self.endpoint_url,
            consistent_read: self.consistent_read.unwrap_or(false),
            page_size,
            key_schema: KeySchema::new(
                self.partition_key.unwrap_or(defaults.partition_key),
                self.sort_key.unwrap_or(defaults.sort_key),
            ),
        })
    }

    fn invalid(&mut self, name: &str, value: String) {
        self.error.get_or_insert(ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        });
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Resolve credentials and region once and build a DynamoDB client
pub async fn load_client(config: &TableConfig) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint_url) = &config.endpoint_url {
        info!("Using DynamoDB endpoint {endpoint_url}");
        loader = loader.endpoint_url(endpoint_url);
    }

    let sdk_config = loader.load().await;
    info!(
        "Loaded AWS config for table {} (region {:?})",
        config.table_name,
        sdk_config.region()
    );

    Client::new(&sdk_config)
}

use thiserror::Error;

/// Error returned by [`crate::KeyScheme`] when generating sort keys
#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("UnknownEntityType: no sort key prefix is registered for '{0}'")]
    UnknownEntityType(String),
}

/// Error returned when building or parsing request expressions
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("InvalidDirective: {0}")]
    InvalidDirective(String),
    #[error("ParseError: {0}")]
    Parse(String),
    #[error("MissingPlaceholder: '{0}' has no bound value")]
    MissingPlaceholder(String),
}

/// Error returned by a [`crate::Store`] implementation.
///
/// Conditional write failures are kept apart from every other store failure so that callers
/// can tell a violated uniqueness guard from throttling, network or validation errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ConditionalCheckFailed: the conditional request failed")]
    ConditionalCheckFailed,
    #[error("AwsError: {0}")]
    Aws(Box<aws_sdk_dynamodb::Error>),
    #[error("ValidationError: {0}")]
    Validation(String),
    #[error("SerializationError: {0}")]
    Serialization(#[from] serde_dynamo::Error),
    #[error("{0}")]
    Other(String),
}

/// Error returned by [`crate::ItemWrapper::execute`] and the single item requests
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("RequestNotConfigured: call create, read, update or delete before execute")]
    RequestNotConfigured,
    #[error("ConditionalCheckFailed: an item with the same key already exists")]
    ConditionalCheckFailed,
    #[error("ExpressionError: {0}")]
    Expression(#[from] ExpressionError),
    #[error("StoreError: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ItemError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ConditionalCheckFailed => Self::ConditionalCheckFailed,
            other => Self::Store(other),
        }
    }
}

/// Error returned by [`crate::QueryBuilder::execute`] and [`crate::ScanBuilder::execute`]
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("StoreError: {0}")]
    Store(#[from] StoreError),
    #[error("InvalidPageToken: {0}")]
    InvalidPageToken(String),
}

/// Error returned when building a [`crate::TableConfig`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MissingTableName: set a table name or DYNAMODB_TABLE_NAME")]
    MissingTableName,
    #[error("InvalidValue: {name}={value}")]
    InvalidValue { name: String, value: String },
}

/// Error abstracting all errors returned by `single-table-dynamodb`.
///
/// If you use this error you can use `?` to convert from the other errors in this crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("KeyError: {0}")]
    Key(#[from] KeyError),
    #[error("ExpressionError: {0}")]
    Expression(#[from] ExpressionError),
    #[error("ItemError: {0}")]
    Item(#[from] ItemError),
    #[error("QueryError: {0}")]
    Query(#[from] QueryError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
}

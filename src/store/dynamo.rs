use super::{
    DeleteRequest, GetRequest, Page, PageToken, PutRequest, QueryRequest, ScanRequest, Store,
    UpdateRequest,
};
use crate::{errors::StoreError, item::Item, key::KeySchema};
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::SdkError,
    operation::{
        delete_item::DeleteItemError, put_item::PutItemError, update_item::UpdateItemError,
    },
    types::AttributeValue,
    Client,
};
use log::{debug, warn};
use std::{collections::HashMap, fmt::Debug};

/// A [`Store`] backed by a DynamoDB table
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
    schema: KeySchema,
}

impl DynamoStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            schema: KeySchema::default(),
        }
    }

    pub fn with_key_schema(mut self, schema: KeySchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl Store for DynamoStore {
    fn key_schema(&self) -> &KeySchema {
        &self.schema
    }

    async fn put_item(&self, request: PutRequest) -> Result<(), StoreError> {
        let expressions = request.expressions(&self.schema);
        debug!(
            "PutItem table={} guarded={}",
            self.table_name,
            expressions.condition.is_some()
        );

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(request.item.into_inner()))
            .set_condition_expression(expressions.condition)
            .set_expression_attribute_names(expressions.names)
            .set_expression_attribute_values(expressions.values)
            .send()
            .await
            .map_err(put_error)?;

        Ok(())
    }

    async fn get_item(&self, request: GetRequest) -> Result<Option<Item>, StoreError> {
        let expressions = request.expressions(&self.schema);
        debug!("GetItem table={} key={:?}", self.table_name, request.key);

        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(request.key.to_attributes(&self.schema)))
            .consistent_read(request.consistent_read)
            .set_projection_expression(expressions.projection)
            .set_expression_attribute_names(expressions.names)
            .send()
            .await
            .map_err(aws_error)?;

        Ok(output.item.map(Item::from))
    }

    async fn update_item(&self, request: UpdateRequest) -> Result<(), StoreError> {
        let expressions = request.expressions(&self.schema);
        debug!(
            "UpdateItem table={} key={:?} expression={:?}",
            self.table_name, request.key, expressions.update
        );

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(request.key.to_attributes(&self.schema)))
            .set_update_expression(expressions.update)
            .set_expression_attribute_names(expressions.names)
            .set_expression_attribute_values(expressions.values)
            .send()
            .await
            .map_err(update_error)?;

        Ok(())
    }

    async fn delete_item(&self, request: DeleteRequest) -> Result<(), StoreError> {
        debug!("DeleteItem table={} key={:?}", self.table_name, request.key);

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(request.key.to_attributes(&self.schema)))
            .send()
            .await
            .map_err(delete_error)?;

        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<Page, StoreError> {
        let expressions = request.expressions(&self.schema);
        debug!(
            "Query table={} key_condition={:?} filter={:?}",
            self.table_name, expressions.key_condition, expressions.filter
        );

        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_key_condition_expression(expressions.key_condition)
            .set_filter_expression(expressions.filter)
            .set_projection_expression(expressions.projection)
            .set_select(expressions.select)
            .set_expression_attribute_names(expressions.names)
            .set_expression_attribute_values(expressions.values)
            .limit(request.options.limit())
            .consistent_read(request.options.consistent_read)
            .scan_index_forward(!request.descending)
            .set_exclusive_start_key(request.options.start.map(PageToken::into_inner))
            .send()
            .await
            .map_err(aws_error)?;

        Ok(page(output.items, output.last_evaluated_key))
    }

    async fn scan(&self, request: ScanRequest) -> Result<Page, StoreError> {
        let expressions = request.expressions(&self.schema);
        debug!(
            "Scan table={} filter={:?}",
            self.table_name, expressions.filter
        );

        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_filter_expression(expressions.filter)
            .set_projection_expression(expressions.projection)
            .set_select(expressions.select)
            .set_expression_attribute_names(expressions.names)
            .set_expression_attribute_values(expressions.values)
            .limit(request.options.limit())
            .consistent_read(request.options.consistent_read)
            .set_exclusive_start_key(request.options.start.map(PageToken::into_inner))
            .send()
            .await
            .map_err(aws_error)?;

        Ok(page(output.items, output.last_evaluated_key))
    }
}

fn page(
    items: Option<Vec<HashMap<String, AttributeValue>>>,
    last_evaluated_key: Option<HashMap<String, AttributeValue>>,
) -> Page {
    Page {
        items: items
            .unwrap_or_default()
            .into_iter()
            .map(Item::from)
            .collect(),
        next: last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(PageToken::from),
    }
}

fn aws_error<E, R>(error: SdkError<E, R>) -> StoreError
where
    aws_sdk_dynamodb::Error: From<SdkError<E, R>>,
{
    StoreError::Aws(Box::new(error.into()))
}

macro_rules! conditional_error {
    ($name:ident, $error:ty, $operation:literal) => {
        fn $name<R>(error: SdkError<$error, R>) -> StoreError
        where
            R: Debug + Send + Sync + 'static,
        {
            if error
                .as_service_error()
                .is_some_and(<$error>::is_conditional_check_failed_exception)
            {
                warn!("{} rejected: the conditional check failed", $operation);
                return StoreError::ConditionalCheckFailed;
            }

            aws_error(error)
        }
    };
}

conditional_error!(put_error, PutItemError, "PutItem");
conditional_error!(update_error, UpdateItemError, "UpdateItem");
conditional_error!(delete_error, DeleteItemError, "DeleteItem");

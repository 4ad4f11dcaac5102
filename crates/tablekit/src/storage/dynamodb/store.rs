//! DynamoDB store implementation.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{DeleteRequest, KeysAndAttributes, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;

use tablekit_core::item::Item;
use tablekit_core::storage::{
    BatchGetOutput, BatchWriteOutput, KeyValueStore, QueryPage, QueryRequest, Result,
};

use super::conversions::{attributes_to_item, item_to_attributes, key_condition, projection_expression};
use super::error::{
    map_batch_get_error, map_batch_write_error, map_build_error, map_delete_item_error,
    map_get_item_error, map_put_item_error, map_query_error,
};
use crate::config::Config;

/// DynamoDB-backed store.
///
/// Holds only the client; table names travel with each request.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: Client,
}

impl DynamoDbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a store using the AWS SDK default credential chain, with the
    /// region and optional endpoint from `config`.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn get_item(
        &self,
        table: &str,
        key: &Item,
        projection: Option<&[String]>,
    ) -> Result<Option<Item>> {
        let mut request = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(item_to_attributes(key)));

        if let Some(fields) = projection {
            let (expression, names) = projection_expression(fields);
            request = request
                .projection_expression(expression)
                .set_expression_attribute_names(Some(names));
        }

        let result = request
            .send()
            .await
            .map_err(|e| map_get_item_error(e, table))?;

        result.item.as_ref().map(attributes_to_item).transpose()
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item_to_attributes(&item)))
            .send()
            .await
            .map_err(|e| map_put_item_error(e, table))?;

        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &Item) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(item_to_attributes(key)))
            .send()
            .await
            .map_err(|e| map_delete_item_error(e, table))?;

        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryPage> {
        let condition = key_condition(request);

        let result = self
            .client
            .query()
            .table_name(&request.table)
            .set_index_name(request.index_name.clone())
            .key_condition_expression(condition.expression)
            .set_expression_attribute_names(Some(condition.names))
            .set_expression_attribute_values(Some(condition.values))
            .scan_index_forward(request.scan_forward)
            .set_limit(request.limit.map(|limit| i32::try_from(limit).unwrap_or(i32::MAX)))
            .set_exclusive_start_key(request.exclusive_start_key.as_ref().map(item_to_attributes))
            .send()
            .await
            .map_err(|e| map_query_error(e, &request.table))?;

        let items = result
            .items
            .unwrap_or_default()
            .iter()
            .map(attributes_to_item)
            .collect::<Result<Vec<_>>>()?;
        let last_evaluated_key = result
            .last_evaluated_key
            .as_ref()
            .map(attributes_to_item)
            .transpose()?;

        Ok(QueryPage {
            items,
            last_evaluated_key,
        })
    }

    async fn batch_get(
        &self,
        table: &str,
        keys: Vec<Item>,
        projection: Option<&[String]>,
    ) -> Result<BatchGetOutput> {
        let mut keys_and_attributes = KeysAndAttributes::builder()
            .set_keys(Some(keys.iter().map(item_to_attributes).collect()));

        if let Some(fields) = projection {
            let (expression, names) = projection_expression(fields);
            keys_and_attributes = keys_and_attributes
                .projection_expression(expression)
                .set_expression_attribute_names(Some(names));
        }

        let result = self
            .client
            .batch_get_item()
            .request_items(table, keys_and_attributes.build().map_err(map_build_error)?)
            .send()
            .await
            .map_err(|e| map_batch_get_error(e, table))?;

        let found = result
            .responses
            .unwrap_or_default()
            .remove(table)
            .unwrap_or_default()
            .iter()
            .map(attributes_to_item)
            .collect::<Result<Vec<_>>>()?;

        let unprocessed_keys = match result.unprocessed_keys.unwrap_or_default().remove(table) {
            Some(pending) => pending
                .keys()
                .iter()
                .map(attributes_to_item)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(BatchGetOutput {
            found,
            unprocessed_keys,
        })
    }

    async fn batch_write(
        &self,
        table: &str,
        puts: Vec<Item>,
        deletes: Vec<Item>,
    ) -> Result<BatchWriteOutput> {
        let mut requests = Vec::with_capacity(puts.len() + deletes.len());
        for item in &puts {
            let put = PutRequest::builder()
                .set_item(Some(item_to_attributes(item)))
                .build()
                .map_err(map_build_error)?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }
        for key in &deletes {
            let delete = DeleteRequest::builder()
                .set_key(Some(item_to_attributes(key)))
                .build()
                .map_err(map_build_error)?;
            requests.push(WriteRequest::builder().delete_request(delete).build());
        }

        let result = self
            .client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(|e| map_batch_write_error(e, table))?;

        let mut output = BatchWriteOutput::default();
        for request in result
            .unprocessed_items
            .unwrap_or_default()
            .remove(table)
            .unwrap_or_default()
        {
            if let Some(put) = request.put_request() {
                output.unprocessed_puts.push(attributes_to_item(put.item())?);
            }
            if let Some(delete) = request.delete_request() {
                output.unprocessed_deletes.push(attributes_to_item(delete.key())?);
            }
        }

        if !output.is_complete() {
            tracing::debug!(
                table,
                puts = output.unprocessed_puts.len(),
                deletes = output.unprocessed_deletes.len(),
                "DynamoDB left batch writes unprocessed"
            );
        }
        Ok(output)
    }
}

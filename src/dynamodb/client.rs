use aws_sdk_dynamodb::{
    operation::{create_table::CreateTableOutput, scan::ScanOutput},
    types::{
        AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
        ScalarAttributeType,
    },
    Client,
};
use tracing::{error, info, instrument};

use crate::dynamodb::{Item, Table};
use crate::error::StoreError;

/// DynamoDB client wrapper covering the operations the item store needs.
///
/// DynamoDB tables are schema-less: apart from the primary key, each item may
/// carry its own set of attributes. That is exactly the shape of the items
/// collection, so documents are written and read whole, converted to and from
/// attribute maps with `serde_dynamo`.
///
/// # Operations
/// - **Put**: write a whole item, replacing any item with the same key
/// - **Get**: read an item by its primary key
/// - **Delete**: remove an item by its primary key
/// - **Scan**: read every item in a table, following pagination
///
/// The client is cheap to clone and is meant to be built once per process.
#[derive(Debug, Clone)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Verifies authentication by attempting to list tables.
    pub async fn check_auth(&self) -> Result<(), StoreError> {
        self.client.list_tables().send().await.map_err(|e| {
            let e = StoreError::from(e);
            error!("Authentication failed: {e}");
            e
        })?;
        info!("Authentication successful");
        Ok(())
    }

    // --- Table Operations ---

    /// Creates the items table if it doesn't exist, keyed by a string
    /// partition key and billed on demand.
    pub async fn create_table_if_not_exists(
        &self,
        table: &Table,
    ) -> Result<Option<CreateTableOutput>, StoreError> {
        if self.table_exists(table.name()).await? {
            info!("Table '{}' exists", table.name());
            return Ok(None);
        }

        let attribute_definition = AttributeDefinition::builder()
            .attribute_name(table.partition_key())
            .attribute_type(ScalarAttributeType::S)
            .build()?;

        let key_schema = KeySchemaElement::builder()
            .attribute_name(table.partition_key())
            .key_type(KeyType::Hash)
            .build()?;

        let output = self
            .client
            .create_table()
            .table_name(table.name())
            .billing_mode(BillingMode::PayPerRequest)
            .attribute_definitions(attribute_definition)
            .key_schema(key_schema)
            .send()
            .await?;
        info!("Table '{}' created", table.name());
        Ok(Some(output))
    }

    /// Checks if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool, StoreError> {
        let tables = self.client.list_tables().send().await?;
        Ok(tables.table_names().iter().any(|name| name == table_name))
    }

    // --- Item Operations ---

    /// Puts an item into a table, overwriting the whole stored document.
    #[instrument(skip(self, item), fields(table = table.name()))]
    pub async fn put_item(&self, table: &Table, item: &Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(table.name())
            .set_item(Some(item.to_attributes()?))
            .send()
            .await?;

        info!("Item written");
        Ok(())
    }

    /// Gets an item by key.
    #[instrument(skip(self), fields(table = table.name()))]
    pub async fn get_item(&self, table: &Table, key: &str) -> Result<Option<Item>, StoreError> {
        let response = self
            .client
            .get_item()
            .table_name(table.name())
            .key(table.partition_key(), AttributeValue::S(key.to_string()))
            .send()
            .await?;

        response
            .item
            .map(Item::from_attributes)
            .transpose()
            .map_err(Into::into)
    }

    /// Deletes an item by key. Deleting an absent key is not an error.
    #[instrument(skip(self), fields(table = table.name()))]
    pub async fn delete_item(&self, table: &Table, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(table.name())
            .key(table.partition_key(), AttributeValue::S(key.to_string()))
            .send()
            .await?;

        info!("Item deleted");
        Ok(())
    }

    // --- Scan Operations ---

    /// Scans a table for every item, following `LastEvaluatedKey` until the
    /// table is exhausted.
    #[instrument(skip(self), fields(table = table.name()))]
    pub async fn scan_table(&self, table: &Table) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut last_evaluated_key = None;

        loop {
            let mut scan = self.client.scan().table_name(table.name());

            if let Some(key) = last_evaluated_key {
                scan = scan.set_exclusive_start_key(Some(key));
            }

            let response: ScanOutput = scan.send().await?;

            if let Some(new_items) = response.items {
                for attrs in new_items {
                    items.push(Item::from_attributes(attrs)?);
                }
            }

            last_evaluated_key = response.last_evaluated_key;

            if last_evaluated_key.is_none() {
                break;
            }
        }

        info!(count = items.len(), "Scan complete");
        Ok(items)
    }
}

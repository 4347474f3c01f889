use crate::dynamodb::item::ID_FIELD;

/// DynamoDB table configuration for the items collection.
///
/// Items are addressed by a single string partition key. There is no sort
/// key: the collection is flat and every lookup goes through the key alone.
///
/// # Example
///
/// ```ignore
/// use crate::dynamodb::Table;
///
/// let table = Table::new("dynamic-items");
/// assert_eq!(table.partition_key(), "id");
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    partition_key: String,
}

impl Table {
    /// Creates a table description keyed by the item `id` field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_key: ID_FIELD.to_string(),
        }
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition key of the table.
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }
}

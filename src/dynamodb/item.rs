use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Name of the only reserved field. It doubles as the table's partition key.
pub const ID_FIELD: &str = "id";

/// A single attribute value of an open-schema item.
///
/// The set of kinds is closed: anything a JSON body or a DynamoDB attribute
/// can carry maps onto one of these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Renders a value the way a table cell shows it: strings verbatim, nested
/// structures as compact JSON.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::List(_) | FieldValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

/// An open-schema document stored in the items table.
///
/// Every item is a flat mapping from field name to [`FieldValue`]. The only
/// field with meaning to the store is `id`, which must be a non-blank string
/// and is never changed once the item exists. Any other field set is allowed,
/// and two items in the same table may look nothing alike.
///
/// Attributes are kept in a `BTreeMap`, so iteration order is stable and
/// independent of how the document was received.
///
/// # Example
///
/// ```ignore
/// use crate::dynamodb::Item;
///
/// let item = Item::new()
///     .set_string("id", "12345")
///     .set_string("username", "johndoe")
///     .set_number("age", 30.0);
/// assert_eq!(item.id(), Some("12345"));
/// ```
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    pub(crate) attributes: BTreeMap<String, FieldValue>,
}

impl Item {
    /// Creates a new empty `Item`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the item's key, if it carries a non-blank string `id`.
    pub fn id(&self) -> Option<&str> {
        self.get_string(ID_FIELD).filter(|id| !id.trim().is_empty())
    }

    /// Overwrites the `id` field, whatever it held before.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.attributes
            .insert(ID_FIELD.to_string(), FieldValue::String(id.into()));
    }

    /// Sets an arbitrary attribute.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets a string attribute.
    pub fn set_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, FieldValue::String(value.into()))
    }

    /// Sets a number attribute. Non-finite numbers have no JSON form and are
    /// stored as null.
    #[cfg(test)]
    pub fn set_number(self, key: impl Into<String>, value: impl Into<f64>) -> Self {
        let value = serde_json::Number::from_f64(value.into())
            .map_or(FieldValue::Null, FieldValue::Number);
        self.set(key, value)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.attributes.get(key)
    }

    /// Gets the value of an attribute as a string.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(FieldValue::as_str)
    }

    /// Iterates over every field except `id`.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> + '_ {
        self.attributes.iter().filter(|(name, _)| name.as_str() != ID_FIELD)
    }

    /// Converts the item into the attribute map the DynamoDB SDK expects.
    pub fn to_attributes(&self) -> Result<HashMap<String, AttributeValue>, serde_dynamo::Error> {
        serde_dynamo::to_item(self)
    }

    /// Builds an item from an attribute map returned by DynamoDB.
    pub fn from_attributes(
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<Self, serde_dynamo::Error> {
        serde_dynamo::from_item(attributes)
    }
}

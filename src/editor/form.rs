use std::collections::BTreeMap;

use crate::dynamodb::{Item, ID_FIELD};
use crate::error::EditorError;

fn field_name(name: &str) -> Result<String, EditorError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EditorError::BlankFieldName);
    }
    Ok(name.to_string())
}

/// Fields of an item that has not been created yet.
///
/// Values are opaque strings. Adding a name that is already staged replaces
/// its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagingSet {
    fields: BTreeMap<String, String>,
}

impl StagingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) -> Result<(), EditorError> {
        self.fields.insert(field_name(name)?, value.into());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.fields.iter()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// The document to create. `id` is applied last, so a staged field named
    /// `id` never overrides it.
    pub fn to_item(&self, id: &str) -> Item {
        let mut item = self
            .fields
            .iter()
            .fold(Item::new(), |item, (name, value)| item.set_string(name, value));
        item.set_id(id);
        item
    }
}

/// Editable copy of an existing item: every field except `id` as text.
///
/// Values go back to the server as strings. A number `30` is saved as `"30"`
/// and a list or map is saved as its JSON text, so typed fields do not keep
/// their type through an edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    id: String,
    fields: BTreeMap<String, String>,
}

impl EditForm {
    /// Returns `None` for items without a usable id.
    pub fn from_item(item: &Item) -> Option<Self> {
        let id = item.id()?.to_string();
        let fields = item
            .fields()
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        Some(Self { id, fields })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Changes an existing field or adds a new one.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), EditorError> {
        let name = field_name(name)?;
        if name == ID_FIELD {
            return Ok(());
        }
        self.fields.insert(name, value.into());
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.fields.iter()
    }

    /// The full replacement document, keyed by the original id.
    pub fn to_item(&self) -> Item {
        let mut item = self
            .fields
            .iter()
            .fold(Item::new(), |item, (name, value)| item.set_string(name, value));
        item.set_id(self.id.as_str());
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_rejects_blank_names_and_overwrites_duplicates() {
        let mut staging = StagingSet::new();
        assert!(matches!(
            staging.add("  ", "x"),
            Err(EditorError::BlankFieldName)
        ));
        staging.add("color", "red").unwrap();
        staging.add(" color ", "blue").unwrap();

        assert_eq!(staging.len(), 1);
        assert_eq!(staging.to_item("7").get_string("color"), Some("blue"));
    }

    #[test]
    fn staged_id_field_cannot_override_generated_id() {
        let mut staging = StagingSet::new();
        staging.add("id", "mine").unwrap();
        staging.add("x", "1").unwrap();

        let item = staging.to_item("generated");
        assert_eq!(item.id(), Some("generated"));
        assert_eq!(item.get_string("x"), Some("1"));
    }

    #[test]
    fn staging_remove() {
        let mut staging = StagingSet::new();
        staging.add("x", "1").unwrap();
        assert_eq!(staging.remove("x").as_deref(), Some("1"));
        assert!(staging.is_empty());
    }

    #[test]
    fn edit_form_seeds_text_values() {
        let item = Item::new()
            .set_string("id", "1")
            .set_string("name", "Alice")
            .set_number("age", 30.0);
        let form = EditForm::from_item(&item).unwrap();

        assert_eq!(form.id(), "1");
        assert_eq!(form.get("name"), Some("Alice"));
        assert_eq!(form.get("age"), Some("30.0"));
        assert_eq!(form.get("id"), None);
    }

    #[test]
    fn edit_form_produces_full_document() {
        let item = Item::new()
            .set_string("id", "1")
            .set_string("name", "Alice")
            .set_string("nickname", "Al");
        let mut form = EditForm::from_item(&item).unwrap();
        form.set("name", "Alicia").unwrap();
        form.set("id", "hijack").unwrap();
        form.remove("nickname");

        let expected = Item::new().set_string("id", "1").set_string("name", "Alicia");
        assert_eq!(form.to_item(), expected);
    }

    #[test]
    fn edited_values_are_saved_as_strings() {
        let item: Item =
            serde_json::from_str(r#"{"id":"1","age":30,"tags":["a","b"]}"#).unwrap();
        let saved = EditForm::from_item(&item).unwrap().to_item();

        assert_eq!(saved.get_string("age"), Some("30"));
        assert_eq!(saved.get_string("tags"), Some(r#"["a","b"]"#));
    }

    #[test]
    fn items_without_id_cannot_be_edited() {
        assert_eq!(EditForm::from_item(&Item::new().set_string("x", "1")), None);
    }
}

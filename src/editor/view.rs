use crate::dynamodb::{Item, ID_FIELD};
use crate::editor::columns;

/// Shown in cells whose item lacks the column's field.
pub const PLACEHOLDER: &str = "-";
pub const EMPTY_MESSAGE: &str = "No data found";
pub const LOADING_MESSAGE: &str = "Loading items...";

/// Client-side copy of the collection, kept only for rendering.
#[derive(Debug, Clone, Default)]
pub struct ItemList {
    items: Vec<Item>,
    loading: bool,
    loaded: bool,
    load_error: Option<String>,
}

impl ItemList {
    #[cfg(test)]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[cfg(test)]
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Whether any load has ever succeeded.
    pub fn has_loaded(&self) -> bool {
        self.loaded
    }

    pub fn columns(&self) -> Vec<String> {
        columns::union(&self.items)
    }

    pub fn find(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    pub(crate) fn start_loading(&mut self) {
        self.loading = true;
    }

    pub(crate) fn loaded(&mut self, result: Result<Vec<Item>, String>) {
        self.loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.loaded = true;
                self.load_error = None;
            }
            Err(message) => self.load_error = Some(message),
        }
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == Some(id))
    }

    pub(crate) fn push(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Replaces the row with the given id, appending when there is none.
    pub(crate) fn upsert(&mut self, id: &str, item: Item) {
        match self.position(id) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<(usize, Item)> {
        let index = self.position(id)?;
        Some((index, self.items.remove(index)))
    }

    pub(crate) fn insert(&mut self, index: usize, item: Item) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Plain-text table: `id` first, then the union of every other field.
    pub fn render(&self) -> String {
        if self.is_loading() && !self.has_loaded() {
            return LOADING_MESSAGE.to_string();
        }
        if self.items.is_empty() {
            return match &self.load_error {
                Some(error) => format!("Failed to load items: {error}"),
                None => EMPTY_MESSAGE.to_string(),
            };
        }

        let columns = self.columns();
        let mut header = vec![ID_FIELD.to_uppercase()];
        header.extend(columns.iter().map(|name| name.to_uppercase()));

        let rows: Vec<Vec<String>> = self
            .items
            .iter()
            .map(|item| {
                let mut row = vec![item.id().unwrap_or(PLACEHOLDER).to_string()];
                row.extend(columns.iter().map(|name| cell(item, name)));
                row
            })
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                rows.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = format_row(&header, &widths);
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &rows {
            out.push('\n');
            out.push_str(&format_row(row, &widths));
        }
        if let Some(error) = &self.load_error {
            out.push_str(&format!("\n(refresh failed: {error})"));
        }
        out
    }
}

/// Text of one cell; absent fields and nulls show the placeholder.
pub fn cell(item: &Item, column: &str) -> String {
    match item.get(column).map(ToString::to_string) {
        Some(text) if !text.is_empty() => text,
        _ => PLACEHOLDER.to_string(),
    }
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(items: Vec<Item>) -> ItemList {
        let mut list = ItemList::default();
        list.loaded(Ok(items));
        list
    }

    #[test]
    fn renders_union_columns_with_placeholders() {
        let list = list_of(vec![
            Item::new().set_string("id", "1").set_string("name", "Alice"),
            Item::new().set_string("id", "2").set_string("email", "b@x.com"),
        ]);

        assert_eq!(list.columns(), vec!["name", "email"]);
        assert_eq!(cell(&list.items()[0], "email"), PLACEHOLDER);
        assert_eq!(cell(&list.items()[1], "name"), PLACEHOLDER);

        let rendered = list.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "ID | NAME  | EMAIL");
        assert_eq!(lines[2], "1  | Alice | -");
        assert_eq!(lines[3], "2  | -     | b@x.com");
    }

    #[test]
    fn renders_empty_and_loading_states() {
        let mut list = ItemList::default();
        list.start_loading();
        assert_eq!(list.render(), LOADING_MESSAGE);

        list.loaded(Ok(vec![]));
        assert_eq!(list.render(), EMPTY_MESSAGE);
    }

    #[test]
    fn reload_keeps_showing_the_last_list() {
        let mut list = list_of(vec![Item::new().set_string("id", "1")]);
        list.start_loading();
        assert!(list.is_loading());
        assert_ne!(list.render(), LOADING_MESSAGE);
    }

    #[test]
    fn failed_load_keeps_previous_rows() {
        let mut list = list_of(vec![Item::new().set_string("id", "1")]);
        list.start_loading();
        list.loaded(Err("timeout".to_string()));

        assert_eq!(list.items().len(), 1);
        assert_eq!(list.load_error(), Some("timeout"));
        assert!(list.render().ends_with("(refresh failed: timeout)"));
    }

    #[test]
    fn nested_values_render_as_json() {
        let item: Item = serde_json::from_str(r#"{"id":"1","tags":["a","b"]}"#).unwrap();
        assert_eq!(cell(&item, "tags"), r#"["a","b"]"#);
    }
}

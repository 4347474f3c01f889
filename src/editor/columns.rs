use std::collections::HashSet;

use crate::dynamodb::Item;

/// Union of the field names of `items`, `id` excluded, in first-seen order.
///
/// Nothing is cached: callers recompute this from the loaded collection each
/// time they render, so a field that shows up on any item becomes a column
/// for every row.
pub fn union(items: &[Item]) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .flat_map(Item::fields)
        .filter_map(|(name, _)| seen.insert(name.as_str()).then(|| name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_excludes_id_and_keeps_first_seen_order() {
        let items = vec![
            Item::new().set_string("id", "1").set_string("name", "Alice"),
            Item::new()
                .set_string("id", "2")
                .set_string("email", "b@x.com")
                .set_string("name", "Bob"),
        ];
        assert_eq!(union(&items), vec!["name", "email"]);
    }

    #[test]
    fn empty_collection_has_no_columns() {
        assert!(union(&[]).is_empty());
        assert!(union(&[Item::new().set_string("id", "1")]).is_empty());
    }
}

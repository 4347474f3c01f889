//! Dynamic item editor.
//!
//! Keeps a local copy of the collection for rendering and drives the four
//! mutations against an [`ItemsApi`]. Every mutation is optimistic and runs in
//! two halves:
//!
//! 1. `begin_*` snapshots whatever it is about to touch, applies the expected
//!    result to the local list and marks the editor busy.
//! 2. `finish_*` takes the server's answer. Success reconciles the row with the
//!    document the server echoed; failure restores the snapshot and records an
//!    inline error.
//!
//! The async `create`, `update` and `delete` methods run both halves around
//! the request. While one mutation is outstanding every other `begin_*` fails
//! with [`EditorError::Busy`].

mod columns;
mod form;
mod view;

pub use form::{EditForm, StagingSet};
pub use view::{cell, ItemList};
#[cfg(test)]
pub use view::{LOADING_MESSAGE, PLACEHOLDER};

use tracing::{info, warn};
use uuid::Uuid;

use crate::api::ItemsApi;
use crate::dynamodb::Item;
use crate::error::{ApiError, EditorError};
use crate::utils::Backoff;

/// A create applied locally, waiting for the server.
#[must_use]
#[derive(Debug)]
pub struct PendingCreate {
    id: String,
    item: Item,
}

impl PendingCreate {
    pub fn item(&self) -> &Item {
        &self.item
    }
}

/// An update applied locally, waiting for the server.
#[must_use]
#[derive(Debug)]
pub struct PendingUpdate {
    id: String,
    item: Item,
    snapshot: Option<Item>,
}

impl PendingUpdate {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn item(&self) -> &Item {
        &self.item
    }
}

/// A delete applied locally, waiting for the server.
#[must_use]
#[derive(Debug)]
pub struct PendingDelete {
    id: String,
    index: usize,
    snapshot: Item,
}

impl PendingDelete {
    pub fn id(&self) -> &str {
        &self.id
    }
}

pub struct Editor<A: ItemsApi> {
    api: A,
    backoff: Backoff,
    list: ItemList,
    staging: StagingSet,
    form: Option<EditForm>,
    busy: bool,
    action_error: Option<String>,
}

impl<A: ItemsApi> Editor<A> {
    /// `backoff` applies to list reads only; mutations are never retried.
    pub fn new(api: A, backoff: Backoff) -> Self {
        Self {
            api,
            backoff,
            list: ItemList::default(),
            staging: StagingSet::new(),
            form: None,
            busy: false,
            action_error: None,
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn list(&self) -> &ItemList {
        &self.list
    }

    pub fn staging(&self) -> &StagingSet {
        &self.staging
    }

    pub fn form(&self) -> Option<&EditForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Result<&mut EditForm, EditorError> {
        self.form.as_mut().ok_or(EditorError::NotEditing)
    }

    /// Inline message left by the last failed mutation.
    #[cfg(test)]
    pub fn action_error(&self) -> Option<&str> {
        self.action_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether the create control is enabled.
    pub fn can_create(&self) -> bool {
        !self.is_busy() && !self.staging.is_empty()
    }

    pub fn add_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), EditorError> {
        self.staging.add(name, value)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.staging.remove(name)
    }

    /// Table, followed by the inline error if the last mutation failed.
    pub fn render(&self) -> String {
        let mut out = self.list.render();
        if let Some(error) = &self.action_error {
            out.push_str(&format!("\n! {error}"));
        }
        out
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.busy {
            return Err(EditorError::Busy);
        }
        Ok(())
    }

    fn fail(&mut self, action: &str, error: ApiError) -> EditorError {
        warn!("Failed to {action} item: {error}");
        self.action_error = Some(format!("Failed to {action} item: {error}"));
        EditorError::Api(error)
    }

    // --- List ---

    pub fn begin_refresh(&mut self) {
        self.list.start_loading();
    }

    pub fn finish_refresh(&mut self, result: Result<Vec<Item>, ApiError>) -> Result<(), EditorError> {
        match result {
            Ok(items) => {
                info!(count = items.len(), "Items loaded");
                self.list.loaded(Ok(items));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to load items: {e}");
                self.list.loaded(Err(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Reloads the whole collection, retrying per the read backoff.
    pub async fn refresh(&mut self) -> Result<(), EditorError> {
        self.begin_refresh();
        let result = self.backoff.retry(|| self.api.list()).await;
        self.finish_refresh(result)
    }

    /// Fetches one item and brings its row up to date, dropping it when the
    /// server no longer has it.
    pub async fn fetch(&mut self, id: &str) -> Result<Option<Item>, EditorError> {
        let item = self.api.get(id).await?;
        match &item {
            Some(item) => self.list.upsert(id, item.clone()),
            None => {
                self.list.remove(id);
            }
        }
        Ok(item)
    }

    // --- Create ---

    /// Gives the staged fields a fresh id and shows them as a provisional row.
    pub fn begin_create(&mut self) -> Result<PendingCreate, EditorError> {
        self.ensure_idle()?;
        if self.staging.is_empty() {
            return Err(EditorError::EmptyStaging);
        }
        let id = Uuid::new_v4().to_string();
        let item = self.staging.to_item(&id);
        self.list.push(item.clone());
        self.busy = true;
        self.action_error = None;
        Ok(PendingCreate { id, item })
    }

    /// Keeps the staged fields on failure so the operator can retry.
    pub fn finish_create(
        &mut self,
        pending: PendingCreate,
        result: Result<Item, ApiError>,
    ) -> Result<Item, EditorError> {
        self.busy = false;
        match result {
            Ok(saved) => {
                self.list.upsert(&pending.id, saved.clone());
                self.staging.clear();
                Ok(saved)
            }
            Err(e) => {
                self.list.remove(&pending.id);
                Err(self.fail("create", e))
            }
        }
    }

    pub async fn create(&mut self) -> Result<Item, EditorError> {
        let pending = self.begin_create()?;
        let result = self.api.create(pending.item()).await;
        self.finish_create(pending, result)
    }

    // --- Update ---

    /// Opens the edit form for a loaded item, replacing any open form.
    pub fn begin_edit(&mut self, id: &str) -> Result<&mut EditForm, EditorError> {
        let form = self
            .list
            .find(id)
            .and_then(EditForm::from_item)
            .ok_or_else(|| EditorError::UnknownItem(id.to_string()))?;
        Ok(self.form.insert(form))
    }

    pub fn cancel_edit(&mut self) {
        self.form = None;
    }

    /// Consumes the edit form; it is gone whatever the server answers.
    pub fn begin_update(&mut self) -> Result<PendingUpdate, EditorError> {
        self.ensure_idle()?;
        let form = self.form.take().ok_or(EditorError::NotEditing)?;
        let id = form.id().to_string();
        let item = form.to_item();
        let snapshot = self.list.find(&id).cloned();
        self.list.upsert(&id, item.clone());
        self.busy = true;
        self.action_error = None;
        Ok(PendingUpdate { id, item, snapshot })
    }

    pub fn finish_update(
        &mut self,
        pending: PendingUpdate,
        result: Result<Item, ApiError>,
    ) -> Result<Item, EditorError> {
        self.busy = false;
        match result {
            Ok(saved) => {
                self.list.upsert(&pending.id, saved.clone());
                Ok(saved)
            }
            Err(e) => {
                match pending.snapshot {
                    Some(snapshot) => self.list.upsert(&pending.id, snapshot),
                    None => {
                        self.list.remove(&pending.id);
                    }
                }
                Err(self.fail("update", e))
            }
        }
    }

    pub async fn update(&mut self) -> Result<Item, EditorError> {
        let pending = self.begin_update()?;
        let result = self.api.update(pending.id(), pending.item()).await;
        self.finish_update(pending, result)
    }

    // --- Delete ---

    pub fn begin_delete(&mut self, id: &str) -> Result<PendingDelete, EditorError> {
        self.ensure_idle()?;
        let (index, snapshot) = self
            .list
            .remove(id)
            .ok_or_else(|| EditorError::UnknownItem(id.to_string()))?;
        self.busy = true;
        self.action_error = None;
        Ok(PendingDelete {
            id: id.to_string(),
            index,
            snapshot,
        })
    }

    pub fn finish_delete(
        &mut self,
        pending: PendingDelete,
        result: Result<(), ApiError>,
    ) -> Result<(), EditorError> {
        self.busy = false;
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.list.insert(pending.index, pending.snapshot);
                Err(self.fail("delete", e))
            }
        }
    }

    /// On failure the row comes back and the collection is re-fetched, since
    /// the server may or may not have removed it.
    pub async fn delete(&mut self, id: &str) -> Result<(), EditorError> {
        let pending = self.begin_delete(id)?;
        let result = self.api.delete(pending.id()).await;
        let outcome = self.finish_delete(pending, result);
        if outcome.is_err() {
            if let Err(e) = self.refresh().await {
                warn!("Re-fetch after failed delete also failed: {e}");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-process stand-in for the HTTP API. While `failing` is set every
    /// call errors out without touching the data.
    #[derive(Default)]
    struct FakeApi {
        items: Mutex<Vec<Item>>,
        failing: AtomicBool,
        list_calls: AtomicUsize,
    }

    impl FakeApi {
        fn with_items(items: Vec<Item>) -> Self {
            Self {
                items: Mutex::new(items),
                ..Self::default()
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> Result<(), ApiError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Internal server error".to_string(),
                });
            }
            Ok(())
        }

        fn stored(&self) -> Vec<Item> {
            self.items.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ItemsApi for FakeApi {
        async fn list(&self) -> Result<Vec<Item>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.stored())
        }

        async fn get(&self, id: &str) -> Result<Option<Item>, ApiError> {
            self.check()?;
            Ok(self.stored().into_iter().find(|item| item.id() == Some(id)))
        }

        async fn create(&self, item: &Item) -> Result<Item, ApiError> {
            self.check()?;
            self.items.lock().unwrap().push(item.clone());
            Ok(item.clone())
        }

        async fn update(&self, id: &str, item: &Item) -> Result<Item, ApiError> {
            self.check()?;
            let mut items = self.items.lock().unwrap();
            items.retain(|existing| existing.id() != Some(id));
            items.push(item.clone());
            Ok(item.clone())
        }

        async fn delete(&self, id: &str) -> Result<(), ApiError> {
            self.check()?;
            self.items
                .lock()
                .unwrap()
                .retain(|existing| existing.id() != Some(id));
            Ok(())
        }
    }

    fn alice() -> Item {
        Item::new().set_string("id", "1").set_string("name", "Alice")
    }

    async fn loaded_editor(items: Vec<Item>) -> Editor<FakeApi> {
        let mut editor = Editor::new(
            FakeApi::with_items(items),
            Backoff::new(Duration::from_millis(1), 2),
        );
        editor.refresh().await.unwrap();
        editor
    }

    #[tokio::test]
    async fn refresh_retries_reads() {
        let mut editor = Editor::new(FakeApi::default(), Backoff::new(Duration::from_millis(1), 2));
        editor.api().set_failing(true);

        assert!(editor.refresh().await.is_err());
        assert_eq!(editor.api().list_calls.load(Ordering::SeqCst), 3);
        assert!(editor.list().load_error().is_some());
        assert!(!editor.list().is_loading());
    }

    #[tokio::test]
    async fn create_requires_staged_fields() {
        let mut editor = loaded_editor(vec![]).await;
        assert!(!editor.can_create());
        assert!(matches!(editor.create().await, Err(EditorError::EmptyStaging)));
        assert!(editor.api().stored().is_empty());
    }

    #[tokio::test]
    async fn create_generates_id_and_clears_staging() {
        let mut editor = loaded_editor(vec![]).await;
        editor.add_field("name", "Alice").unwrap();
        assert!(editor.can_create());

        let saved = editor.create().await.unwrap();

        let id = saved.id().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(saved.get_string("name"), Some("Alice"));
        assert!(editor.staging().is_empty());
        assert_eq!(editor.list().items(), &[saved.clone()]);
        assert_eq!(editor.api().stored(), vec![saved]);
    }

    #[tokio::test]
    async fn failed_create_removes_provisional_row() {
        let mut editor = loaded_editor(vec![]).await;
        editor.add_field("x", "1").unwrap();
        editor.api().set_failing(true);

        let pending = editor.begin_create().unwrap();
        assert_eq!(editor.list().items().len(), 1);
        assert_eq!(editor.list().items()[0].get_string("x"), Some("1"));
        assert!(editor.is_busy());
        assert!(!editor.can_create());

        let result = editor.api().create(pending.item()).await;
        assert!(editor.finish_create(pending, result).is_err());

        assert!(editor.list().items().is_empty());
        assert!(editor.action_error().unwrap().starts_with("Failed to create item"));
        assert!(editor.render().contains("Failed to create item"));
        assert_eq!(editor.staging().len(), 1);
        assert!(!editor.is_busy());
    }

    #[tokio::test]
    async fn second_mutation_is_refused_while_busy() {
        let mut editor = loaded_editor(vec![alice()]).await;
        editor.add_field("x", "1").unwrap();
        let pending = editor.begin_create().unwrap();

        assert!(matches!(editor.begin_delete("1"), Err(EditorError::Busy)));
        assert!(matches!(editor.begin_create(), Err(EditorError::Busy)));

        let result = editor.api().create(pending.item()).await;
        editor.finish_create(pending, result).unwrap();
        assert!(editor.begin_delete("1").is_ok());
    }

    #[tokio::test]
    async fn update_sends_full_document() {
        let mut editor = loaded_editor(vec![alice().set_string("nickname", "Al")]).await;
        let form = editor.begin_edit("1").unwrap();
        form.set("name", "Alicia").unwrap();
        form.remove("nickname");

        let saved = editor.update().await.unwrap();

        let expected = Item::new().set_string("id", "1").set_string("name", "Alicia");
        assert_eq!(saved, expected);
        assert_eq!(editor.api().stored(), vec![expected.clone()]);
        assert_eq!(editor.list().find("1"), Some(&expected));
        assert!(editor.form().is_none());
    }

    #[tokio::test]
    async fn failed_update_restores_snapshot() {
        let mut editor = loaded_editor(vec![alice()]).await;
        editor.begin_edit("1").unwrap().set("name", "Alicia").unwrap();

        let pending = editor.begin_update().unwrap();
        assert_eq!(
            editor.list().find("1").unwrap().get_string("name"),
            Some("Alicia")
        );

        editor.api().set_failing(true);
        let result = editor.api().update(pending.id(), pending.item()).await;
        assert!(editor.finish_update(pending, result).is_err());

        assert_eq!(editor.list().find("1"), Some(&alice()));
        assert!(editor.form().is_none());
        assert!(editor.action_error().is_some());
    }

    #[tokio::test]
    async fn update_without_form_is_rejected() {
        let mut editor = loaded_editor(vec![alice()]).await;
        assert!(matches!(editor.update().await, Err(EditorError::NotEditing)));
        assert!(matches!(
            editor.begin_edit("missing"),
            Err(EditorError::UnknownItem(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let bob = Item::new().set_string("id", "2").set_string("name", "Bob");
        let mut editor = loaded_editor(vec![alice(), bob.clone()]).await;

        editor.delete("1").await.unwrap();

        assert_eq!(editor.list().items(), &[bob.clone()]);
        assert_eq!(editor.api().stored(), vec![bob]);
    }

    #[tokio::test]
    async fn failed_delete_restores_row_in_place() {
        let bob = Item::new().set_string("id", "2").set_string("name", "Bob");
        let mut editor = loaded_editor(vec![alice(), bob.clone()]).await;

        let pending = editor.begin_delete("1").unwrap();
        assert_eq!(editor.list().items().len(), 1);

        editor.api().set_failing(true);
        let result = editor.api().delete(pending.id()).await;
        assert!(editor.finish_delete(pending, result).is_err());

        assert_eq!(editor.list().items(), &[alice(), bob]);
        assert!(editor.action_error().unwrap().starts_with("Failed to delete item"));
    }

    #[tokio::test]
    async fn failed_delete_refetches_collection() {
        let mut editor = loaded_editor(vec![alice()]).await;
        editor.api().set_failing(true);
        let calls_before = editor.api().list_calls.load(Ordering::SeqCst);

        assert!(editor.delete("1").await.is_err());

        assert!(editor.api().list_calls.load(Ordering::SeqCst) > calls_before);
        assert_eq!(editor.list().items(), &[alice()]);
    }

    #[tokio::test]
    async fn fetch_updates_or_drops_row() {
        let mut editor = loaded_editor(vec![alice()]).await;
        editor
            .api()
            .items
            .lock()
            .unwrap()
            .retain(|item| item.id() != Some("1"));

        assert_eq!(editor.fetch("1").await.unwrap(), None);
        assert!(editor.list().items().is_empty());
    }
}

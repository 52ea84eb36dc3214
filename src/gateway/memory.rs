use super::{Collection, DocumentStore, Fields};
use crate::errors::GatewayError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Document store kept in process memory.
///
/// Documents keep insertion order. A collection can be switched into a
/// failing mode, in which every call against it returns
/// [`GatewayError::Unavailable`].
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<(String, Fields)>>>,
    failing: Mutex<HashSet<Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, collection: Collection) {
        lock(&self.failing).insert(collection);
    }

    pub fn recover(&self, collection: Collection) {
        lock(&self.failing).remove(&collection);
    }

    fn check(&self, collection: Collection) -> Result<(), GatewayError> {
        if lock(&self.failing).contains(&collection) {
            return Err(GatewayError::Unavailable(collection));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: Collection) -> Result<Vec<(String, Fields)>, GatewayError> {
        self.check(collection)?;
        Ok(lock(&self.collections)
            .get(&collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, GatewayError> {
        self.check(collection)?;
        let id = Uuid::new_v4().simple().to_string();
        lock(&self.collections)
            .entry(collection)
            .or_default()
            .push((id.clone(), fields));
        debug!("Stored {} document {}", collection, id);
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), GatewayError> {
        self.check(collection)?;
        let mut collections = lock(&self.collections);
        let document = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| doc_id == id))
            .ok_or_else(|| GatewayError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        document.1.extend(fields);
        Ok(())
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<(), GatewayError> {
        self.check(collection)?;
        if let Some(docs) = lock(&self.collections).get_mut(&collection) {
            docs.retain(|(doc_id, _)| doc_id != id);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn update_overwrites_only_given_fields() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Tags, fields(json!({"name": "drama", "color": "red"})))
            .await
            .unwrap();

        store
            .update(Collection::Tags, &id, fields(json!({"name": "Drama"})))
            .await
            .unwrap();

        let docs = store.list(Collection::Tags).await.unwrap();
        assert_eq!(docs[0].1, fields(json!({"name": "Drama", "color": "red"})));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(Collection::Items, "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failing_collection_recovers() {
        let store = MemoryStore::new();
        store.fail(Collection::Items);
        assert!(store.list(Collection::Items).await.is_err());
        assert!(store.list(Collection::Tags).await.is_ok());

        store.recover(Collection::Items);
        assert!(store.list(Collection::Items).await.is_ok());
    }
}

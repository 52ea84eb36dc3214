//! CRUD access to the remote document collections.
//!
//! A [`DocumentStore`] moves raw JSON documents in and out of a backend. A
//! [`Gateway`] sits on top of it and speaks in typed entities, merging the
//! backend-assigned id into every document it returns.

mod codec;
mod firestore;
mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::errors::GatewayError;
use crate::models::{Item, Tag};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The document body without its id.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Items,
    Tags,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Items => "items",
            Collection::Tags => "tags",
        }
    }

    /// Listing failures for this collection degrade to an empty result.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Collection::Tags)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<(String, Fields)>, GatewayError>;

    /// Inserts a new document and returns the id the backend assigned to it.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String, GatewayError>;

    /// Overwrites the given fields of an existing document.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), GatewayError>;

    async fn remove(&self, collection: Collection, id: &str) -> Result<(), GatewayError>;

    /// Backend name, for logging.
    fn backend_name(&self) -> &'static str;
}

/// An entity stored as a document in one of the collections.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

impl Document for Item {
    const COLLECTION: Collection = Collection::Items;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Document for Tag {
    const COLLECTION: Collection = Collection::Tags;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

pub struct Gateway<E> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Gateway<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Document> Gateway<E> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    #[instrument(skip(self), fields(collection = %E::COLLECTION, backend = self.store.backend_name()))]
    pub async fn list_all(&self) -> Result<Vec<E>, GatewayError> {
        match self.fetch_all().await {
            Ok(entities) => {
                debug!("Fetched {} documents", entities.len());
                Ok(entities)
            }
            Err(e) if E::COLLECTION.is_best_effort() => {
                warn!("Failed to fetch {}, continuing without them: {}", E::COLLECTION, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<E>, GatewayError> {
        self.store
            .list(E::COLLECTION)
            .await?
            .into_iter()
            .map(|(id, mut fields)| {
                fields.insert("id".to_string(), Value::String(id));
                serde_json::from_value(Value::Object(fields)).map_err(|source| GatewayError::Codec {
                    collection: E::COLLECTION,
                    source,
                })
            })
            .collect()
    }

    /// Stores `entity` as a new document. Any id it carries is ignored.
    #[instrument(skip(self, entity), fields(collection = %E::COLLECTION))]
    pub async fn create(&self, entity: &E) -> Result<E, GatewayError> {
        let fields = to_fields(entity)?;
        let id = self.store.create(E::COLLECTION, fields).await?;
        debug!("Created document {}", id);

        let mut saved = entity.clone();
        saved.set_id(id);
        Ok(saved)
    }

    #[instrument(skip(self, entity), fields(collection = %E::COLLECTION))]
    pub async fn update(&self, id: &str, entity: &E) -> Result<(), GatewayError> {
        let fields = to_fields(entity)?;
        self.store.update(E::COLLECTION, id, fields).await
    }

    #[instrument(skip(self), fields(collection = %E::COLLECTION))]
    pub async fn remove(&self, id: &str) -> Result<(), GatewayError> {
        self.store.remove(E::COLLECTION, id).await
    }
}

fn to_fields<E: Document>(entity: &E) -> Result<Fields, GatewayError> {
    let value = serde_json::to_value(entity).map_err(|source| GatewayError::Codec {
        collection: E::COLLECTION,
        source,
    })?;

    match value {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(GatewayError::Backend(anyhow::anyhow!(
            "{} entity serialized to a non-object: {}",
            E::COLLECTION,
            other
        ))),
    }
}

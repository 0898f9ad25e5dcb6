//! Typed collection and document references.
//!
//! A reference pairs a store handle with a [`Converter`]. References are plain
//! values: cheap to clone, never mutated, safe to share across tasks.

use std::fmt;
use std::sync::Arc;

use crate::{DocumentPath, DocumentStore, Map, Snapshot, StoreError, StoreResult, Value, normalize};

/// Encode-for-write / decode-for-read pair attached to a collection.
pub trait Converter<V>: Send + Sync {
    fn to_store(&self, value: &V) -> StoreResult<Map>;

    fn from_store(&self, snapshot: Snapshot) -> StoreResult<V>;
}

/// Normalize `value` and require a keyed structure at the top level.
pub(crate) fn encode_document(value: &Value, collection: &str) -> StoreResult<Map> {
    match normalize(value) {
        Value::Map(map) => Ok(map),
        _ => Err(StoreError::NotADocument(collection.to_string())),
    }
}

/// Untyped converter: normalizes on write, hands back the raw map on read.
#[derive(Debug, Clone, Default)]
pub struct PassthroughConverter;

impl Converter<Map> for PassthroughConverter {
    fn to_store(&self, value: &Map) -> StoreResult<Map> {
        // A map always normalizes to a map.
        encode_document(&Value::Map(value.clone()), "")
    }

    fn from_store(&self, snapshot: Snapshot) -> StoreResult<Map> {
        Ok(snapshot.data)
    }
}

/// A named view over a store collection.
pub struct CollectionRef<V> {
    name: String,
    store: Arc<dyn DocumentStore>,
    converter: Arc<dyn Converter<V>>,
}

impl<V> Clone for CollectionRef<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: self.store.clone(),
            converter: self.converter.clone(),
        }
    }
}

impl<V> fmt::Debug for CollectionRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRef")
            .field("name", &self.name)
            .finish()
    }
}

impl<V> CollectionRef<V> {
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        converter: Arc<dyn Converter<V>>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            converter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference to the document `id`. No I/O.
    pub fn doc(&self, id: impl Into<String>) -> DocumentRef<V> {
        DocumentRef {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Reference to a document under a freshly allocated id. No I/O.
    pub fn new_doc(&self) -> DocumentRef<V> {
        self.doc(self.store.new_id(&self.name))
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<V>> {
        self.doc(id).get().await
    }

    pub async fn set(&self, id: &str, value: &V) -> StoreResult<()> {
        self.doc(id).set(value).await
    }

    /// Write `value` under a freshly allocated id and return its reference.
    pub async fn add(&self, value: &V) -> StoreResult<DocumentRef<V>> {
        let doc = self.new_doc();
        doc.set(value).await?;
        Ok(doc)
    }
}

/// Identifies one document in a typed collection.
pub struct DocumentRef<V> {
    collection: CollectionRef<V>,
    id: String,
}

impl<V> Clone for DocumentRef<V> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            id: self.id.clone(),
        }
    }
}

impl<V> fmt::Debug for DocumentRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentRef")
            .field("collection", &self.collection.name)
            .field("id", &self.id)
            .finish()
    }
}

impl<V> DocumentRef<V> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &CollectionRef<V> {
        &self.collection
    }

    /// `collection/id`.
    pub fn path(&self) -> DocumentPath {
        DocumentPath::new(self.collection.name.clone(), self.id.clone())
    }

    /// Fetch and decode. An absent document is `Ok(None)`.
    pub async fn get(&self) -> StoreResult<Option<V>> {
        let Some(data) = self.collection.store.get(&self.path()).await? else {
            return Ok(None);
        };
        let snapshot = Snapshot {
            id: self.id.clone(),
            data,
        };
        self.collection.converter.from_store(snapshot).map(Some)
    }

    /// Encode and overwrite.
    pub async fn set(&self, value: &V) -> StoreResult<()> {
        let data = self.collection.converter.to_store(value)?;
        self.collection.store.set(&self.path(), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stub::StubStore;
    use crate::{StorageDatetime, Timestamp};

    fn untyped(store: Arc<StubStore>) -> CollectionRef<Map> {
        CollectionRef::new("p", store, Arc::new(PassthroughConverter))
    }

    #[tokio::test]
    async fn passthrough_normalizes_writes() {
        let store = Arc::new(StubStore::default());
        let collection = untyped(store.clone());

        let mut data = Map::new();
        data.insert(
            "at".to_string(),
            Value::Instant(StorageDatetime::from_millis(9_000).unwrap()),
        );
        collection.set("one", &data).await.unwrap();

        let stored = store.docs.lock().get(&DocumentPath::new("p", "one")).cloned();
        assert_eq!(
            stored.unwrap().get("at"),
            Some(&Value::Timestamp(Timestamp::from_millis(9_000)))
        );
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let collection = untyped(Arc::new(StubStore::default()));
        assert_eq!(collection.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_allocates_distinct_ids() {
        let store = Arc::new(StubStore::default());
        let collection = untyped(store.clone());

        let a = collection.add(&Map::new()).await.unwrap();
        let b = collection.add(&Map::new()).await.unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(store.docs.lock().len(), 2);
    }

    #[test]
    fn doc_path_renders_collection_and_id() {
        let collection = untyped(Arc::new(StubStore::default()));
        let doc = collection.doc("abc");
        assert_eq!(doc.path().to_string(), "p/abc");
        assert_eq!(doc.collection().name(), "p");
    }

    #[test]
    fn scalar_documents_are_rejected() {
        let err = encode_document(&Value::Integer(1), "p").unwrap_err();
        assert!(matches!(err, StoreError::NotADocument(name) if name == "p"));
    }
}

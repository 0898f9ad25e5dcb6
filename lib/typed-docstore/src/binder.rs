//! Validated collection binding.
//!
//! Writes are normalized and trusted. Reads optionally get the document id
//! injected under `id_field`, then must pass the collection's decoder. A
//! document that fails is logged with its full report and the read aborts
//! with `StoreError::MalformedContent`; nothing is defaulted or skipped here.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::error;

use crate::reference::encode_document;
use crate::{
    CollectionRef, Connection, Converter, Decoder, DocumentRef, FromValue, Map, Snapshot,
    StoreError, StoreResult, ToValue, Value, derived,
};

/// A domain type bound to a fixed collection.
///
/// Usually generated with `#[document(collection = "...")]` on
/// `#[derive(Document)]`.
pub trait Collection: FromValue + ToValue + Send + Sync + 'static {
    fn collection_name() -> &'static str;

    /// Field that receives the document id on read, if any.
    fn id_field() -> Option<&'static str> {
        None
    }
}

/// Converter that decodes every read through a caller-supplied validator.
pub struct ValidatedConverter<V, D> {
    collection: String,
    decoder: D,
    id_field: Option<String>,
    _marker: PhantomData<fn() -> V>,
}

impl<V, D> ValidatedConverter<V, D>
where
    D: Decoder<V>,
{
    pub fn new(collection: impl Into<String>, decoder: D, id_field: Option<&str>) -> Self {
        Self {
            collection: collection.into(),
            decoder,
            id_field: id_field.filter(|f| !f.is_empty()).map(str::to_string),
            _marker: PhantomData,
        }
    }

    /// The raw value handed to the decoder: document data plus, when
    /// configured, the id under `id_field` (overriding any stored field).
    fn raw_value(&self, snapshot: Snapshot) -> Value {
        let Snapshot { id, mut data } = snapshot;
        if let Some(field) = &self.id_field {
            data.insert(field.clone(), Value::String(id));
        }
        Value::Map(data)
    }
}

impl<V, D> Converter<V> for ValidatedConverter<V, D>
where
    V: ToValue,
    D: Decoder<V>,
{
    fn to_store(&self, value: &V) -> StoreResult<Map> {
        encode_document(&value.to_value(), &self.collection)
    }

    fn from_store(&self, snapshot: Snapshot) -> StoreResult<V> {
        let id = snapshot.id.clone();
        let raw = self.raw_value(snapshot);

        self.decoder.decode(&raw).map_err(|report| {
            error!(
                collection = %self.collection,
                id = %id,
                report = %report,
                "bad doc: {}/{}",
                self.collection,
                id
            );
            StoreError::MalformedContent {
                collection: self.collection.clone(),
                id,
                report,
            }
        })
    }
}

impl Connection {
    /// Typed view over `name` whose reads must pass `decoder`.
    ///
    /// With `id_field` set, each decoded value carries its document id under
    /// that field name.
    pub fn bind<V, D>(&self, name: &str, decoder: D, id_field: Option<&str>) -> CollectionRef<V>
    where
        V: ToValue + 'static,
        D: Decoder<V> + 'static,
    {
        let converter = ValidatedConverter::new(name, decoder, id_field);
        CollectionRef::new(name, self.store().clone(), Arc::new(converter))
    }

    /// Bind `V`'s own collection using its derived decoder.
    pub fn collection_of<V: Collection>(&self) -> CollectionRef<V> {
        self.bind(V::collection_name(), derived::<V>(), V::id_field())
    }

    /// Typed document reference, shorthand for `bind(..).doc(id)`.
    pub fn typed_doc_ref<V, D>(
        &self,
        name: &str,
        decoder: D,
        id_field: Option<&str>,
        id: &str,
    ) -> DocumentRef<V>
    where
        V: ToValue + 'static,
        D: Decoder<V> + 'static,
    {
        self.bind(name, decoder, id_field).doc(id)
    }
}

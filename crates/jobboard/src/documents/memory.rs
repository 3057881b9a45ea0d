use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Collection, Document, DocumentError, DocumentStore, Fields, Predicate, WriteMode};

type Shelf = BTreeMap<String, Fields>;

/// Process-local document store.
///
/// A single mutex guards every collection, so a conditional update observes and writes the
/// stored copy without any other write interleaving.
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<HashMap<Collection, Shelf>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        let guard = self.collections.lock().expect("document store mutex poisoned");
        guard.get(&collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, DocumentError> {
        let guard = self.collections.lock().expect("document store mutex poisoned");
        Ok(guard
            .get(&collection)
            .and_then(|shelf| shelf.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), DocumentError> {
        let mut guard = self.collections.lock().expect("document store mutex poisoned");
        let shelf = guard.entry(collection).or_default();
        if mode == WriteMode::Merge {
            if let Some(existing) = shelf.get_mut(id) {
                existing.extend(fields);
                return Ok(());
            }
        }
        shelf.insert(id.to_string(), fields);
        Ok(())
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> Result<(), DocumentError> {
        let mut guard = self.collections.lock().expect("document store mutex poisoned");
        let shelf = guard.entry(collection).or_default();
        if shelf.contains_key(id) {
            return Err(DocumentError::AlreadyExists);
        }
        shelf.insert(id.to_string(), fields);
        Ok(())
    }

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
    ) -> Result<Vec<Document>, DocumentError> {
        let guard = self.collections.lock().expect("document store mutex poisoned");
        Ok(guard
            .get(&collection)
            .map(|shelf| {
                shelf
                    .iter()
                    .filter(|(_, fields)| predicate.matches(fields))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
        condition: &Predicate,
    ) -> Result<Document, DocumentError> {
        let mut guard = self.collections.lock().expect("document store mutex poisoned");
        let stored = guard
            .get_mut(&collection)
            .and_then(|shelf| shelf.get_mut(id))
            .ok_or(DocumentError::NotFound)?;

        if !condition.matches(stored) {
            return Err(DocumentError::ConditionFailed);
        }

        stored.extend(fields);
        Ok(Document::new(id, stored.clone()))
    }
}

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: &'static str, id: Uuid },
}

/// One named set of documents addressed by id, with predicate filters.
/// The document-store surface the booking core is written against:
/// insert/get/find/update/delete, nothing database-specific.
pub struct Collection<T> {
    name: &'static str,
    docs: RwLock<HashMap<Uuid, T>>,
}

impl<T: Clone> Collection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            docs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, id: Uuid, doc: T) {
        debug!("inserting {} document {}", self.name, id);
        self.docs.write().await.insert(id, doc);
    }

    pub async fn get(&self, id: Uuid) -> Option<T> {
        self.docs.read().await.get(&id).cloned()
    }

    pub async fn find<P>(&self, pred: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        self.docs
            .read()
            .await
            .values()
            .filter(|doc| pred(doc))
            .cloned()
            .collect()
    }

    pub async fn find_one<P>(&self, pred: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.docs.read().await.values().find(|doc| pred(doc)).cloned()
    }

    /// Apply a mutation to the document in place and return the result.
    pub async fn update<F>(&self, id: Uuid, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut T),
    {
        let mut docs = self.docs.write().await;
        let doc = docs.get_mut(&id).ok_or(StoreError::NotFound {
            collection: self.name,
            id,
        })?;
        apply(doc);
        Ok(doc.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Option<T> {
        debug!("removing {} document {}", self.name, id);
        self.docs.write().await.remove(&id)
    }

    pub async fn all(&self) -> Vec<T> {
        self.docs.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

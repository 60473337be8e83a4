use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Classroom, School, Student, User};
use super::query::{ListQuery, Page};

/// Errors from the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize {collection} record: {source}")]
    Serialization {
        collection: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A record kept in a [`Collection`]
pub trait Document: Clone + Serialize + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

/// In-memory, insertion-ordered collection of documents.
///
/// Every operation takes the lock for its own duration only; callers
/// never hold a guard across an await.
pub struct Collection<T> {
    name: &'static str,
    records: RwLock<Vec<T>>,
}

impl<T: Document> Collection<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn insert(&self, document: T) -> T {
        self.records.write().await.push(document.clone());
        tracing::debug!("Inserted {} into {}", document.id(), self.name);
        document
    }

    pub async fn find_by_id(&self, id: Uuid) -> Option<T> {
        self.find_one(|d| d.id() == id).await
    }

    pub async fn find_one<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.records.read().await.iter().find(|d| predicate(d)).cloned()
    }

    pub async fn exists<P>(&self, predicate: P) -> bool
    where
        P: Fn(&T) -> bool,
    {
        self.records.read().await.iter().any(|d| predicate(d))
    }

    /// Apply `change` to the document with `id`, returning the updated copy
    pub async fn update<F>(&self, id: Uuid, change: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut records = self.records.write().await;
        let document = records.iter_mut().find(|d| d.id() == id)?;
        change(document);
        Some(document.clone())
    }

    /// Remove the first document matching `predicate`
    pub async fn delete_one<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        let mut records = self.records.write().await;
        let index = records.iter().position(|d| predicate(d))?;
        Some(records.remove(index))
    }

    /// Filter, sort and slice the documents within `scope`
    pub async fn page<P>(&self, query: &ListQuery, scope: P) -> Result<Page, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        let mut rows = Vec::new();
        {
            let records = self.records.read().await;
            for document in records.iter().filter(|d| scope(d)) {
                let value = serde_json::to_value(document).map_err(|source| StoreError::Serialization {
                    collection: self.name,
                    source,
                })?;
                if query.matches(&value) {
                    rows.push(value);
                }
            }
        }

        let total = rows.len();
        rows.sort_by(|a, b| query.compare(a, b));
        let items = rows.into_iter().skip(query.skip()).take(query.limit).collect();

        Ok(Page { items, total })
    }
}

/// All collections of the service
pub struct Store {
    pub users: Collection<User>,
    pub schools: Collection<School>,
    pub classrooms: Collection<Classroom>,
    pub students: Collection<Student>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            users: Collection::new("users"),
            schools: Collection::new("schools"),
            classrooms: Collection::new("classrooms"),
            students: Collection::new("students"),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

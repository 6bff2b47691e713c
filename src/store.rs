//! Entity store contract and its two adapters.
//!
//! The core never talks to a database directly: tasks, user profiles and
//! notifications go through [`EntityStore`]. [`MemoryStore`] backs tests and
//! embedding; [`FileStore`] keeps one JSON document per collection under
//! `.teamtask/`.
//!
//! Records are kept in insertion order, so `query` returns oldest first.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::Storage;

/// A record kind held by the store
pub trait Entity: Clone + Serialize + DeserializeOwned {
    /// Collection name (also the file stem for [`FileStore`])
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

/// Create/read/query/update/delete over entity collections
pub trait EntityStore {
    /// Store a new entity and return its identifier.
    ///
    /// An empty id is replaced with a fresh ULID; a non-empty id must not
    /// already exist.
    fn create<T: Entity>(&self, entity: T) -> Result<String>;

    fn get<T: Entity>(&self, id: &str) -> Result<Option<T>>;

    fn query<T, F>(&self, predicate: F) -> Result<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool;

    /// Replace a stored entity; `Error::NotFound` when the id is unknown.
    fn update<T: Entity>(&self, entity: &T) -> Result<()>;

    /// Remove an entity; `false` when nothing was stored under `id`.
    fn delete<T: Entity>(&self, id: &str) -> Result<bool>;

    fn all<T: Entity>(&self) -> Result<Vec<T>> {
        self.query(|_: &T| true)
    }
}

fn record_id(record: &serde_json::Value) -> Option<&str> {
    record.get("id").and_then(|id| id.as_str())
}

fn position(records: &[serde_json::Value], id: &str) -> Option<usize> {
    records.iter().position(|record| record_id(record) == Some(id))
}

fn insert_record<T: Entity>(records: &mut Vec<serde_json::Value>, mut entity: T) -> Result<String> {
    let id = entity.id().trim().to_string();
    let id = if id.is_empty() {
        Ulid::new().to_string()
    } else {
        if position(records, &id).is_some() {
            return Err(Error::InvalidArgument(format!(
                "{} record already exists: {id}",
                T::COLLECTION
            )));
        }
        id
    };
    entity.set_id(id.clone());
    records.push(serde_json::to_value(&entity)?);
    Ok(id)
}

fn find_record<T: Entity>(records: &[serde_json::Value], id: &str) -> Result<Option<T>> {
    match position(records, id) {
        Some(index) => Ok(Some(serde_json::from_value(records[index].clone())?)),
        None => Ok(None),
    }
}

fn filter_records<T, F>(records: &[serde_json::Value], predicate: F) -> Result<Vec<T>>
where
    T: Entity,
    F: Fn(&T) -> bool,
{
    let mut matches = Vec::new();
    for record in records {
        let entity: T = serde_json::from_value(record.clone())?;
        if predicate(&entity) {
            matches.push(entity);
        }
    }
    Ok(matches)
}

fn replace_record<T: Entity>(records: &mut [serde_json::Value], entity: &T) -> Result<()> {
    let index = position(records, entity.id()).ok_or_else(|| Error::NotFound {
        collection: T::COLLECTION,
        id: entity.id().to_string(),
    })?;
    records[index] = serde_json::to_value(entity)?;
    Ok(())
}

fn remove_record(records: &mut Vec<serde_json::Value>, id: &str) -> bool {
    match position(records, id) {
        Some(index) => {
            records.remove(index);
            true
        }
        None => false,
    }
}

/// In-memory store; collections live in a map of JSON records
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Vec<serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, collection: &'static str, f: impl FnOnce(&[serde_json::Value]) -> Result<R>) -> Result<R> {
        let guard = self
            .collections
            .read()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".to_string()))?;
        match guard.get(collection) {
            Some(records) => f(records),
            None => f(&[]),
        }
    }

    fn write<R>(
        &self,
        collection: &'static str,
        f: impl FnOnce(&mut Vec<serde_json::Value>) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| Error::StoreUnavailable("memory store lock poisoned".to_string()))?;
        f(guard.entry(collection).or_default())
    }
}

impl EntityStore for MemoryStore {
    fn create<T: Entity>(&self, entity: T) -> Result<String> {
        self.write(T::COLLECTION, |records| insert_record(records, entity))
    }

    fn get<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        self.read(T::COLLECTION, |records| find_record(records, id))
    }

    fn query<T, F>(&self, predicate: F) -> Result<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool,
    {
        self.read(T::COLLECTION, |records| filter_records(records, predicate))
    }

    fn update<T: Entity>(&self, entity: &T) -> Result<()> {
        self.write(T::COLLECTION, |records| replace_record(records, entity))
    }

    fn delete<T: Entity>(&self, id: &str) -> Result<bool> {
        self.write(T::COLLECTION, |records| Ok(remove_record(records, id)))
    }
}

/// File-backed store using [`Storage`] collection documents
#[derive(Debug, Clone)]
pub struct FileStore {
    storage: Storage,
}

impl FileStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl EntityStore for FileStore {
    fn create<T: Entity>(&self, entity: T) -> Result<String> {
        self.storage
            .update_collection(T::COLLECTION, |records| insert_record(records, entity))
    }

    fn get<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        let file = self.storage.read_collection(T::COLLECTION)?;
        find_record(&file.records, id)
    }

    fn query<T, F>(&self, predicate: F) -> Result<Vec<T>>
    where
        T: Entity,
        F: Fn(&T) -> bool,
    {
        let file = self.storage.read_collection(T::COLLECTION)?;
        filter_records(&file.records, predicate)
    }

    fn update<T: Entity>(&self, entity: &T) -> Result<()> {
        self.storage
            .update_collection(T::COLLECTION, |records| replace_record(records, entity))
    }

    fn delete<T: Entity>(&self, id: &str) -> Result<bool> {
        self.storage
            .update_collection(T::COLLECTION, |records| Ok(remove_record(records, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    impl Entity for Note {
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }

        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    fn exercise_store<S: EntityStore>(store: &S) {
        let generated = store.create(note("", "first")).expect("create");
        assert_eq!(generated.len(), 26);
        store.create(note("fixed", "second")).expect("create fixed");

        let duplicate = store.create(note("fixed", "again"));
        assert!(matches!(duplicate, Err(Error::InvalidArgument(_))));

        let fetched: Note = store.get("fixed").expect("get").expect("present");
        assert_eq!(fetched.body, "second");
        assert!(store.get::<Note>("missing").expect("get").is_none());

        let bodies: Vec<String> = store
            .all::<Note>()
            .expect("all")
            .into_iter()
            .map(|n| n.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);

        let matching: Vec<Note> = store.query(|n: &Note| n.body.starts_with('s')).expect("query");
        assert_eq!(matching, vec![note("fixed", "second")]);

        store.update(&note("fixed", "edited")).expect("update");
        let fetched: Note = store.get("fixed").expect("get").expect("present");
        assert_eq!(fetched.body, "edited");

        let missing = store.update(&note("ghost", "x"));
        assert!(matches!(missing, Err(Error::NotFound { collection: "notes", .. })));

        assert!(store.delete::<Note>("fixed").expect("delete"));
        assert!(!store.delete::<Note>("fixed").expect("delete again"));
        assert_eq!(store.all::<Note>().expect("all").len(), 1);
    }

    #[test]
    fn memory_store_honours_contract() {
        exercise_store(&MemoryStore::new());
    }

    #[test]
    fn file_store_honours_contract() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(Storage::new(dir.path().to_path_buf()));
        exercise_store(&store);
        assert!(store.storage().collection_file("notes").exists());
    }
}

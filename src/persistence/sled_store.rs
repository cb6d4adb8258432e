//! Document store backed by `sled`
//!
//! A small document abstraction over sled trees. Each collection is one tree;
//! each document is a JSON object stored under its string id. Updates are a
//! plain read-merge-write with no concurrency token, so the last writer wins.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sled::{Db, Tree};

use crate::utils::error::StoreError;

pub type Document = Map<String, Value>;

#[derive(Clone)]
pub struct Store {
    db: Db,
}

impl Store {
    /// Open or create a sled database at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    /// A database that lives only as long as this handle.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        Ok(Collection {
            name: name.to_string(),
            tree: self.db.open_tree(name)?,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("db", &"sled::Db").finish()
    }
}

#[derive(Clone)]
pub struct Collection {
    name: String,
    tree: Tree,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_one(&self, id: &str) -> Result<Option<Document>, StoreError> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a document and deserialize it into `T`.
    pub fn find_as<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.find_one(id)? {
            Some(doc) => Ok(Some(serde_json::from_value(Value::Object(doc))?)),
            None => Ok(None),
        }
    }

    /// Every document, in key order.
    pub fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        self.tree
            .iter()
            .map(|entry| {
                let (_, bytes) = entry?;
                decode(&bytes)
            })
            .collect()
    }

    /// Store `doc` under `id`, replacing any previous document.
    pub fn insert_one(&self, id: &str, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(doc)?;
        self.tree.insert(id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Merge `fields` into the stored document (top-level keys only).
    /// Returns the merged document, or `None` when `id` does not exist.
    pub fn update_set(&self, id: &str, fields: Document) -> Result<Option<Document>, StoreError> {
        let Some(mut doc) = self.find_one(id)? else {
            return Ok(None);
        };
        doc.extend(fields);
        self.insert_one(id, &doc)?;
        Ok(Some(doc))
    }

    pub fn delete_one(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tree.remove(id.as_bytes())?.is_some())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .finish()
    }
}

fn decode(bytes: &[u8]) -> Result<Document, StoreError> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Corrupt(format!(
            "expected an object, found {other}"
        ))),
    }
}

//! Persistent Identifier Store
//!
//! Small named string values that outlive the process, such as the id of
//! the active cart.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CartError;

/// Durable key-value storage for identifiers.
pub trait IdentifierStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, CartError>;

    fn set(&self, name: &str, value: &str) -> Result<(), CartError>;

    fn remove(&self, name: &str) -> Result<(), CartError>;
}

// == File Store ==
/// Keeps all identifiers in one JSON object on disk.
///
/// Every write rewrites the file. A missing file reads as empty.
#[derive(Debug)]
pub struct FileIdentifierStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileIdentifierStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, CartError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(values)?)?;
        debug!(path = %self.path.display(), "Identifier store written");
        Ok(())
    }
}

impl IdentifierStore for FileIdentifierStore {
    fn get(&self, name: &str) -> Result<Option<String>, CartError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(name))
    }

    fn set(&self, name: &str, value: &str) -> Result<(), CartError> {
        let _guard = self.lock.lock();
        let mut values = self.load()?;
        values.insert(name.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, name: &str) -> Result<(), CartError> {
        let _guard = self.lock.lock();
        let mut values = self.load()?;
        if values.remove(name).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

// == Memory Store ==
#[derive(Debug, Default)]
pub struct MemoryIdentifierStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryIdentifierStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentifierStore for MemoryIdentifierStore {
    fn get(&self, name: &str) -> Result<Option<String>, CartError> {
        Ok(self.values.lock().get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), CartError> {
        self.values
            .lock()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), CartError> {
        self.values.lock().remove(name);
        Ok(())
    }
}

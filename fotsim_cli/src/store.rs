//! File-backed student record store.

use std::error::Error;
use std::path::PathBuf;

use fotsim_traits::StudentStore;

/// Stores the serialized record as a single JSON file, replacing it on save.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StudentStore for JsonFileStore {
    fn save(&mut self, serialized: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }
}

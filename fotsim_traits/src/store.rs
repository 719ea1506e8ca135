/// Persistence seam for the student record.
///
/// The core decides what gets serialized; implementations only move opaque
/// serialized text in and out of whatever backing store they own (a JSON file
/// in the CLI). Keeping the trait string-based leaves this crate dependency-free.
pub trait StudentStore {
    /// Persist the serialized record, replacing any previous one.
    fn save(&mut self, serialized: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Load the previously saved record, or `None` when nothing was saved yet.
    fn load(&mut self) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Option<String>,
}

impl StudentStore for MemoryStore {
    fn save(&mut self, serialized: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.saved = Some(serialized.to_string());
        Ok(())
    }

    fn load(&mut self) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.saved.clone())
    }
}

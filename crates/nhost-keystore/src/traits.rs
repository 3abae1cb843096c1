//! Storage trait definitions.

use crate::StorageResult;

/// Trait for secure storage backends.
///
/// The session core treats this as an opaque key-value store; callers must
/// not assume anything about how a backend encrypts or namespaces entries.
pub trait SecureStorage: Send + Sync {
    /// Store a value securely
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value, returning whether it existed
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

// A shared handle to a backend is itself a backend. Lets one store be both
// owned by a client and observed by its creator.
impl<T: SecureStorage + ?Sized> SecureStorage for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }
}

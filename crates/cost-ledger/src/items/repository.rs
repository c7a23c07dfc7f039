use super::domain::{Item, StoredItem};

/// Storage abstraction so the ledger service can be exercised in isolation.
///
/// Rows are keyed by [`MergeKey`](super::domain::MergeKey): writing an item whose key already
/// exists adds its quantity to the existing row instead of creating a second one.
pub trait ItemRepository: Send + Sync {
    /// Stores every item or none of them.
    fn insert_batch(&self, items: &[Item]) -> Result<(), RepositoryError>;
    /// Newest first.
    fn list(&self, limit: usize) -> Result<Vec<StoredItem>, RepositoryError>;
    fn fetch(&self, id: i64) -> Result<Option<StoredItem>, RepositoryError>;
    /// Rewrites row `id`. Returns the surviving row and whether it merged into another one.
    fn update(&self, id: i64, item: &Item) -> Result<(StoredItem, bool), RepositoryError>;
    fn delete(&self, id: i64) -> Result<(), RepositoryError>;
    fn delete_all(&self) -> Result<(), RepositoryError>;
    fn all(&self) -> Result<Vec<StoredItem>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("item not found")]
    NotFound,
    #[error("merged quantity is too large")]
    QuantityOverflow,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

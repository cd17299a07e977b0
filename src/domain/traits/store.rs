use crate::application::errors::StorageError;
use crate::domain::entities::DeferredAction;

/// ActionStore trait - persistence seam for one deferred-action queue.
///
/// Calls are synchronous; the backing store is expected to answer without
/// network round-trips, and callers keep the critical section short.
pub trait ActionStore<A: DeferredAction>: Send + Sync {
    /// Inserts or replaces the row identified by this action's key.
    fn upsert(&self, action: &A) -> Result<(), StorageError>;

    fn remove(&self, key: &A::Key) -> Result<(), StorageError>;

    fn load_all(&self) -> Result<Vec<A>, StorageError>;
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use super::domain::ManuscriptId;
use super::repository::RepositoryError;

/// Serializes assignment writes per manuscript.
#[derive(Default)]
pub struct ManuscriptLocks {
    locks: Mutex<HashMap<ManuscriptId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ManuscriptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: ManuscriptId) -> Result<OwnedMutexGuard<()>, RepositoryError> {
        let lock = {
            let mut guard = self
                .locks
                .lock()
                .map_err(|_| RepositoryError::Unavailable("manuscript lock table poisoned".into()))?;
            Arc::clone(guard.entry(id).or_default())
        };
        Ok(lock.lock_owned().await)
    }
}

//! Mutex-backed repositories used by the demo, fixture seeding and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    AssignmentId, Manuscript, ManuscriptId, ManuscriptStatus, ReviewAssignment, ReviewStatus,
    ReviewerId,
};
use super::profile::ReviewerProfile;
use super::repository::{
    AssignmentDelta, AssignmentFilter, ManuscriptRepository, NewAssignment, RepositoryError,
    ReviewAssignmentRepository, ReviewerProfileRepository,
};

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} lock poisoned")))
}

#[derive(Default)]
pub struct InMemoryManuscripts {
    records: Mutex<BTreeMap<ManuscriptId, Manuscript>>,
}

impl InMemoryManuscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, manuscript: Manuscript) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "manuscript")?;
        if guard.contains_key(&manuscript.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(manuscript.id, manuscript);
        Ok(())
    }
}

impl ManuscriptRepository for InMemoryManuscripts {
    fn get(&self, id: ManuscriptId) -> Result<Option<Manuscript>, RepositoryError> {
        let guard = lock(&self.records, "manuscript")?;
        Ok(guard.get(&id).cloned())
    }

    fn list_by_status(&self, status: ManuscriptStatus) -> Result<Vec<Manuscript>, RepositoryError> {
        let guard = lock(&self.records, "manuscript")?;
        Ok(guard
            .values()
            .filter(|manuscript| manuscript.status == status)
            .cloned()
            .collect())
    }

    fn update_status(
        &self,
        id: ManuscriptId,
        status: ManuscriptStatus,
        expected: ManuscriptStatus,
        decided_by: Option<ReviewerId>,
    ) -> Result<Manuscript, RepositoryError> {
        let mut guard = lock(&self.records, "manuscript")?;
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != expected {
            return Err(RepositoryError::StaleState {
                expected: expected.label().to_string(),
                actual: record.status.label().to_string(),
            });
        }
        record.status = status;
        if decided_by.is_some() {
            record.decided_by = decided_by;
            record.decided_at = Some(Utc::now());
        }
        Ok(record.clone())
    }
}

#[derive(Default)]
pub struct InMemoryProfiles {
    records: Mutex<BTreeMap<ReviewerId, ReviewerProfile>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a profile.
    pub fn upsert(&self, profile: ReviewerProfile) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "profile")?;
        guard.insert(profile.identity.clone(), profile);
        Ok(())
    }
}

impl ReviewerProfileRepository for InMemoryProfiles {
    fn get(&self, identity: &ReviewerId) -> Result<Option<ReviewerProfile>, RepositoryError> {
        let guard = lock(&self.records, "profile")?;
        Ok(guard.get(identity).cloned())
    }

    fn list_all(&self) -> Result<Vec<ReviewerProfile>, RepositoryError> {
        let guard = lock(&self.records, "profile")?;
        Ok(guard.values().cloned().collect())
    }
}

pub struct InMemoryAssignments {
    records: Mutex<HashMap<AssignmentId, ReviewAssignment>>,
    sequence: AtomicU64,
}

impl Default for InMemoryAssignments {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }
}

impl InMemoryAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully formed record as-is, e.g. from fixtures.
    pub fn seed(&self, record: ReviewAssignment) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records, "assignment")?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        self.sequence.fetch_max(record.id.0 + 1, Ordering::Relaxed);
        guard.insert(record.id, record);
        Ok(())
    }
}

impl ReviewAssignmentRepository for InMemoryAssignments {
    fn create(&self, record: NewAssignment) -> Result<ReviewAssignment, RepositoryError> {
        let mut guard = lock(&self.records, "assignment")?;
        let id = AssignmentId(self.sequence.fetch_add(1, Ordering::Relaxed));
        let stored = ReviewAssignment {
            id,
            manuscript_id: record.manuscript_id,
            reviewer: record.reviewer,
            editor: record.editor,
            status: record.status,
            deadline: record.deadline,
            created_at: record.created_at,
            assigned_at: record.assigned_at,
            completed_at: None,
            comments: None,
            confidential_comments: None,
            recommendation: None,
            editor_notes: None,
        };
        guard.insert(id, stored.clone());
        Ok(stored)
    }

    fn get(&self, id: AssignmentId) -> Result<Option<ReviewAssignment>, RepositoryError> {
        let guard = lock(&self.records, "assignment")?;
        Ok(guard.get(&id).cloned())
    }

    fn by_manuscript(&self, id: ManuscriptId) -> Result<Vec<ReviewAssignment>, RepositoryError> {
        let guard = lock(&self.records, "assignment")?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| record.manuscript_id == id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn update(
        &self,
        id: AssignmentId,
        delta: AssignmentDelta,
        expected: ReviewStatus,
    ) -> Result<ReviewAssignment, RepositoryError> {
        let mut guard = lock(&self.records, "assignment")?;
        let record = guard.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.status != expected {
            return Err(RepositoryError::StaleState {
                expected: expected.label().to_string(),
                actual: record.status.label().to_string(),
            });
        }
        delta.apply_to(record);
        Ok(record.clone())
    }

    fn list(&self, filter: &AssignmentFilter) -> Result<Vec<ReviewAssignment>, RepositoryError> {
        let guard = lock(&self.records, "assignment")?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.deadline
                .cmp(&b.deadline)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

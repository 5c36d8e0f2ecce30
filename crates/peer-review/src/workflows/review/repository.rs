use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AssignmentId, Manuscript, ManuscriptId, ManuscriptStatus, Recommendation, ReviewAssignment,
    ReviewStatus, ReviewerId,
};
use super::profile::ReviewerProfile;

/// Manuscript storage as seen by the review workflow.
pub trait ManuscriptRepository: Send + Sync {
    fn get(&self, id: ManuscriptId) -> Result<Option<Manuscript>, RepositoryError>;
    fn list_by_status(&self, status: ManuscriptStatus) -> Result<Vec<Manuscript>, RepositoryError>;
    /// Conditional status change; fails with `StaleState` when the stored status differs.
    fn update_status(
        &self,
        id: ManuscriptId,
        status: ManuscriptStatus,
        expected: ManuscriptStatus,
        decided_by: Option<ReviewerId>,
    ) -> Result<Manuscript, RepositoryError>;
}

/// Source of reviewer profiles and of the candidate pool.
pub trait ReviewerProfileRepository: Send + Sync {
    fn get(&self, identity: &ReviewerId) -> Result<Option<ReviewerProfile>, RepositoryError>;
    fn list_all(&self) -> Result<Vec<ReviewerProfile>, RepositoryError>;
}

/// Review records. Updates are compare-and-swap on the record's current status.
pub trait ReviewAssignmentRepository: Send + Sync {
    fn create(&self, record: NewAssignment) -> Result<ReviewAssignment, RepositoryError>;
    fn get(&self, id: AssignmentId) -> Result<Option<ReviewAssignment>, RepositoryError>;
    fn by_manuscript(&self, id: ManuscriptId) -> Result<Vec<ReviewAssignment>, RepositoryError>;
    fn update(
        &self,
        id: AssignmentId,
        delta: AssignmentDelta,
        expected: ReviewStatus,
    ) -> Result<ReviewAssignment, RepositoryError>;
    /// Ordered by deadline ascending, then newest first; `limit` applies after ordering.
    fn list(&self, filter: &AssignmentFilter) -> Result<Vec<ReviewAssignment>, RepositoryError>;
}

/// Values for a record about to be created; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub manuscript_id: ManuscriptId,
    pub reviewer: Option<ReviewerId>,
    pub editor: Option<ReviewerId>,
    pub status: ReviewStatus,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Field-level changes applied atomically by `ReviewAssignmentRepository::update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentDelta {
    pub status: Option<ReviewStatus>,
    pub reviewer: Option<ReviewerId>,
    pub editor: Option<ReviewerId>,
    pub deadline: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub confidential_comments: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub editor_notes: Option<String>,
}

impl AssignmentDelta {
    pub fn apply_to(self, record: &mut ReviewAssignment) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(reviewer) = self.reviewer {
            record.reviewer = Some(reviewer);
        }
        if let Some(editor) = self.editor {
            record.editor = Some(editor);
        }
        if let Some(deadline) = self.deadline {
            record.deadline = deadline;
        }
        if let Some(at) = self.assigned_at {
            record.assigned_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            record.completed_at = Some(at);
        }
        if let Some(comments) = self.comments {
            record.comments = Some(comments);
        }
        if let Some(comments) = self.confidential_comments {
            record.confidential_comments = Some(comments);
        }
        if let Some(recommendation) = self.recommendation {
            record.recommendation = Some(recommendation);
        }
        if let Some(notes) = self.editor_notes {
            record.editor_notes = Some(notes);
        }
    }
}

/// Query over review records. `overdue_at` keeps only records overdue at that instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentFilter {
    #[serde(default)]
    pub status: Option<ReviewStatus>,
    #[serde(default)]
    pub reviewer: Option<ReviewerId>,
    #[serde(default)]
    pub editor: Option<ReviewerId>,
    #[serde(default)]
    pub overdue_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AssignmentFilter {
    pub fn matches(&self, record: &ReviewAssignment) -> bool {
        if self.status.is_some_and(|status| status != record.status) {
            return false;
        }
        if let Some(reviewer) = &self.reviewer {
            if record.reviewer.as_ref() != Some(reviewer) {
                return false;
            }
        }
        if let Some(editor) = &self.editor {
            if record.editor.as_ref() != Some(editor) {
                return false;
            }
        }
        if let Some(now) = self.overdue_at {
            if !record.is_overdue(now) {
                return false;
            }
        }
        true
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently: expected {expected}, found {actual}")]
    StaleState { expected: String, actual: String },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

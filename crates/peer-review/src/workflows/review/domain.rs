use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted manuscripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManuscriptId(pub u64);

impl fmt::Display for ManuscriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for review assignment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(pub u64);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a person in the system (reviewer, editor or author).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewerId(pub String);

impl ReviewerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManuscriptStatus {
    Submitted,
    UnderReview,
    Published,
    Rejected,
}

impl ManuscriptStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "submitted",
            ManuscriptStatus::UnderReview => "under_review",
            ManuscriptStatus::Published => "published",
            ManuscriptStatus::Rejected => "rejected",
        }
    }

    /// Still accepting reviewers and decisions.
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            ManuscriptStatus::Submitted | ManuscriptStatus::UnderReview
        )
    }
}

/// Manuscript as seen by the review workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: ManuscriptId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub author: ReviewerId,
    pub status: ManuscriptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<ReviewerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
}

impl ReviewStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Assigned => "assigned",
            ReviewStatus::InProgress => "in_progress",
            ReviewStatus::Completed => "completed",
        }
    }

    /// Counts against the reviewer's workload cap.
    pub const fn is_active(self) -> bool {
        matches!(self, ReviewStatus::Assigned | ReviewStatus::InProgress)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    Reject,
    MinorRevision,
    MajorRevision,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::Reject => "reject",
            Recommendation::MinorRevision => "minor_revision",
            Recommendation::MajorRevision => "major_revision",
        }
    }
}

/// Raised when caller supplied values cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid recommendation '{0}' (expected accept, reject, minor_revision or major_revision)")]
    Recommendation(String),
    #[error("deadline extension must be between 1 and 3650 days, got {0}")]
    ExtensionDays(i64),
    #[error("review window must be between 1 and 3650 days, got {0}")]
    ReviewWindow(i64),
    #[error("a panel needs at least {required} distinct reviewers, got {supplied}")]
    PanelTooSmall { required: usize, supplied: usize },
    #[error("{0}")]
    Profile(String),
}

impl FromStr for Recommendation {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "accept" => Ok(Recommendation::Accept),
            "reject" => Ok(Recommendation::Reject),
            "minor_revision" => Ok(Recommendation::MinorRevision),
            "major_revision" => Ok(Recommendation::MajorRevision),
            _ => Err(ValidationError::Recommendation(value.to_string())),
        }
    }
}

/// Persistent review record. Never deleted, only transitioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: AssignmentId,
    pub manuscript_id: ManuscriptId,
    pub reviewer: Option<ReviewerId>,
    pub editor: Option<ReviewerId>,
    pub status: ReviewStatus,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
    pub confidential_comments: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub editor_notes: Option<String>,
}

impl ReviewAssignment {
    /// Derived, never stored.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != ReviewStatus::Completed && self.deadline < now
    }

    /// Whole days remaining, rounded up. Negative once the deadline has passed.
    pub fn days_until_deadline(&self, now: DateTime<Utc>) -> i64 {
        let remaining = (self.deadline - now).num_seconds();
        let day = 86_400;
        if remaining > 0 {
            (remaining + day - 1) / day
        } else {
            remaining / day
        }
    }

    pub fn is_held_by(&self, reviewer: &ReviewerId) -> bool {
        self.reviewer.as_ref() == Some(reviewer)
    }

    pub fn view(&self, now: DateTime<Utc>) -> AssignmentView {
        AssignmentView {
            is_overdue: self.is_overdue(now),
            days_until_deadline: self.days_until_deadline(now),
            assignment: self.clone(),
        }
    }
}

/// Assignment plus the derived deadline fields exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: ReviewAssignment,
    pub is_overdue: bool,
    pub days_until_deadline: i64,
}

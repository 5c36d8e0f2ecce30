//! Review assignment state machine: Pending → Assigned → InProgress → Completed.
//!
//! Transitions are computed as pure `Transition` values and applied with a
//! compare-and-swap on the record's current status, so two concurrent writers can never
//! both move the same record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use super::domain::{
    ManuscriptId, Recommendation, ReviewAssignment, ReviewStatus, ReviewerId,
};
use super::repository::{
    AssignmentDelta, NewAssignment, RepositoryError, ReviewAssignmentRepository,
};

/// Delta to apply, guarded by the status the record must still have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub expected: ReviewStatus,
    pub delta: AssignmentDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("review is {actual}, only pending reviews can be assigned")]
    NotPending { actual: ReviewStatus },
    #[error("review is already assigned to {reviewer}")]
    AlreadyAssigned { reviewer: ReviewerId },
    #[error("review has not been started; assign a reviewer or save a draft first")]
    NotStarted,
    #[error("review is already completed")]
    AlreadyCompleted,
    #[error("deadline falls outside the supported calendar range")]
    DeadlineOutOfRange,
}

fn deadline_after(start: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, TransitionError> {
    start
        .checked_add_signed(window)
        .ok_or(TransitionError::DeadlineOutOfRange)
}

/// Reviewer decision captured at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub comments: Option<String>,
    pub confidential_comments: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftUpdate {
    pub comments: Option<String>,
    pub confidential_comments: Option<String>,
}

pub fn create(
    manuscript_id: ManuscriptId,
    reviewer: Option<ReviewerId>,
    editor: Option<ReviewerId>,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<NewAssignment, TransitionError> {
    let assigned = reviewer.is_some();
    Ok(NewAssignment {
        manuscript_id,
        reviewer,
        editor,
        status: if assigned {
            ReviewStatus::Assigned
        } else {
            ReviewStatus::Pending
        },
        deadline: deadline_after(now, window)?,
        created_at: now,
        assigned_at: assigned.then_some(now),
    })
}

/// Fill a pending slot. The deadline restarts from the moment of assignment.
pub fn assign(
    record: &ReviewAssignment,
    reviewer: &ReviewerId,
    editor: Option<&ReviewerId>,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    if let Some(current) = &record.reviewer {
        return Err(TransitionError::AlreadyAssigned {
            reviewer: current.clone(),
        });
    }
    if record.status != ReviewStatus::Pending {
        return Err(TransitionError::NotPending {
            actual: record.status,
        });
    }

    Ok(Transition {
        expected: ReviewStatus::Pending,
        delta: AssignmentDelta {
            status: Some(ReviewStatus::Assigned),
            reviewer: Some(reviewer.clone()),
            editor: editor.cloned(),
            deadline: Some(deadline_after(now, window)?),
            assigned_at: Some(now),
            ..AssignmentDelta::default()
        },
    })
}

pub fn save_draft(
    record: &ReviewAssignment,
    update: DraftUpdate,
) -> Result<Transition, TransitionError> {
    let status = match record.status {
        ReviewStatus::Completed => return Err(TransitionError::AlreadyCompleted),
        ReviewStatus::Pending => Some(ReviewStatus::InProgress),
        ReviewStatus::Assigned | ReviewStatus::InProgress => None,
    };

    Ok(Transition {
        expected: record.status,
        delta: AssignmentDelta {
            status,
            comments: update.comments,
            confidential_comments: update.confidential_comments,
            ..AssignmentDelta::default()
        },
    })
}

/// Record the reviewer's decision. Eligibility is checked by the caller.
pub fn complete(
    record: &ReviewAssignment,
    reviewer: &ReviewerId,
    decision: Decision,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    match record.status {
        ReviewStatus::Completed => return Err(TransitionError::AlreadyCompleted),
        ReviewStatus::Pending => return Err(TransitionError::NotStarted),
        ReviewStatus::Assigned | ReviewStatus::InProgress => {}
    }

    Ok(Transition {
        expected: record.status,
        delta: AssignmentDelta {
            status: Some(ReviewStatus::Completed),
            reviewer: record.reviewer.is_none().then(|| reviewer.clone()),
            completed_at: Some(now),
            comments: decision.comments,
            confidential_comments: decision.confidential_comments,
            recommendation: Some(decision.recommendation),
            ..AssignmentDelta::default()
        },
    })
}

pub fn extend_deadline(
    record: &ReviewAssignment,
    extension: Duration,
    reason: Option<String>,
) -> Result<Transition, TransitionError> {
    if record.status == ReviewStatus::Completed {
        return Err(TransitionError::AlreadyCompleted);
    }

    Ok(Transition {
        expected: record.status,
        delta: AssignmentDelta {
            deadline: Some(deadline_after(record.deadline, extension)?),
            editor_notes: reason,
            ..AssignmentDelta::default()
        },
    })
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Applies lifecycle transitions against the assignment repository.
pub struct ReviewLifecycle<A> {
    assignments: Arc<A>,
}

impl<A> Clone for ReviewLifecycle<A> {
    fn clone(&self) -> Self {
        Self {
            assignments: Arc::clone(&self.assignments),
        }
    }
}

impl<A> ReviewLifecycle<A>
where
    A: ReviewAssignmentRepository,
{
    pub fn new(assignments: Arc<A>) -> Self {
        Self { assignments }
    }

    pub fn open(&self, record: NewAssignment) -> Result<ReviewAssignment, LifecycleError> {
        let stored = self.assignments.create(record)?;
        info!(
            assignment_id = %stored.id,
            manuscript_id = %stored.manuscript_id,
            status = stored.status.label(),
            "review record opened"
        );
        Ok(stored)
    }

    pub fn assign(
        &self,
        record: &ReviewAssignment,
        reviewer: &ReviewerId,
        editor: Option<&ReviewerId>,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<ReviewAssignment, LifecycleError> {
        let transition = assign(record, reviewer, editor, window, now)?;
        self.apply(record, transition)
    }

    pub fn save_draft(
        &self,
        record: &ReviewAssignment,
        update: DraftUpdate,
    ) -> Result<ReviewAssignment, LifecycleError> {
        let transition = save_draft(record, update)?;
        self.apply(record, transition)
    }

    pub fn complete(
        &self,
        record: &ReviewAssignment,
        reviewer: &ReviewerId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<ReviewAssignment, LifecycleError> {
        let transition = complete(record, reviewer, decision, now)?;
        self.apply(record, transition)
    }

    pub fn extend_deadline(
        &self,
        record: &ReviewAssignment,
        extension: Duration,
        reason: Option<String>,
    ) -> Result<ReviewAssignment, LifecycleError> {
        let transition = extend_deadline(record, extension, reason)?;
        self.apply(record, transition)
    }

    fn apply(
        &self,
        record: &ReviewAssignment,
        transition: Transition,
    ) -> Result<ReviewAssignment, LifecycleError> {
        let updated = self
            .assignments
            .update(record.id, transition.delta, transition.expected)?;
        if updated.status != record.status {
            info!(
                assignment_id = %updated.id,
                manuscript_id = %updated.manuscript_id,
                from = record.status.label(),
                to = updated.status.label(),
                "review transitioned"
            );
        }
        Ok(updated)
    }
}

use std::sync::Arc;

use super::domain::ReviewerId;
use super::repository::{AssignmentFilter, RepositoryError, ReviewAssignmentRepository};

/// Counts a reviewer's active (Assigned or InProgress) reviews. Read-only.
pub struct WorkloadTracker<A> {
    assignments: Arc<A>,
}

impl<A> Clone for WorkloadTracker<A> {
    fn clone(&self) -> Self {
        Self {
            assignments: Arc::clone(&self.assignments),
        }
    }
}

impl<A> WorkloadTracker<A>
where
    A: ReviewAssignmentRepository,
{
    pub fn new(assignments: Arc<A>) -> Self {
        Self { assignments }
    }

    pub fn current_load(&self, reviewer: &ReviewerId) -> Result<usize, RepositoryError> {
        let filter = AssignmentFilter {
            reviewer: Some(reviewer.clone()),
            ..AssignmentFilter::default()
        };
        let records = self.assignments.list(&filter)?;
        Ok(records
            .iter()
            .filter(|record| record.status.is_active())
            .count())
    }

    pub fn is_at_capacity(&self, reviewer: &ReviewerId, cap: usize) -> Result<bool, RepositoryError> {
        Ok(self.current_load(reviewer)? >= cap)
    }
}

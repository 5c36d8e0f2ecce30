use std::sync::Arc;

use chrono::Duration;

use super::common::*;

use crate::workflows::review::domain::{Recommendation, ReviewStatus};
use crate::workflows::review::lifecycle::{
    self, Decision, DraftUpdate, LifecycleError, ReviewLifecycle, TransitionError,
};
use crate::workflows::review::memory::InMemoryAssignments;
use crate::workflows::review::repository::{
    AssignmentFilter, RepositoryError, ReviewAssignmentRepository,
};

fn accept() -> Decision {
    Decision {
        recommendation: Recommendation::Accept,
        comments: Some("Sound methodology.".to_string()),
        confidential_comments: None,
    }
}

#[test]
fn create_without_reviewer_is_pending_for_thirty_days() {
    let new = lifecycle::create(MANUSCRIPT, None, None, Duration::days(30), fixed_now())
        .expect("window fits");
    assert_eq!(new.status, ReviewStatus::Pending);
    assert_eq!(new.deadline, fixed_now() + Duration::days(30));
    assert!(new.assigned_at.is_none());

    let assigned = lifecycle::create(
        MANUSCRIPT,
        Some(reviewer("rev-alice")),
        None,
        Duration::days(14),
        fixed_now(),
    )
    .expect("window fits");
    assert_eq!(assigned.status, ReviewStatus::Assigned);
    assert_eq!(assigned.assigned_at, Some(fixed_now()));
}

#[test]
fn assign_requires_an_unassigned_pending_record() {
    let pending = record(1, None, ReviewStatus::Pending, None);
    let transition = lifecycle::assign(
        &pending,
        &reviewer("rev-alice"),
        Some(&reviewer(EDITOR)),
        Duration::days(30),
        fixed_now(),
    )
    .expect("pending can be assigned");
    assert_eq!(transition.expected, ReviewStatus::Pending);
    assert_eq!(transition.delta.status, Some(ReviewStatus::Assigned));
    assert_eq!(transition.delta.deadline, Some(fixed_now() + Duration::days(30)));

    let taken = record(2, Some("rev-bruno"), ReviewStatus::Assigned, None);
    let err = lifecycle::assign(
        &taken,
        &reviewer("rev-alice"),
        None,
        Duration::days(30),
        fixed_now(),
    )
    .expect_err("already held");
    assert_eq!(
        err,
        TransitionError::AlreadyAssigned {
            reviewer: reviewer("rev-bruno")
        }
    );

    let drafted = record(3, None, ReviewStatus::InProgress, None);
    let err = lifecycle::assign(
        &drafted,
        &reviewer("rev-alice"),
        None,
        Duration::days(30),
        fixed_now(),
    )
    .expect_err("not pending");
    assert_eq!(
        err,
        TransitionError::NotPending {
            actual: ReviewStatus::InProgress
        }
    );
}

#[test]
fn draft_promotes_pending_only() {
    let update = DraftUpdate {
        comments: Some("first pass".to_string()),
        confidential_comments: None,
    };

    let pending = record(1, None, ReviewStatus::Pending, None);
    let transition = lifecycle::save_draft(&pending, update.clone()).expect("draft");
    assert_eq!(transition.delta.status, Some(ReviewStatus::InProgress));

    let assigned = record(2, Some("rev-alice"), ReviewStatus::Assigned, None);
    let transition = lifecycle::save_draft(&assigned, update.clone()).expect("draft");
    assert_eq!(transition.delta.status, None);
    assert_eq!(transition.delta.comments.as_deref(), Some("first pass"));

    let done = record(3, Some("rev-alice"), ReviewStatus::Completed, Some(Recommendation::Accept));
    assert_eq!(
        lifecycle::save_draft(&done, update),
        Err(TransitionError::AlreadyCompleted)
    );
}

#[test]
fn completion_requires_a_started_review() {
    let pending = record(1, None, ReviewStatus::Pending, None);
    assert_eq!(
        lifecycle::complete(&pending, &reviewer("rev-alice"), accept(), fixed_now()),
        Err(TransitionError::NotStarted)
    );

    let done = record(2, Some("rev-alice"), ReviewStatus::Completed, Some(Recommendation::Accept));
    assert_eq!(
        lifecycle::complete(&done, &reviewer("rev-alice"), accept(), fixed_now()),
        Err(TransitionError::AlreadyCompleted)
    );

    let drafted = record(3, None, ReviewStatus::InProgress, None);
    let transition = lifecycle::complete(&drafted, &reviewer("rev-alice"), accept(), fixed_now())
        .expect("drafted review can be completed");
    assert_eq!(transition.delta.reviewer, Some(reviewer("rev-alice")));
    assert_eq!(transition.delta.recommendation, Some(Recommendation::Accept));
    assert_eq!(transition.delta.completed_at, Some(fixed_now()));
}

#[test]
fn extension_moves_the_deadline_and_keeps_the_state() {
    let assigned = record(1, Some("rev-alice"), ReviewStatus::Assigned, None);
    let transition = lifecycle::extend_deadline(
        &assigned,
        Duration::days(7),
        Some("reviewer travelling".to_string()),
    )
    .expect("extend");
    assert_eq!(transition.delta.deadline, Some(assigned.deadline + Duration::days(7)));
    assert_eq!(transition.delta.status, None);
    assert_eq!(transition.delta.editor_notes.as_deref(), Some("reviewer travelling"));

    let done = record(2, Some("rev-alice"), ReviewStatus::Completed, Some(Recommendation::Reject));
    assert_eq!(
        lifecycle::extend_deadline(&done, Duration::days(7), None),
        Err(TransitionError::AlreadyCompleted)
    );
}

#[test]
fn deadlines_past_the_calendar_are_rejected() {
    let huge = Duration::days(1_000_000_000);

    assert_eq!(
        lifecycle::create(MANUSCRIPT, None, None, huge, fixed_now()),
        Err(TransitionError::DeadlineOutOfRange)
    );

    let pending = record(1, None, ReviewStatus::Pending, None);
    assert_eq!(
        lifecycle::assign(&pending, &reviewer("rev-alice"), None, huge, fixed_now()),
        Err(TransitionError::DeadlineOutOfRange)
    );

    let assigned = record(2, Some("rev-alice"), ReviewStatus::Assigned, None);
    assert_eq!(
        lifecycle::extend_deadline(&assigned, huge, None),
        Err(TransitionError::DeadlineOutOfRange)
    );
}

#[test]
fn stale_writers_lose_the_compare_and_swap() {
    let assignments = Arc::new(InMemoryAssignments::new());
    assignments
        .seed(record(1, Some("rev-alice"), ReviewStatus::Assigned, None))
        .expect("seed");
    let lifecycle = ReviewLifecycle::new(Arc::clone(&assignments));
    let snapshot = assignments
        .get(crate::workflows::review::AssignmentId(1))
        .expect("lookup")
        .expect("present");

    let first = lifecycle
        .complete(&snapshot, &reviewer("rev-alice"), accept(), fixed_now())
        .expect("first submission wins");
    assert_eq!(first.status, ReviewStatus::Completed);

    let second = lifecycle.complete(&snapshot, &reviewer("rev-alice"), accept(), fixed_now());
    assert!(matches!(
        second,
        Err(LifecycleError::Repository(RepositoryError::StaleState { .. }))
    ));
}

#[test]
fn overdue_is_derived_from_the_deadline() {
    let now = fixed_now();
    let mut late = record(1, Some("rev-alice"), ReviewStatus::Assigned, None);
    late.deadline = now - Duration::hours(36);
    let view = late.view(now);
    assert!(view.is_overdue);
    assert_eq!(view.days_until_deadline, -1);

    let mut soon = record(2, Some("rev-bruno"), ReviewStatus::InProgress, None);
    soon.deadline = now + Duration::hours(30);
    let view = soon.view(now);
    assert!(!view.is_overdue);
    assert_eq!(view.days_until_deadline, 2);

    let mut done = record(3, Some("rev-chen"), ReviewStatus::Completed, Some(Recommendation::Accept));
    done.deadline = now - Duration::days(3);
    assert!(!done.is_overdue(now));
}

#[test]
fn listing_orders_by_deadline_then_newest_and_limits() {
    let assignments = InMemoryAssignments::new();
    let now = fixed_now();

    let mut early = record(1, Some("rev-alice"), ReviewStatus::Assigned, None);
    early.deadline = now - Duration::days(2);
    let mut tie_old = record(2, Some("rev-bruno"), ReviewStatus::Assigned, None);
    tie_old.deadline = now + Duration::days(5);
    tie_old.created_at = now - Duration::days(20);
    let mut tie_new = record(3, Some("rev-chen"), ReviewStatus::Assigned, None);
    tie_new.deadline = now + Duration::days(5);
    tie_new.created_at = now - Duration::days(1);
    for record in [tie_old, early, tie_new] {
        assignments.seed(record).expect("seed");
    }

    let all = assignments
        .list(&AssignmentFilter::default())
        .expect("list");
    let ids: Vec<u64> = all.iter().map(|record| record.id.0).collect();
    assert_eq!(ids, vec![1, 3, 2]);

    let overdue = assignments
        .list(&AssignmentFilter {
            overdue_at: Some(now),
            ..AssignmentFilter::default()
        })
        .expect("list");
    assert_eq!(overdue.len(), 1);

    let limited = assignments
        .list(&AssignmentFilter {
            reviewer: Some(reviewer("rev-chen")),
            limit: Some(1),
            ..AssignmentFilter::default()
        })
        .expect("list");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id.0, 3);
}

use std::sync::Arc;
use std::time::Duration;

use super::common::*;

use crate::workflows::review::domain::{ManuscriptStatus, ReviewStatus};
use crate::workflows::review::oracle::{OracleError, OracleTier};
use crate::workflows::review::policy::AssignmentStrategy;
use crate::workflows::review::profile::Publication;
use crate::workflows::review::repository::{ManuscriptRepository, ReviewAssignmentRepository};
use crate::workflows::review::selection::AssignmentError;
use crate::workflows::review::service::ReviewServiceError;

fn assignment_error(err: ReviewServiceError) -> AssignmentError {
    match err {
        ReviewServiceError::Assignment(inner) => inner,
        other => panic!("expected an assignment error, got {other:?}"),
    }
}

#[tokio::test]
async fn deterministic_assignment_prefers_the_least_loaded_reviewer() {
    let harness = Harness::new();
    harness.load_reviewer("rev-alice", 2, 100);
    let service = harness.service();

    let outcome = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Deterministic))
        .await
        .expect("assignment succeeds");

    assert_eq!(outcome.assignment.reviewer, Some(reviewer("rev-bruno")));
    assert_eq!(outcome.assignment.status, ReviewStatus::Assigned);
    assert_eq!(outcome.strategy, AssignmentStrategy::Deterministic);
    assert!(outcome.justification.starts_with("Assigned to Bruno Tanaka - "));
    assert!(outcome.confidence.is_none());
    assert_eq!(outcome.candidates_evaluated, 6);

    let days = (outcome.assignment.deadline - outcome.assignment.assigned_at.expect("assigned"))
        .num_days();
    assert_eq!(days, 30);

    let manuscript = harness
        .manuscripts
        .get(MANUSCRIPT)
        .expect("lookup")
        .expect("present");
    assert_eq!(manuscript.status, ManuscriptStatus::UnderReview);
}

#[tokio::test]
async fn ties_on_load_go_to_the_stronger_publication_record() {
    let harness = Harness::new();
    let mut dana = qualified_profile("rev-dana", "Dana Okafor");
    dana.publications.push(Publication {
        title: "Graph attention for protein interfaces".to_string(),
        authors: vec!["Dana Okafor".to_string()],
        venue: None,
        date: None,
    });
    harness.add_profile(dana);

    let outcome = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect("assignment succeeds");

    assert_eq!(outcome.reviewer.reviewer, reviewer("rev-dana"));
    assert_eq!(outcome.reviewer.first_author_papers_on_topic, 4);
}

#[tokio::test]
async fn the_author_is_never_selected() {
    let harness = Harness::new();
    for id in ["rev-alice", "rev-bruno", "rev-chen", "rev-dana"] {
        let mut profile = qualified_profile(id, "Placeholder Name");
        profile.available = false;
        harness.add_profile(profile);
    }

    let err = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect_err("only the author is left");

    assert!(matches!(
        assignment_error(err),
        AssignmentError::AllOverloaded { .. }
    ));
}

#[tokio::test]
async fn no_qualified_reviewers_carries_diagnostics_and_writes_nothing() {
    let harness = Harness::without_qualified_reviewers();

    let err = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect_err("nobody qualifies");

    let err = assignment_error(err);
    assert_eq!(err.candidates().len(), 2);
    let ugo = err
        .candidates()
        .iter()
        .find(|candidate| candidate.reviewer == reviewer("rev-ugo"))
        .expect("ugo evaluated");
    assert!(!ugo.eligible);
    assert!(ugo
        .reasons
        .contains(&"only 0 first-author papers on topic, need 3".to_string()));
    assert!(matches!(err, AssignmentError::NoQualifiedReviewers { .. }));
    assert!(harness
        .assignments
        .by_manuscript(MANUSCRIPT)
        .expect("lookup")
        .is_empty());
}

#[tokio::test]
async fn every_qualified_reviewer_at_capacity_is_all_overloaded() {
    let harness = Harness::new();
    for (index, id) in ["rev-alice", "rev-bruno", "rev-chen", "rev-dana"]
        .into_iter()
        .enumerate()
    {
        harness.load_reviewer(id, 3, 100 + index as u64 * 10);
    }
    let service = harness.service();

    let err = service
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect_err("everyone is busy");

    assert!(err.is_retryable());
    assert!(matches!(
        assignment_error(err),
        AssignmentError::AllOverloaded { .. }
    ));
    assert!(harness
        .assignments
        .by_manuscript(MANUSCRIPT)
        .expect("lookup")
        .is_empty());
}

#[tokio::test]
async fn unavailable_reviewers_are_skipped() {
    let harness = Harness::new();
    let mut alice = qualified_profile("rev-alice", "Alice Moreau");
    alice.available = false;
    harness.add_profile(alice);

    let outcome = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect("assignment succeeds");
    assert_eq!(outcome.reviewer.reviewer, reviewer("rev-bruno"));
}

#[tokio::test]
async fn fills_the_open_slot_instead_of_creating_one() {
    let harness = Harness::new();
    harness.seed(live_record(40, MANUSCRIPT, None, ReviewStatus::Pending));

    let outcome = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect("assignment succeeds");

    assert_eq!(outcome.assignment.id.0, 40);
    assert_eq!(
        harness
            .assignments
            .by_manuscript(MANUSCRIPT)
            .expect("lookup")
            .len(),
        1
    );
}

#[tokio::test]
async fn manuscript_without_open_slot_is_already_assigned() {
    let harness = Harness::new();
    harness.seed(live_record(
        40,
        MANUSCRIPT,
        Some("rev-alice"),
        ReviewStatus::Assigned,
    ));

    let err = harness
        .service()
        .auto_assign(MANUSCRIPT, None)
        .await
        .expect_err("slot taken");
    assert!(matches!(
        assignment_error(err),
        AssignmentError::AlreadyAssigned(_)
    ));
}

#[tokio::test]
async fn concurrent_assignments_fill_a_slot_once() {
    let harness = Harness::new();
    harness.seed(live_record(40, MANUSCRIPT, None, ReviewStatus::Pending));
    let service = Arc::new(harness.service());

    let (first, second) = tokio::join!(
        service.auto_assign(MANUSCRIPT, None),
        service.auto_assign(MANUSCRIPT, None)
    );

    let successes = [first.is_ok(), second.is_ok()]
        .into_iter()
        .filter(|ok| *ok)
        .count();
    assert_eq!(successes, 1);

    let records = harness.assignments.by_manuscript(MANUSCRIPT).expect("lookup");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ReviewStatus::Assigned);
}

#[tokio::test]
async fn closed_manuscripts_reject_assignment() {
    let harness = Harness::new();
    let mut published = manuscript(crate::workflows::review::ManuscriptId(2), AUTHOR);
    published.status = ManuscriptStatus::Published;
    harness.add_manuscript(published);

    let err = harness
        .service()
        .auto_assign(crate::workflows::review::ManuscriptId(2), None)
        .await
        .expect_err("closed");
    assert!(matches!(
        assignment_error(err),
        AssignmentError::ManuscriptClosed { .. }
    ));
}

#[tokio::test]
async fn ranking_lists_every_candidate_without_writing() {
    let harness = Harness::new();
    let ranking = harness
        .service()
        .qualified_reviewers(MANUSCRIPT, None)
        .await
        .expect("ranking");

    assert_eq!(ranking.candidates.len(), 6);
    assert_eq!(ranking.qualified().count(), 5);
    let last = ranking.candidates.last().expect("candidates");
    assert_eq!(last.reviewer, reviewer("rev-ugo"));
    assert!(ranking.tier_summary.is_none());
    assert!(harness
        .assignments
        .by_manuscript(MANUSCRIPT)
        .expect("lookup")
        .is_empty());
}

#[tokio::test]
async fn oracle_strategy_picks_the_highest_score() {
    let harness = Harness::new();
    let oracle = ScriptedOracle::default()
        .answer("rev-alice", Ok(verdict(30.0, 25.0, 15.0, OracleTier::Recommended)))
        .answer("rev-bruno", Ok(verdict(38.0, 33.0, 20.0, OracleTier::HighlyRecommended)))
        .answer("rev-chen", Ok(verdict(20.0, 10.0, 10.0, OracleTier::Suitable)))
        .answer("rev-dana", Ok(verdict(5.0, 5.0, 5.0, OracleTier::NotSuitable)));
    let service = harness.service_with_oracle(Arc::new(oracle));

    let outcome = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect("assignment succeeds");

    assert_eq!(outcome.reviewer.reviewer, reviewer("rev-bruno"));
    assert_eq!(outcome.strategy, AssignmentStrategy::Oracle);
    let confidence = outcome.confidence.expect("confidence");
    assert!((confidence - 0.91).abs() < 1e-9);
    assert!(outcome.justification.contains("91.00/100"));

    let summary = outcome.tier_summary.expect("tier summary");
    assert_eq!(summary.get(&OracleTier::HighlyRecommended), Some(&1));
    assert_eq!(summary.get(&OracleTier::NotSuitable), Some(&1));
}

#[tokio::test]
async fn oracle_falls_through_overloaded_top_choice() {
    let harness = Harness::new();
    harness.load_reviewer("rev-bruno", 3, 100);
    let oracle = ScriptedOracle::default()
        .answer("rev-alice", Ok(verdict(30.0, 25.0, 15.0, OracleTier::Recommended)))
        .answer("rev-bruno", Ok(verdict(38.0, 33.0, 20.0, OracleTier::HighlyRecommended)));
    let service = harness.service_with_oracle(Arc::new(oracle));

    let outcome = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect("assignment succeeds");
    assert_eq!(outcome.reviewer.reviewer, reviewer("rev-alice"));
}

#[tokio::test]
async fn failed_oracle_calls_only_drop_that_candidate() {
    let harness = Harness::new();
    let oracle = ScriptedOracle::default()
        .answer("rev-alice", Ok(verdict(30.0, 25.0, 15.0, OracleTier::Recommended)))
        .answer(
            "rev-bruno",
            Err(OracleError::Unavailable("connection reset".to_string())),
        )
        .answer(
            "rev-chen",
            Ok(verdict(40.0, 35.0, 25.0, OracleTier::HighlyRecommended)).map(|mut verdict| {
                verdict.overall_score = 20.0;
                verdict
            }),
        );
    let service = harness.service_with_oracle(Arc::new(oracle));

    let ranking = service
        .qualified_reviewers(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect("ranking");

    let top = &ranking.candidates[0];
    assert_eq!(top.reviewer, reviewer("rev-alice"));

    for id in ["rev-bruno", "rev-chen"] {
        let candidate = ranking
            .candidates
            .iter()
            .find(|candidate| candidate.reviewer == reviewer(id))
            .expect("candidate present");
        assert!(!candidate.eligible);
        assert_eq!(candidate.score, 0.0);
        assert_eq!(
            candidate.reasons,
            vec!["oracle unavailable or invalid response".to_string()]
        );
        assert!(candidate.oracle_error.is_some());
        assert!(candidate.qualification.is_some());
    }
}

#[tokio::test]
async fn slow_oracle_calls_time_out_without_blocking_others() {
    let mut harness = Harness::new();
    harness.policy.oracle_timeout = Duration::from_millis(50);
    let oracle = ScriptedOracle::default()
        .answer("rev-alice", Ok(verdict(30.0, 25.0, 15.0, OracleTier::Recommended)))
        .answer("rev-bruno", Ok(verdict(38.0, 33.0, 20.0, OracleTier::HighlyRecommended)))
        .delay("rev-bruno", Duration::from_secs(5));
    let service = harness.service_with_oracle(Arc::new(oracle));

    let started = std::time::Instant::now();
    let outcome = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect("assignment succeeds");

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.reviewer.reviewer, reviewer("rev-alice"));
}

#[tokio::test]
async fn oracle_failing_everywhere_is_retryable() {
    let harness = Harness::new();
    let oracle = Arc::new(ScriptedOracle::default());
    let service = harness.service_with_oracle(oracle.clone());

    let err = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect_err("oracle down");

    assert!(err.is_retryable());
    assert_eq!(oracle.calls(), 6);
    assert!(matches!(
        assignment_error(err),
        AssignmentError::OracleUnavailable { .. }
    ));

    let fallback = service
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Deterministic))
        .await
        .expect("deterministic retry succeeds");
    assert_eq!(fallback.strategy, AssignmentStrategy::Deterministic);
}

#[tokio::test]
async fn oracle_strategy_requires_an_oracle() {
    let harness = Harness::new();
    let err = harness
        .service()
        .auto_assign(MANUSCRIPT, Some(AssignmentStrategy::Oracle))
        .await
        .expect_err("not configured");
    assert!(matches!(
        assignment_error(err),
        AssignmentError::OracleNotConfigured
    ));
}

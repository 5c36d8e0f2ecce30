use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::super::domain::Manuscript;
use super::super::policy::AssignmentStrategy;
use super::super::qualification::{ManuscriptTopics, QualificationEvaluator};
use super::pool::scan;
use super::{Candidate, CandidateEvaluator, RankedCandidate};

/// Ranks qualified candidates by workload, then on-topic expertise.
pub struct DeterministicEvaluator {
    qualification: Arc<QualificationEvaluator>,
    workers: usize,
}

impl DeterministicEvaluator {
    pub fn new(qualification: Arc<QualificationEvaluator>, workers: usize) -> Self {
        Self {
            qualification,
            workers,
        }
    }
}

#[async_trait]
impl CandidateEvaluator for DeterministicEvaluator {
    fn strategy(&self) -> AssignmentStrategy {
        AssignmentStrategy::Deterministic
    }

    async fn evaluate(&self, pool: Vec<Candidate>, manuscript: &Manuscript) -> Vec<RankedCandidate> {
        let topics = Arc::new(ManuscriptTopics::from_manuscript(manuscript));
        let evaluator = Arc::clone(&self.qualification);
        let fallback: Vec<Candidate> = pool.clone();

        let results = scan(pool, self.workers, move |candidate: Candidate| {
            let evaluator = Arc::clone(&evaluator);
            let topics = Arc::clone(&topics);
            async move {
                let qualification = evaluator.evaluate(&candidate.profile, &topics);
                RankedCandidate::from_qualification(&candidate, qualification)
            }
        })
        .await;

        let mut ranked: Vec<RankedCandidate> = results
            .into_iter()
            .zip(fallback)
            .map(|(result, candidate)| {
                result.unwrap_or_else(|| {
                    RankedCandidate::failed(&candidate, "qualification evaluation failed")
                })
            })
            .collect();

        ranked.sort_by(deterministic_order);
        for candidate in &ranked {
            debug!(
                manuscript_id = %manuscript.id,
                reviewer = %candidate.reviewer,
                eligible = candidate.eligible,
                load = candidate.current_load,
                papers_on_topic = candidate.first_author_papers_on_topic,
                "candidate evaluated"
            );
        }
        ranked
    }
}

/// Eligible first; then lower load, more on-topic papers, and identity for stability.
pub(crate) fn deterministic_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.eligible
        .cmp(&a.eligible)
        .then_with(|| a.current_load.cmp(&b.current_load))
        .then_with(|| b.first_author_papers_on_topic.cmp(&a.first_author_papers_on_topic))
        .then_with(|| a.reviewer.cmp(&b.reviewer))
}

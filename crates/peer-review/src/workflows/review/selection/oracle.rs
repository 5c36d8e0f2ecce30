use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::super::domain::Manuscript;
use super::super::oracle::{
    CandidateContext, ManuscriptContext, Oracle, OracleError, OracleTier, OracleVerdict,
};
use super::super::policy::AssignmentStrategy;
use super::super::qualification::{ManuscriptTopics, QualificationEvaluator};
use super::pool::scan;
use super::{Candidate, CandidateEvaluator, RankedCandidate};

pub(crate) const ORACLE_FAILURE_REASON: &str = "oracle unavailable or invalid response";

/// Ranks candidates by the oracle's composite score.
pub struct OracleEvaluator {
    oracle: Arc<dyn Oracle>,
    qualification: Arc<QualificationEvaluator>,
    workers: usize,
    timeout: Duration,
}

impl OracleEvaluator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        qualification: Arc<QualificationEvaluator>,
        workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            qualification,
            workers,
            timeout,
        }
    }
}

async fn consult(
    oracle: &dyn Oracle,
    candidate: &CandidateContext,
    manuscript: &ManuscriptContext,
    timeout: Duration,
) -> Result<OracleVerdict, OracleError> {
    let verdict = tokio::time::timeout(timeout, oracle.evaluate(candidate, manuscript))
        .await
        .map_err(|_| OracleError::Timeout(timeout))??;
    verdict.validate()?;
    Ok(verdict)
}

#[async_trait]
impl CandidateEvaluator for OracleEvaluator {
    fn strategy(&self) -> AssignmentStrategy {
        AssignmentStrategy::Oracle
    }

    async fn evaluate(&self, pool: Vec<Candidate>, manuscript: &Manuscript) -> Vec<RankedCandidate> {
        let context = Arc::new(ManuscriptContext::from(manuscript));
        let topics = Arc::new(ManuscriptTopics::from_manuscript(manuscript));
        let oracle = Arc::clone(&self.oracle);
        let qualification = Arc::clone(&self.qualification);
        let timeout = self.timeout;
        let fallback: Vec<Candidate> = pool.clone();

        let results = scan(pool, self.workers, move |candidate: Candidate| {
            let oracle = Arc::clone(&oracle);
            let qualification = Arc::clone(&qualification);
            let context = Arc::clone(&context);
            let topics = Arc::clone(&topics);
            async move {
                let local = qualification.evaluate(&candidate.profile, &topics);
                let request = CandidateContext::from_profile(&candidate.profile, candidate.current_load);
                match consult(oracle.as_ref(), &request, &context, timeout).await {
                    Ok(verdict) => RankedCandidate::from_verdict(&candidate, verdict, local),
                    Err(err) => {
                        warn!(
                            manuscript_id = %context.id,
                            reviewer = %candidate.profile.identity,
                            error = %err,
                            "oracle evaluation degraded"
                        );
                        let mut ranked = RankedCandidate::failed(&candidate, ORACLE_FAILURE_REASON);
                        ranked.oracle_error = Some(err.to_string());
                        ranked.qualification = Some(local);
                        ranked
                    }
                }
            }
        })
        .await;

        let mut ranked: Vec<RankedCandidate> = results
            .into_iter()
            .zip(fallback)
            .map(|(result, candidate)| {
                result.unwrap_or_else(|| {
                    let mut ranked = RankedCandidate::failed(&candidate, ORACLE_FAILURE_REASON);
                    ranked.oracle_error = Some("evaluation task aborted".to_string());
                    ranked
                })
            })
            .collect();

        ranked.sort_by(oracle_order);
        for candidate in &ranked {
            debug!(
                manuscript_id = %manuscript.id,
                reviewer = %candidate.reviewer,
                score = candidate.score,
                tier = candidate.tier.map(OracleTier::label),
                "candidate scored"
            );
        }
        ranked
    }
}

/// Eligible first, then by score descending, identity for stability.
pub(crate) fn oracle_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.eligible
        .cmp(&a.eligible)
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| a.reviewer.cmp(&b.reviewer))
}

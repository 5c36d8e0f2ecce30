use crate::infra::{build_service, load_fixtures, ApiService};
use clap::Args;
use peer_review::config::AppConfig;
use peer_review::error::AppError;
use peer_review::workflows::review::{
    AssignmentStrategy, CandidateRanking, ConsensusStatus, ManuscriptId, OpenReview,
    PublishRecommendation, Recommendation, ReviewerId, SubmitReview,
};
use std::path::PathBuf;

const DEMO_EDITOR: &str = "editor-demo";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// JSON fixtures to seed from (defaults to the bundled sample)
    #[arg(long)]
    pub(crate) fixtures: Option<PathBuf>,
    /// Manuscript to walk through review
    #[arg(long, default_value_t = 1)]
    pub(crate) manuscript: u64,
    /// Assignment strategy: deterministic or oracle
    #[arg(long)]
    pub(crate) strategy: Option<AssignmentStrategy>,
    /// Recommendations submitted by the assigned reviewers, in order
    #[arg(long, value_delimiter = ',', default_value = "accept,minor_revision,accept")]
    pub(crate) recommendations: Vec<Recommendation>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        fixtures,
        manuscript,
        strategy,
        recommendations,
    } = args;

    let config = AppConfig::load()?;
    let fixtures = load_fixtures(fixtures.as_deref())?;
    let service = build_service(fixtures, config.review.clone(), config.oracle.as_ref())?;
    let manuscript_id = ManuscriptId(manuscript);

    println!("Peer review demo for manuscript {manuscript_id}");

    let ranking = service.qualified_reviewers(manuscript_id, strategy).await?;
    render_ranking(&ranking);

    let slots = service.policy().required_reviews;
    for _ in 0..slots {
        service
            .open_review(manuscript_id, OpenReview::default())
            .await?;
    }
    println!("\nOpened {slots} review slots");

    let mut assigned = Vec::with_capacity(slots);
    for _ in 0..slots {
        let outcome = service.auto_assign(manuscript_id, strategy).await?;
        println!(
            "- review #{} -> {} (load {}): {}",
            outcome.assignment.id,
            outcome.reviewer.reviewer,
            outcome.reviewer.current_load,
            outcome.justification
        );
        assigned.push((outcome.assignment.id, outcome.reviewer.reviewer));
    }

    println!("\nSubmitting reviews");
    let mut consensus = service.consensus_status(manuscript_id)?;
    for ((assignment_id, reviewer), recommendation) in
        assigned.into_iter().zip(recommendations.into_iter().cycle())
    {
        let submitted = service
            .submit_review(
                assignment_id,
                SubmitReview {
                    reviewer: reviewer.clone(),
                    recommendation,
                    comments: Some(format!("Demo review by {reviewer}")),
                    confidential_comments: None,
                },
            )
            .await?;
        println!(
            "- {reviewer}: {} ({})",
            recommendation.label(),
            submitted.consensus.next_action
        );
        consensus = submitted.consensus;
    }

    render_consensus(&consensus);
    decide(&service, manuscript_id, &consensus).await
}

async fn decide(
    service: &ApiService,
    manuscript_id: ManuscriptId,
    consensus: &ConsensusStatus,
) -> Result<(), AppError> {
    let editor = ReviewerId::new(DEMO_EDITOR);
    let decided = match consensus.publish_recommendation {
        Some(PublishRecommendation::Approve) => service.publish(manuscript_id, editor).await?,
        Some(PublishRecommendation::Reject) => service.reject(manuscript_id, editor).await?,
        None => {
            println!("\nNo decision yet: {}", consensus.next_action);
            return Ok(());
        }
    };
    println!(
        "\nManuscript {} is now {}",
        decided.id,
        decided.status.label()
    );
    Ok(())
}

fn render_ranking(ranking: &CandidateRanking) {
    println!(
        "\nCandidates ({} strategy, {} evaluated)",
        ranking.strategy,
        ranking.candidates.len()
    );
    for candidate in &ranking.candidates {
        let marker = if candidate.eligible { "+" } else { "-" };
        println!(
            "  {marker} {} [{}] score {:.2}, load {}{}",
            candidate.name,
            candidate.reviewer,
            candidate.score,
            candidate.current_load,
            if candidate.available { "" } else { ", unavailable" }
        );
        if let Some(reason) = candidate.reasons.first() {
            println!("      {reason}");
        }
    }
}

fn render_consensus(consensus: &ConsensusStatus) {
    println!("\nConsensus");
    println!(
        "- {} of {} required reviews completed, {} accepts (need {})",
        consensus.completed_count,
        consensus.required_reviews,
        consensus.accept_count,
        consensus.required_accepts
    );
    println!(
        "- {} in progress, {} pending, {} overdue",
        consensus.reviews_in_progress, consensus.reviews_pending, consensus.overdue_count
    );
    println!("- next action: {}", consensus.next_action);
}

use metrics_exporter_prometheus::PrometheusHandle;
use peer_review::config::OracleConfig;
use peer_review::error::AppError;
use peer_review::workflows::review::{
    FixtureSet, HttpOracle, InMemoryAssignments, InMemoryManuscripts, InMemoryProfiles,
    ReviewPolicy, ReviewWorkflowService,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const SAMPLE_FIXTURES: &str = include_str!("../fixtures/sample.json");

pub(crate) type ApiService =
    ReviewWorkflowService<InMemoryManuscripts, InMemoryProfiles, InMemoryAssignments>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Fixtures from `path`, or the bundled sample when no path is given.
pub(crate) fn load_fixtures(path: Option<&Path>) -> Result<FixtureSet, AppError> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading fixtures");
            Ok(FixtureSet::from_path(path)?)
        }
        None => Ok(FixtureSet::from_json(SAMPLE_FIXTURES)?),
    }
}

/// Seed in-memory repositories and wire the oracle when one is configured.
pub(crate) fn build_service(
    fixtures: FixtureSet,
    policy: ReviewPolicy,
    oracle: Option<&OracleConfig>,
) -> Result<Arc<ApiService>, AppError> {
    let seeded = fixtures.seed()?;
    let service = ReviewWorkflowService::new(
        Arc::new(seeded.manuscripts),
        Arc::new(seeded.profiles),
        Arc::new(seeded.assignments),
        policy,
    );

    let service = match oracle {
        Some(config) => {
            let client = HttpOracle::new(config)?;
            info!(endpoint = client.endpoint(), "oracle strategy enabled");
            service.with_oracle(Arc::new(client))
        }
        None => service,
    };
    Ok(Arc::new(service))
}

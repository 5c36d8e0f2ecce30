use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Run `job` over `inputs` with at most `workers` in flight.
///
/// Output keeps input order. A task that panics yields `None` for its slot without
/// affecting the others.
pub(crate) async fn scan<I, O, F, Fut>(inputs: Vec<I>, workers: usize, job: F) -> Vec<Option<O>>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = O> + Send + 'static,
{
    let total = inputs.len();
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let job = job.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, job(input).await)
        });
    }

    let mut results: Vec<Option<O>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, output)) => {
                if let Some(slot) = results.get_mut(index) {
                    *slot = Some(output);
                }
            }
            Err(err) => warn!(error = %err, "candidate evaluation task failed"),
        }
    }
    results
}

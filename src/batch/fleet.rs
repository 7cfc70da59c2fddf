// ABOUTME: Runs one batch per host, each in its own task with its own session.
// ABOUTME: Sessions are never shared between hosts; outcomes come back in host order.

use super::runner::{BatchOutcome, BatchRunner};
use super::step::StepSpec;
use crate::ssh::{Connector, Host, with_session};
use tokio::task::JoinSet;

/// Run `steps` against every host concurrently.
///
/// A host whose session cannot be opened yields an outcome with no steps and
/// the connection error recorded; other hosts are unaffected.
pub async fn run_on_hosts<C, F>(
    connector: &C,
    hosts: Vec<Host>,
    steps: Vec<StepSpec>,
    runner_for: F,
) -> Vec<BatchOutcome>
where
    C: Connector + Clone + 'static,
    F: Fn(&Host) -> BatchRunner,
{
    let mut tasks = JoinSet::new();

    for (index, host) in hosts.into_iter().enumerate() {
        let connector = connector.clone();
        let steps = steps.clone();
        let runner = runner_for(&host);
        let label = host.to_string();
        let planned = steps.len();

        tasks.spawn(async move {
            let outcome = with_session(&connector, host, move |session| {
                Box::pin(async move { runner.run_all(session, steps).await })
            })
            .await
            .unwrap_or_else(|e| {
                tracing::error!(host = %label, error = %e, "could not open session");
                BatchOutcome::not_started(label, planned, e)
            });
            (index, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => outcomes.push(entry),
            // Tasks are never aborted, so a join error is a panic in a worker.
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

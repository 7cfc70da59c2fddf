// ABOUTME: Sequential batch execution against one remote session.
// ABOUTME: Classifies each step and continues past failures; only fatal session errors stop a batch.

use super::step::{BatchStep, StepSpec};
use crate::ssh::{self, RemoteSession, Transport};
use futures::stream::{self, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;

/// Receives output chunks as they arrive, tagged with the step label.
pub type ProgressFn = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Steps that ran, plus the fatal error that cut the batch short, if any.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Display form of the host the batch ran against.
    pub host: String,
    pub steps: Vec<BatchStep>,
    /// Number of steps the batch was asked to run.
    pub planned: usize,
    pub aborted: Option<ssh::Error>,
}

impl BatchOutcome {
    /// An outcome for a batch that never got a session.
    pub fn not_started(host: impl Into<String>, planned: usize, error: ssh::Error) -> Self {
        Self {
            host: host.into(),
            steps: Vec::new(),
            planned,
            aborted: Some(error),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    pub fn all_passed(&self) -> bool {
        self.is_complete() && self.steps.iter().all(BatchStep::passed)
    }
}

/// Runs labeled commands one after another.
#[derive(Clone, Default)]
pub struct BatchRunner {
    progress: Option<ProgressFn>,
}

impl fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRunner")
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream output chunks to `progress` while steps run.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Lazily run `steps` in order, yielding one classified step per input.
    ///
    /// Nothing runs until the stream is polled. A fatal session error is
    /// yielded as the last item and ends the stream.
    pub fn run<'a, T: Transport>(
        &'a self,
        session: &'a RemoteSession<T>,
        steps: Vec<StepSpec>,
    ) -> impl Stream<Item = ssh::Result<BatchStep>> + Send + 'a {
        stream::unfold(Some(steps.into_iter()), move |remaining| async move {
            let mut remaining = remaining?;
            let spec = remaining.next()?;
            match self.run_step(session, spec).await {
                Ok(step) => Some((Ok(step), Some(remaining))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Run every step and collect the outcome.
    pub async fn run_all<T: Transport>(
        &self,
        session: &RemoteSession<T>,
        steps: Vec<StepSpec>,
    ) -> BatchOutcome {
        let planned = steps.len();
        let mut outcome = BatchOutcome {
            host: session.host().to_string(),
            steps: Vec::with_capacity(planned),
            planned,
            aborted: None,
        };

        let results = self.run(session, steps);
        futures::pin_mut!(results);
        while let Some(item) = results.next().await {
            match item {
                Ok(step) => outcome.steps.push(step),
                Err(e) => {
                    tracing::error!(host = %session.host(), error = %e, "batch aborted");
                    outcome.aborted = Some(e);
                }
            }
        }
        outcome
    }

    async fn run_step<T: Transport>(
        &self,
        session: &RemoteSession<T>,
        spec: StepSpec,
    ) -> ssh::Result<BatchStep> {
        tracing::debug!(label = %spec.label, "running step");

        let label = spec.label.clone();
        let progress = self.progress.clone();
        let mut sink = move |chunk: &[u8]| {
            if let Some(progress) = &progress {
                progress(&label, chunk);
            }
        };

        let executed = session.execute_with(&spec.request, &mut sink).await;
        let step = match executed {
            Ok(result) => BatchStep::completed(spec, result),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => BatchStep::errored(spec, e.to_string()),
        };

        tracing::info!(
            label = %step.label,
            classification = %step.classification,
            note = step.note.as_deref().unwrap_or(""),
            "step finished"
        );
        Ok(step)
    }
}

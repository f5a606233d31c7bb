use std::sync::Arc;
use std::time::Duration;

use beehub_core::{config::RegistrationConfig, BatchResult, CourseRequest};
use beehub_session::TokenProvider;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::endpoint::{HttpEndpoint, RegistrationEndpoint, RegistrationRequest};
use crate::run::{PickContext, PickOutcome};
use crate::PickError;

#[derive(Debug, Clone)]
pub struct PickSettings {
    /// Pause between batches required by the upstream rate limit.
    pub inter_batch_delay: Duration,
    pub max_transient_retries: u32,
    pub stream_capacity: usize,
}

impl From<&RegistrationConfig> for PickSettings {
    fn from(config: &RegistrationConfig) -> Self {
        Self {
            inter_batch_delay: config.inter_batch_delay(),
            max_transient_retries: config.max_transient_retries,
            stream_capacity: config.stream_capacity,
        }
    }
}

/// A run started with [`Orchestrator::spawn_pick`].
pub struct PickStream {
    pub results: mpsc::Receiver<BatchResult>,
    pub handle: JoinHandle<Result<PickOutcome, PickError>>,
}

/// Submits course requests in sequential batches and streams per-CRN outcomes.
///
/// One orchestrator serves one session: it allows a single run in flight, so
/// two runs never share the upstream rate limit or the retry budget.
pub struct Orchestrator {
    endpoint: Arc<dyn RegistrationEndpoint>,
    tokens: Arc<dyn TokenProvider>,
    settings: PickSettings,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(config: &RegistrationConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, PickError> {
        let endpoint = Arc::new(HttpEndpoint::new(config)?);
        Ok(Self::with_endpoint(endpoint, tokens, PickSettings::from(config)))
    }

    pub fn with_endpoint(
        endpoint: Arc<dyn RegistrationEndpoint>,
        tokens: Arc<dyn TokenProvider>,
        settings: PickSettings,
    ) -> Self {
        Self {
            endpoint,
            tokens,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    /// Run `pick` on its own task, returning the result stream and the task handle.
    pub fn spawn_pick(self: &Arc<Self>, forest: Vec<CourseRequest>, cancel: CancellationToken) -> PickStream {
        let (tx, rx) = mpsc::channel(self.settings.stream_capacity.max(1));
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.pick(forest, tx, cancel).await });

        PickStream { results: rx, handle }
    }

    /// Work through `forest`, sending each classified result to `sink` as soon
    /// as its batch answers. Network, token and response-format failures abort
    /// the run; per-course failures never do.
    pub async fn pick(
        &self,
        forest: Vec<CourseRequest>,
        sink: mpsc::Sender<BatchResult>,
        cancel: CancellationToken,
    ) -> Result<PickOutcome, PickError> {
        let _running = self.run_lock.try_lock().map_err(|_| PickError::AlreadyRunning)?;

        let mut context = PickContext::new(forest, self.settings.max_transient_retries);
        let outcome = self.run(&mut context, &sink, &cancel).await?;

        info!(
            elapsed_ms = context.duration().as_millis() as u64,
            "{}",
            context.stats.summary(outcome)
        );
        Ok(outcome)
    }

    async fn run(
        &self,
        context: &mut PickContext,
        sink: &mpsc::Sender<BatchResult>,
        cancel: &CancellationToken,
    ) -> Result<PickOutcome, PickError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(PickOutcome::Cancelled);
            }

            let batch = context.next_batch();
            if batch.is_empty() {
                return Ok(PickOutcome::Drained);
            }

            let crns: Vec<String> = batch.iter().map(|c| c.crn.clone()).collect();
            info!(batch = context.stats.batches, crns = ?crns, "submitting batch");

            let token = self.tokens.token().await?;
            let response = self
                .endpoint
                .submit(&token, &RegistrationRequest::add_only(crns))
                .await?;

            let results: Vec<BatchResult> = response
                .add_results
                .iter()
                .map(|r| classify(&r.crn, r.status_code, &r.result_code))
                .collect();

            for result in &results {
                debug!(crn = %result.crn, status = result.status_code, code = %result.result_code, "course result");
                if sink.send(result.clone()).await.is_err() {
                    info!("result sink closed, stopping run");
                    return Ok(PickOutcome::Cancelled);
                }
            }

            let retried = context.advance(batch, &results);
            if retried && !context.any_success() && context.increment_retry() {
                warn!(retries = context.retry_count(), "registration window never opened, giving up");
                return Ok(PickOutcome::RetryBudgetExhausted);
            }

            if context.is_drained() {
                return Ok(PickOutcome::Drained);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(PickOutcome::Cancelled),
                _ = tokio::time::sleep(self.settings.inter_batch_delay) => {}
            }
        }
    }
}

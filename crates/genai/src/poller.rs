//! Submit-poll-fetch driver for long-running generation jobs.
//!
//! [`JobPoller`] hides a service's long-running operation protocol
//! behind one awaitable call. It submits the request once, queries the
//! job status until it is terminal (sleeping between queries according
//! to the request's [`PollPolicy`]), then fetches the first artifact.
//!
//! Each call owns its [`JobHandle`] and loop; concurrent calls share
//! nothing but the [`Session`] and the event channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use veil_core::generation::{
    progress_message, validate_request, Artifact, ArtifactLocator, GenerationRequest, JobHandle,
    JobStatus,
};
use veil_core::polling::{decide, next_delay, PollDecision, PollPolicy};

use crate::error::{job_failure, GenerationError};
use crate::events::GenerationEvent;
use crate::service::GenerationService;
use crate::session::Session;

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Drives generation jobs on one [`GenerationService`].
///
/// Cheap to share behind an `Arc`; every call is independent.
pub struct JobPoller {
    service: Arc<dyn GenerationService>,
    session: Arc<Session>,
    event_tx: broadcast::Sender<GenerationEvent>,
}

impl JobPoller {
    pub fn new(service: Arc<dyn GenerationService>, session: Arc<Session>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            session,
            event_tx,
        }
    }

    /// Subscribe to progress events for every job run by this poller.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.event_tx.subscribe()
    }

    /// The credential session this poller invalidates on rejection.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Submit `request` and wait for its artifact, querying status every
    /// `poll_interval`.
    ///
    /// The request's deadline and attempt cap still apply; only its
    /// interval and backoff are replaced by the fixed `poll_interval`.
    /// A zero interval re-polls immediately.
    pub async fn submit_and_await(
        &self,
        request: &GenerationRequest,
        poll_interval: Duration,
    ) -> Result<Artifact, GenerationError> {
        let policy = request.poll.clone().with_fixed_interval(poll_interval);
        self.execute(request, &policy, &CancellationToken::new()).await
    }

    /// Submit `request` and wait for its artifact using the request's own
    /// [`PollPolicy`], giving up early if `cancel` fires.
    ///
    /// Cancelling stops local waiting only; the remote job keeps running
    /// until the service completes or expires it.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<Artifact, GenerationError> {
        self.execute(request, &request.poll, cancel).await
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Artifact, GenerationError> {
        let mut job = None;
        let result = self.drive(request, policy, cancel, &mut job).await;

        if let Err(e) = &result {
            if e.is_credential() {
                self.session.invalidate();
            }
            tracing::warn!(job = job.as_deref().unwrap_or("-"), error = %e, "Generation failed");
            let _ = self.event_tx.send(GenerationEvent::Failed {
                job,
                error: e.to_string(),
                credential: e.is_credential(),
                at: chrono::Utc::now(),
            });
        }

        result
    }

    async fn drive(
        &self,
        request: &GenerationRequest,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        job: &mut Option<String>,
    ) -> Result<Artifact, GenerationError> {
        validate_request(request)?;
        policy.validate()?;

        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let started = Instant::now();
        let handle = self.service.submit(request).await?;
        *job = Some(handle.to_string());

        tracing::info!(job = %handle, extension = request.is_extension(), "Generation submitted");
        let _ = self.event_tx.send(GenerationEvent::Submitted {
            job: handle.to_string(),
            extension: request.is_extension(),
            at: chrono::Utc::now(),
        });

        let locators = self.await_terminal(handle, policy, cancel, started).await?;

        let locator = locators
            .into_iter()
            .next()
            .ok_or(GenerationError::MissingArtifact)?;

        let artifact = match Artifact::from_inline(&locator) {
            Some(artifact) => artifact,
            None => {
                tracing::debug!(locator = %locator.describe(), "Fetching artifact");
                self.service.fetch(&locator).await?
            }
        };

        tracing::info!(
            job = job.as_deref().unwrap_or("-"),
            mime_type = %artifact.mime_type,
            bytes = artifact.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation completed",
        );
        let _ = self.event_tx.send(GenerationEvent::Completed {
            job: job.clone().unwrap_or_default(),
            mime_type: artifact.mime_type.clone(),
            bytes: artifact.bytes.len(),
            at: chrono::Utc::now(),
        });

        Ok(artifact)
    }

    /// Poll until the job is terminal. Consumes the handle: once this
    /// returns, the job can no longer be queried.
    async fn await_terminal(
        &self,
        handle: JobHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<Vec<ArtifactLocator>, GenerationError> {
        let mut delay = policy.interval;
        let mut attempts = 0u32;

        loop {
            let status = self.service.poll(&handle).await?;
            attempts += 1;

            let decision = match status {
                JobStatus::Done(locators) => return Ok(locators),
                JobStatus::Failed(message) => return Err(job_failure(message)),
                JobStatus::Pending => decide(attempts, started.elapsed(), delay, policy),
            };

            let wait = match decision {
                PollDecision::Wait(wait) => wait,
                PollDecision::DeadlineExceeded => {
                    return Err(GenerationError::DeadlineExceeded {
                        elapsed: started.elapsed(),
                    })
                }
                PollDecision::AttemptsExhausted => {
                    return Err(GenerationError::AttemptsExhausted { attempts })
                }
            };

            let message = progress_message(attempts - 1);
            tracing::debug!(
                job = %handle,
                attempt = attempts,
                delay_ms = wait.as_millis() as u64,
                "{message}",
            );
            let _ = self.event_tx.send(GenerationEvent::Progress {
                job: handle.to_string(),
                attempt: attempts,
                message: message.to_string(),
                at: chrono::Utc::now(),
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(job = %handle, "Generation wait cancelled");
                    return Err(GenerationError::Cancelled);
                }
                _ = tokio::time::sleep(wait) => {}
            }

            delay = next_delay(delay, policy);
        }
    }
}

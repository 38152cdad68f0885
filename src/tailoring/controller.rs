//! Drives one tailoring stream at a time and folds it into the cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::fold::{fold_frame, RunOutcome, Step};
use crate::cache::QueryCache;
use crate::client::KitchenClient;
use crate::error::{KitchenResult, TailorError, TransportError};
use crate::models::{RunStatus, TailorKey, TailoringRun};
use crate::sse::{parse_tailor_frame, Frame};
use crate::transport::{CancellationToken, FrameStream};

/// Message stored on a run whose transport failed without a structured
/// `error` frame.
pub const GENERIC_FAILURE: &str = "We were unable to tailor this recipe for your kitchen.";

/// Message stored on a run whose stream closed before `complete` or `error`.
pub const UNEXPECTED_END: &str = "stream ended unexpectedly";

/// Progress reported while a run streams.
#[derive(Debug, Clone, PartialEq)]
pub enum TailorUpdate {
    /// Transient status line; not part of the run.
    Status(String),
    /// The cached run changed; carries the new value.
    Run(TailoringRun),
    /// Frame with an event name the controller does not interpret.
    Unrecognized(Frame),
    Finished(RunOutcome),
}

struct ActiveRun {
    key: TailorKey,
    run_id: String,
    token: CancellationToken,
    outcome: watch::Receiver<Option<RunOutcome>>,
    task: JoinHandle<()>,
}

impl ActiveRun {
    /// True while the cached run is still this session's and `streaming`.
    ///
    /// A cancelled run stops counting at once, even if its task has not
    /// yet observed the token.
    fn is_streaming(&self, cache: &QueryCache) -> bool {
        !self.task.is_finished()
            && cache
                .run(&self.key)
                .map(|run| run.run_id == self.run_id && run.status == RunStatus::Streaming)
                .unwrap_or(false)
    }
}

/// Runs the tailoring operation for a recipe and appliance selection.
///
/// At most one run streams at a time. Each selection has its own cache
/// entry, so starting a run for a new selection leaves earlier completed
/// runs untouched. After any terminal state the controller accepts a new
/// `start`.
pub struct TailoringController {
    client: KitchenClient,
    cache: QueryCache,
    updates: mpsc::UnboundedSender<TailorUpdate>,
    status_message: Arc<Mutex<Option<String>>>,
    active: Mutex<Option<ActiveRun>>,
}

impl TailoringController {
    pub fn new(
        client: KitchenClient,
        cache: QueryCache,
        updates: mpsc::UnboundedSender<TailorUpdate>,
    ) -> Self {
        Self {
            client,
            cache,
            updates,
            status_message: Arc::new(Mutex::new(None)),
            active: Mutex::new(None),
        }
    }

    /// Stored run for `key` without streaming: the cached entry if present,
    /// otherwise the server's history (which is then cached).
    pub async fn load(&self, key: &TailorKey) -> KitchenResult<Option<TailoringRun>> {
        if let Some(run) = self.cache.run(key) {
            return Ok(Some(run));
        }
        let Some(run) = self.client.tailor_history(key).await? else {
            return Ok(None);
        };
        tracing::debug!("loaded tailoring history for {} ({:?})", key, run.status);
        // A run started while the request was in flight keeps the entry
        Ok(Some(self.cache.set_run_if_absent(run)))
    }

    /// Start streaming a fresh run for `key`.
    ///
    /// Replaces any cached run for the same selection. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, key: TailorKey) -> Result<(), TailorError> {
        if key.appliance_ids().is_empty() {
            return Err(TailorError::NoAppliances);
        }

        let mut active = self.active();
        if let Some(current) = active.as_ref().filter(|run| run.is_streaming(&self.cache)) {
            return Err(TailorError::AlreadyStreaming {
                key: current.key.to_string(),
            });
        }

        // A cancelled session still winding down sees its run replaced and exits
        if let Some(previous) = active.as_ref() {
            previous.token.cancel();
        }

        let mut run = TailoringRun::new(&key);
        run.mark_streaming(Utc::now());
        let run_id = run.run_id.clone();
        self.cache.set_run(run.clone());
        *self.status_slot() = None;
        let _ = self.updates.send(TailorUpdate::Run(run));

        let token = CancellationToken::new();
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let session = Session {
            client: self.client.clone(),
            cache: self.cache.clone(),
            updates: self.updates.clone(),
            status_message: Arc::clone(&self.status_message),
            key: key.clone(),
            run_id: run_id.clone(),
            token: token.clone(),
        };
        let task = tokio::spawn(async move {
            let outcome = session.run().await;
            tracing::info!("tailoring {} finished: {:?}", session.key, outcome);
            let _ = session.updates.send(TailorUpdate::Finished(outcome.clone()));
            outcome_tx.send_replace(Some(outcome));
        });

        tracing::info!("tailoring started for {}", key);
        *active = Some(ActiveRun {
            key,
            run_id,
            token,
            outcome: outcome_rx,
            task,
        });
        Ok(())
    }

    /// Cancel the streaming run, if any.
    ///
    /// The run becomes `cancelled` immediately; the transport read is
    /// aborted at its next suspension point. Returns false when nothing was
    /// streaming.
    pub fn cancel(&self) -> bool {
        let active = self.active();
        let Some(current) = active.as_ref().filter(|run| run.is_streaming(&self.cache)) else {
            return false;
        };
        current.token.cancel();
        let cancelled = self
            .cache
            .update_run(&current.key, |run| {
                run.run_id == current.run_id && run.mark_cancelled(Utc::now())
            })
            .unwrap_or(false);
        if cancelled {
            tracing::info!("tailoring cancelled for {}", current.key);
            if let Some(run) = self.cache.run(&current.key) {
                let _ = self.updates.send(TailorUpdate::Run(run));
            }
        }
        cancelled
    }

    pub fn is_streaming(&self) -> bool {
        self.active()
            .as_ref()
            .map(|run| run.is_streaming(&self.cache))
            .unwrap_or(false)
    }

    /// Selection of the most recently started run.
    pub fn active_key(&self) -> Option<TailorKey> {
        self.active().as_ref().map(|run| run.key.clone())
    }

    /// Last status line of the current run.
    pub fn status_message(&self) -> Option<String> {
        self.status_slot().clone()
    }

    /// Wait for the most recently started run to finish.
    ///
    /// Returns `None` if no run was started or its task was aborted.
    pub async fn wait(&self) -> Option<RunOutcome> {
        let mut outcome = self.active().as_ref()?.outcome.clone();
        let result = outcome.wait_for(Option::is_some).await.ok()?.clone();
        result
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn status_slot(&self) -> MutexGuard<'_, Option<String>> {
        self.status_message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TailoringController {
    fn drop(&mut self) {
        if let Some(active) = self.active().take() {
            active.token.cancel();
            active.task.abort();
        }
    }
}

/// State owned by the task consuming one stream.
struct Session {
    client: KitchenClient,
    cache: QueryCache,
    updates: mpsc::UnboundedSender<TailorUpdate>,
    status_message: Arc<Mutex<Option<String>>>,
    key: TailorKey,
    run_id: String,
    token: CancellationToken,
}

impl Session {
    async fn run(&self) -> RunOutcome {
        match self.client.tailor_stream(&self.key, self.token.clone()).await {
            Ok(frames) => self.consume(frames).await,
            Err(err) => self.fail(err),
        }
    }

    async fn consume(&self, mut frames: FrameStream) -> RunOutcome {
        while let Some(item) = frames.next().await {
            let frame = match item {
                Ok(frame) => frame,
                Err(err) => return self.fail(err),
            };
            let parsed = match parse_tailor_frame(frame) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::debug!("dropping tailoring frame: {}", err);
                    continue;
                }
            };

            let step = self.cache.update_run(&self.key, |run| {
                if run.run_id != self.run_id {
                    return None;
                }
                let step = fold_frame(run, parsed, Utc::now());
                Some((step, run.clone()))
            });
            let Some((step, run)) = step.flatten() else {
                // Another run replaced ours, or the entry was evicted
                tracing::debug!("tailoring run for {} no longer cached", self.key);
                self.token.cancel();
                return RunOutcome::Cancelled;
            };

            match step {
                Step::Updated => {
                    let _ = self.updates.send(TailorUpdate::Run(run));
                }
                Step::Ignored => {
                    if let Some(outcome) = RunOutcome::of(&run, false) {
                        // Cancelled underneath us
                        return outcome;
                    }
                }
                Step::Status(message) => {
                    *self
                        .status_message
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(message.clone());
                    let _ = self.updates.send(TailorUpdate::Status(message));
                }
                Step::Passthrough(frame) => {
                    tracing::debug!("unrecognized tailoring event: {}", frame.event);
                    let _ = self.updates.send(TailorUpdate::Unrecognized(frame));
                }
                Step::Finished(outcome) => {
                    let _ = self.updates.send(TailorUpdate::Run(run));
                    // Stop the read; anything after a terminal frame is ignored
                    self.token.cancel();
                    return outcome;
                }
            }
        }

        self.settle(UNEXPECTED_END.to_string(), true)
    }

    fn fail(&self, err: TransportError) -> RunOutcome {
        if err.is_cancelled() {
            return self.settle_cancelled();
        }
        tracing::warn!("tailoring stream for {} failed: {}", self.key, err);
        self.settle(GENERIC_FAILURE.to_string(), err.is_retryable())
    }

    /// Move the run to `error` unless it already reached a terminal state.
    fn settle(&self, message: String, retryable: bool) -> RunOutcome {
        let settled = self.cache.update_run(&self.key, |run| {
            if run.run_id != self.run_id {
                return None;
            }
            let changed = run.mark_error(message.clone(), Utc::now());
            Some((changed, run.clone()))
        });
        match settled.flatten() {
            Some((changed, run)) => {
                if changed {
                    let _ = self.updates.send(TailorUpdate::Run(run.clone()));
                }
                RunOutcome::of(&run, retryable).unwrap_or(RunOutcome::Failed { message, retryable })
            }
            None => RunOutcome::Cancelled,
        }
    }

    fn settle_cancelled(&self) -> RunOutcome {
        let settled = self.cache.update_run(&self.key, |run| {
            if run.run_id != self.run_id {
                return None;
            }
            run.mark_cancelled(Utc::now());
            RunOutcome::of(run, false)
        });
        settled.flatten().unwrap_or(RunOutcome::Cancelled)
    }
}

//! Background polling tasks driven by the reducer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::reducer::{reduce, PollEffect, PollEvent, PollNotification, PollState};
use crate::cache::QueryCache;
use crate::config::PollIntervals;
use crate::error::ConfigError;
use crate::models::Appliance;
use crate::traits::SnapshotSource;

struct Registration {
    state: watch::Receiver<PollState>,
    control: mpsc::UnboundedSender<PollEvent>,
}

/// Spawns and tracks appliance observations.
///
/// Each [`StatusPoller::observe`] call starts one task that fetches the
/// appliance while it is `queued` or `processing`, merges every result into
/// the shared cache and stops on its own once the appliance is terminal.
/// Terminal transitions are sent on the notification channel.
#[derive(Clone)]
pub struct StatusPoller {
    source: Arc<dyn SnapshotSource>,
    cache: QueryCache,
    intervals: PollIntervals,
    notify_tx: mpsc::UnboundedSender<PollNotification>,
    observations: Arc<Mutex<Vec<Registration>>>,
}

impl StatusPoller {
    /// Fails when either interval lies outside the 1-2 second window.
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        cache: QueryCache,
        intervals: PollIntervals,
        notify_tx: mpsc::UnboundedSender<PollNotification>,
    ) -> Result<Self, ConfigError> {
        intervals.validate()?;
        Ok(Self {
            source,
            cache,
            intervals,
            notify_tx,
            observations: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start observing `id`.
    ///
    /// Polling stops when the returned handle is dropped.
    pub fn observe(&self, id: &str) -> ObservationHandle {
        let known = self.cache.appliance(id).map(|a| a.status);
        let (state, effects) = reduce(
            PollState::default(),
            PollEvent::Observe {
                id: id.to_string(),
                known,
            },
            &self.intervals,
        );

        let (state_tx, state_rx) = watch::channel(state.clone());
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let poll_loop = PollLoop {
            source: Arc::clone(&self.source),
            cache: self.cache.clone(),
            intervals: self.intervals,
            notify_tx: self.notify_tx.clone(),
            state_tx,
        };
        let task = tokio::spawn(poll_loop.run(state, effects, control_rx));

        let mut observations = self.registry();
        observations.retain(|r| !r.control.is_closed());
        observations.push(Registration {
            state: state_rx.clone(),
            control: control_tx.clone(),
        });

        tracing::debug!("observing appliance {} (known status: {:?})", id, known);
        ObservationHandle {
            cache: self.cache.clone(),
            state: state_rx,
            control: control_tx,
            task,
        }
    }

    /// Stop every active observation of `id`. Returns how many were stopped.
    pub fn stop_resource(&self, id: &str) -> usize {
        let mut observations = self.registry();
        observations.retain(|r| !r.control.is_closed());
        let mut stopped = 0;
        for registration in observations.iter() {
            let matches = {
                let state = registration.state.borrow();
                state.polling && state.resource_id.as_deref() == Some(id)
            };
            if matches && registration.control.send(PollEvent::Stop).is_ok() {
                stopped += 1;
            }
        }
        if stopped > 0 {
            tracing::debug!("stopped {} observation(s) of {}", stopped, id);
        }
        stopped
    }

    /// Number of observations still polling.
    pub fn active_count(&self) -> usize {
        let mut observations = self.registry();
        observations.retain(|r| !r.control.is_closed());
        observations
            .iter()
            .filter(|r| r.state.borrow().polling)
            .count()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner's view of one observation.
///
/// Dropping the handle aborts the polling task and any pending timer.
pub struct ObservationHandle {
    cache: QueryCache,
    state: watch::Receiver<PollState>,
    control: mpsc::UnboundedSender<PollEvent>,
    task: JoinHandle<()>,
}

impl ObservationHandle {
    pub fn resource_id(&self) -> Option<String> {
        self.state.borrow().resource_id.clone()
    }

    /// Latest cached snapshot of the observed appliance.
    pub fn current_snapshot(&self) -> Option<Appliance> {
        self.resource_id().and_then(|id| self.cache.appliance(&id))
    }

    pub fn is_polling(&self) -> bool {
        self.state.borrow().polling
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Observe a different appliance, resetting transition bookkeeping.
    pub fn switch(&self, id: &str) {
        let known = self.cache.appliance(id).map(|a| a.status);
        let _ = self.control.send(PollEvent::Observe {
            id: id.to_string(),
            known,
        });
    }

    pub fn stop(&self) {
        let _ = self.control.send(PollEvent::Stop);
    }

    /// Wait until polling has stopped, either on a terminal state or via
    /// [`ObservationHandle::stop`].
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| !s.polling).await;
    }
}

impl Drop for ObservationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct PollLoop {
    source: Arc<dyn SnapshotSource>,
    cache: QueryCache,
    intervals: PollIntervals,
    notify_tx: mpsc::UnboundedSender<PollNotification>,
    state_tx: watch::Sender<PollState>,
}

impl PollLoop {
    fn apply(
        &self,
        state: PollState,
        event: PollEvent,
        effects: &mut VecDeque<PollEffect>,
    ) -> PollState {
        let (next, new_effects) = reduce(state, event, &self.intervals);
        self.state_tx.send_replace(next.clone());
        effects.extend(new_effects);
        next
    }

    async fn run(
        self,
        mut state: PollState,
        initial: Vec<PollEffect>,
        mut control: mpsc::UnboundedReceiver<PollEvent>,
    ) {
        let mut effects: VecDeque<PollEffect> = initial.into();
        let mut deadline: Option<Instant> = None;

        loop {
            while let Some(effect) = effects.pop_front() {
                match effect {
                    PollEffect::Fetch(id) => {
                        let result = self.source.fetch_one(&id).await;

                        // Commands sent while the fetch was in flight (stop,
                        // switch) win over its result
                        while let Ok(command) = control.try_recv() {
                            state = self.apply(state, command, &mut effects);
                        }

                        let event = match result {
                            Ok(snapshot) => self.merge(&state, &id, snapshot),
                            Err(err) => {
                                if !err.is_cancellation() {
                                    tracing::warn!("poll of appliance {} failed: {}", id, err);
                                }
                                Some(PollEvent::FetchFailed)
                            }
                        };
                        if let Some(event) = event {
                            state = self.apply(state, event, &mut effects);
                        }
                    }
                    PollEffect::Schedule(interval) => {
                        deadline = Some(Instant::now() + interval);
                    }
                    PollEffect::Notify(notification) => {
                        tracing::info!("{}", notification.message());
                        if self.notify_tx.send(notification).is_err() {
                            tracing::debug!("notification channel closed");
                        }
                    }
                    PollEffect::Stopped => {
                        deadline = None;
                        tracing::debug!("polling stopped for {:?}", state.resource_id);
                    }
                }
            }

            let event = tokio::select! {
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    PollEvent::Tick
                }
                command = control.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            state = self.apply(state, event, &mut effects);
        }
    }

    /// Merge a fetched snapshot and return the cache's resulting view, or
    /// `None` if the observation moved on while the fetch was in flight.
    fn merge(&self, state: &PollState, id: &str, snapshot: Appliance) -> Option<PollEvent> {
        if !state.polling || state.resource_id.as_deref() != Some(id) {
            tracing::debug!("discarding poll result for {}: no longer observed", id);
            return None;
        }
        let fallback = snapshot.clone().normalized();
        if let Err(reason) = self.cache.merge_appliance(snapshot) {
            tracing::debug!("dropped poll update: {}", reason);
        }
        Some(PollEvent::Fetched(
            self.cache.appliance(id).unwrap_or(fallback),
        ))
    }
}

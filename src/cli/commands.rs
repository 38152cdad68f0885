//! Handlers behind each CLI command.
//!
//! Output is plain lines on stdout; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{eyre, Result};
use tokio::sync::mpsc;

use crate::actions::ApplianceActions;
use crate::cache::QueryCache;
use crate::client::KitchenClient;
use crate::config::ClientConfig;
use crate::models::{Appliance, TailorKey, TailoringRun};
use crate::poller::{ObservationHandle, PollNotification, StatusPoller};
use crate::tailoring::{RunOutcome, TailorUpdate, TailoringController};

/// How often `watch` samples the cached snapshot for progress lines.
const PROGRESS_SAMPLE: Duration = Duration::from_millis(250);

/// Shared pieces every command works against.
pub struct Hub {
    client: KitchenClient,
    cache: QueryCache,
    config: ClientConfig,
}

impl Hub {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = KitchenClient::new(&config)?;
        Ok(Self {
            client,
            cache: QueryCache::new(),
            config,
        })
    }

    pub fn with_client(config: ClientConfig, client: KitchenClient) -> Self {
        Self {
            client,
            cache: QueryCache::new(),
            config,
        }
    }

    fn poller(&self) -> Result<(StatusPoller, mpsc::UnboundedReceiver<PollNotification>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let poller = StatusPoller::new(
            Arc::new(self.client.clone()),
            self.cache.clone(),
            self.config.poll_intervals,
            tx,
        )?;
        Ok((poller, rx))
    }

    /// Poll `id` until its manual is ready or failed.
    pub async fn watch(&self, id: &str) -> Result<()> {
        let (poller, mut notifications) = self.poller()?;
        let handle = poller.observe(id);
        follow(&handle, &mut notifications).await;

        match handle.current_snapshot() {
            Some(snapshot) => {
                println!("{}", describe(&snapshot));
                Ok(())
            }
            None => Err(eyre!("appliance {} could not be fetched", id)),
        }
    }

    /// Requeue a failed appliance and watch it.
    pub async fn retry(&self, id: &str) -> Result<()> {
        let actions = ApplianceActions::new(self.client.clone(), self.cache.clone());
        let requeued = actions.retry(id).await?;
        println!("{}", describe(&requeued));
        self.watch(id).await
    }

    /// Stream a tailored recipe, printing progress as it arrives.
    pub async fn tailor(&self, key: TailorKey) -> Result<()> {
        let (tx, mut updates) = mpsc::unbounded_channel();
        let controller = TailoringController::new(self.client.clone(), self.cache.clone(), tx);
        controller.start(key.clone())?;

        let outcome = loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(TailorUpdate::Status(message)) => println!("... {}", message),
                    Some(TailorUpdate::Run(_)) | Some(TailorUpdate::Unrecognized(_)) => {}
                    Some(TailorUpdate::Finished(outcome)) => break Some(outcome),
                    None => break None,
                },
                _ = tokio::signal::ctrl_c() => {
                    controller.cancel();
                }
            }
        };

        if let Some(run) = self.cache.run(&key) {
            print_run(&run);
        }
        match outcome {
            Some(RunOutcome::Complete) => Ok(()),
            Some(RunOutcome::Cancelled) => {
                println!("cancelled");
                Ok(())
            }
            Some(RunOutcome::Failed { message, retryable }) => {
                let hint = if retryable { " (try again)" } else { "" };
                Err(eyre!("tailoring failed: {}{}", message, hint))
            }
            None => Err(eyre!("tailoring stopped without an outcome")),
        }
    }

    /// Print the stored run for `key` without streaming.
    pub async fn history(&self, key: TailorKey) -> Result<()> {
        let (tx, _updates) = mpsc::unbounded_channel();
        let controller = TailoringController::new(self.client.clone(), self.cache.clone(), tx);
        match controller.load(&key).await? {
            Some(run) => print_run(&run),
            None => println!("no tailored recipe stored for {}", key),
        }
        Ok(())
    }
}

/// Print notifications and progress until polling stops or Ctrl-C.
async fn follow(
    handle: &ObservationHandle,
    notifications: &mut mpsc::UnboundedReceiver<PollNotification>,
) {
    let mut last_line: Option<String> = None;
    let mut sample = tokio::time::interval(PROGRESS_SAMPLE);

    loop {
        tokio::select! {
            Some(notification) = notifications.recv() => {
                println!("{}", notification.message());
            }
            _ = handle.stopped() => break,
            _ = sample.tick() => {
                if let Some(snapshot) = handle.current_snapshot() {
                    let line = describe(&snapshot);
                    if last_line.as_deref() != Some(line.as_str()) {
                        println!("{}", line);
                        last_line = Some(line);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.stop();
                break;
            }
        }
    }

    while let Ok(notification) = notifications.try_recv() {
        println!("{}", notification.message());
    }
}

pub(crate) fn describe(appliance: &Appliance) -> String {
    let mut line = format!(
        "{} [{}] {} {}%",
        appliance.display_name(),
        appliance.id,
        appliance.status.as_str(),
        appliance.progress
    );
    if let Some(detail) = &appliance.detail {
        line.push_str(": ");
        line.push_str(detail);
    }
    line
}

fn print_run(run: &TailoringRun) {
    println!("{} [{}] {:?}", run.recipe_id, run.appliance_ids.join(","), run.status);
    if let Some(summary) = &run.summary {
        println!("{}", summary);
    }
    if !run.recommended_appliances.is_empty() {
        println!("recommended: {}", run.recommended_appliances.join(", "));
    }
    for block in &run.blocks {
        match block.duration_minutes {
            Some(minutes) => println!("{}. {} ({} min)", block.order, block.title, minutes),
            None => println!("{}. {}", block.order, block.title),
        }
        if !block.content.is_empty() {
            println!("   {}", block.content);
        }
    }
    if let Some(message) = &run.error_message {
        println!("error: {}", message);
    }
}

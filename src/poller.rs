use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::events::{extract, InboundMessage, Skip};
use crate::error::ApiError;
use crate::session::Session;

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    Appended(InboundMessage),
    Dropped(Skip),
}

impl Session {
    /// One poll tick: fetch at most one notification, merge it if it carries
    /// a text message, then delete it from the gateway queue.
    ///
    /// The receipt is deleted whether or not the payload was usable. If the
    /// delete fails after a message was appended, the gateway will deliver it
    /// again and it will be appended twice.
    pub async fn poll_once(&self) -> Result<TickOutcome, ApiError> {
        let Some(notification) = self.gateway.receive_notification().await? else {
            return Ok(TickOutcome::Idle);
        };
        let Some(body) = notification.parse_body() else {
            return Ok(TickOutcome::Idle);
        };

        let extracted = body
            .map_err(|e| Skip::Malformed(e.to_string()))
            .and_then(|body| extract(&body));
        let outcome = match extracted {
            Ok(inbound) => {
                self.append(&inbound.phone_number, inbound.message.clone());
                TickOutcome::Appended(inbound)
            }
            Err(skip) => {
                debug!("dropping notification {:?}: {skip}", notification.receipt_id);
                TickOutcome::Dropped(skip)
            }
        };

        if let Some(receipt_id) = notification.receipt_id.as_deref() {
            self.gateway.delete_notification(receipt_id).await?;
        }
        Ok(outcome)
    }
}

/// Repeating poll task bound to a session's lifetime.
pub struct Poller;

impl Poller {
    /// Spawns the poll loop. The first tick fires one `period` after start.
    pub fn start(session: Arc<Session>, period: Duration) -> PollerHandle {
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("polling instance {} every {:?}", session.instance_id(), period);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        // Errors end the tick only; the next one runs on schedule.
                        if let Err(e) = session.poll_once().await {
                            warn!("Error checking messages: {e}");
                        }
                    }
                }
            }
            info!("poller for instance {} stopped", session.instance_id());
        });
        PollerHandle { shutdown: Some(shutdown), task }
    }
}

pub struct PollerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stops the loop and waits for an in-flight tick to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

//! The update-relay loop — poll, filter, echo, persist, advance watermark.
//!
//! One cooperative loop owns the watermark and the store handle; nothing
//! else reads or writes either. Shutdown is a flag flipped by a signal
//! listener and polled at the loop's two yield points (cycle boundary and
//! just before the sleep), so an in-flight relay/record pair is never
//! interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::filter;
use crate::store::{DeliveryRecord, DeliveryStore};
use crate::telegram::Transport;

/// The relay loop. Owns the in-memory watermark exclusively.
pub struct RelayLoop {
    transport: Arc<dyn Transport>,
    store: Arc<dyn DeliveryStore>,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
    watermark: i64,
}

impl RelayLoop {
    /// Build a loop with its watermark recovered from the store.
    ///
    /// A store read failure here is fatal: without `MAX(ts)` no watermark
    /// can be trusted and resuming would risk double delivery.
    pub async fn recover(
        transport: Arc<dyn Transport>,
        store: Arc<dyn DeliveryStore>,
        poll_interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, StoreError> {
        let watermark = store.initial_watermark().await?;
        info!(watermark, "Watermark recovered from store");
        Ok(Self {
            transport,
            store,
            poll_interval,
            stop,
            watermark,
        })
    }

    /// Current watermark: every message with `ts` at or below this has been
    /// relayed and durably recorded.
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// Run until the stop flag is set. Store failures propagate out; the
    /// caller turns them into a non-zero exit.
    pub async fn run(mut self) -> Result<(), StoreError> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Relay loop running"
        );

        loop {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            self.run_cycle().await?;

            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!(watermark = self.watermark, "Relay loop stopped");
        Ok(())
    }

    /// One poll cycle: fetch → filter → per-message relay+record → advance.
    ///
    /// The watermark snapshot taken at entry is used for the whole cycle,
    /// and it only moves after every message's send/append pair finished.
    /// A crash mid-cycle therefore leaves the in-memory watermark behind
    /// the store's true `MAX(ts)` — the restart replays at most this batch
    /// and the strict `ts > watermark` filter drops what was already
    /// recorded.
    pub async fn run_cycle(&mut self) -> Result<(), StoreError> {
        let batch = self.transport.fetch_updates().await.unwrap_or_default();
        let messages = filter::new_messages(&batch, self.watermark);

        if messages.is_empty() {
            debug!("No new messages this cycle");
        } else {
            info!(count = messages.len(), "New messages received");
        }

        for msg in &messages {
            // A failed send is logged, not retried; the record below still
            // lands, so one undeliverable chat cannot stall the loop.
            if let Err(e) = self.transport.send_message(msg.chat_id, &msg.text).await {
                warn!(
                    chat_id = msg.chat_id,
                    ts = msg.ts,
                    error = %e,
                    "Send failed; message is still marked processed"
                );
            }

            self.store
                .append(&DeliveryRecord {
                    text: msg.text.clone(),
                    chat_id: msg.chat_id,
                    ts: msg.ts,
                })
                .await?;
        }

        if let Some(max_ts) = messages.iter().map(|m| m.ts).max() {
            self.watermark = self.watermark.max(max_ts);
            debug!(watermark = self.watermark, "Watermark advanced");
        }

        Ok(())
    }
}

/// Spawn a task that flips `stop` on SIGINT or SIGTERM.
///
/// The flag is only ever read at the relay loop's yield points; the signal
/// handler itself touches no loop state.
pub fn spawn_signal_listener(stop: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                    stop.store(true, Ordering::Relaxed);
                    info!("Stop requested; finishing current cycle");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        stop.store(true, Ordering::Relaxed);
        info!("Stop requested; finishing current cycle");
    })
}

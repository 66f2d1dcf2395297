//! Background listener for execution-progress notifications.
//!
//! Runs as a tokio task for the lifetime of the session, reading raw status
//! bytes from the runner socket. Error handling is typed rather than a
//! blanket suppress: a clean close terminates the listener and marks the
//! session dead; transient read errors retry with backoff up to a bounded
//! failure budget; malformed tokens are discarded per message.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::oneshot;
use tokio::task;

use super::history::{SessionShared, StatusUpdate};
use super::wire::parse_status_tokens;

/// Receive buffer size for one status read.
const RECV_BUFFER: usize = 1024;

/// Consecutive read failures tolerated before the session is torn down.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Base backoff between failed reads; scales linearly with the failure run.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Handle to the spawned listener task.
///
/// Dropping the handle aborts the task; [`shutdown`](Self::shutdown) stops
/// it cooperatively.
pub(crate) struct StatusListenerHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: task::JoinHandle<()>,
}

impl StatusListenerHandle {
    pub(crate) async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for StatusListenerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

/// Spawn the status listener on the read half of the runner socket.
///
/// Parsed node IDs are appended to the shared execution history under the
/// status lock and republished on `updates` for streaming consumers; the
/// repaint flag is set so the UI's poll cycle picks up the change.
pub(crate) fn spawn(
    mut reader: OwnedReadHalf,
    shared: Arc<SessionShared>,
    updates: flume::Sender<StatusUpdate>,
) -> StatusListenerHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let handle = task::spawn(async move {
        let mut buf = [0u8; RECV_BUFFER];
        let mut failures: u32 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        tracing::debug!("runner closed the status channel");
                        shared.mark_dead();
                        break;
                    }
                    Ok(n) => {
                        failures = 0;
                        let ids = parse_status_tokens(&buf[..n]);
                        if ids.is_empty() {
                            continue;
                        }
                        tracing::trace!(count = ids.len(), "status update received");
                        shared.push_executed(&ids);
                        // A full channel means no consumer is keeping up;
                        // drop the batch rather than stall the listener.
                        let _ = updates.try_send(StatusUpdate { executed: ids });
                        shared.request_repaint();
                    }
                    Err(e) => {
                        failures += 1;
                        if failures >= MAX_CONSECUTIVE_FAILURES {
                            tracing::warn!(
                                error = %e,
                                failures,
                                "status channel failing persistently; tearing down session"
                            );
                            shared.mark_dead();
                            break;
                        }
                        tracing::debug!(error = %e, failures, "transient status read error");
                        tokio::time::sleep(RETRY_BACKOFF * failures).await;
                    }
                }
            }
        }
    });

    StatusListenerHandle {
        shutdown_tx: Some(shutdown_tx),
        handle,
    }
}

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::{RequestDescriptor, RequestTemplate};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};

/// Sends `total` descriptors in order, then drops `tx`.
///
/// Stops early when shutdown is signalled or every receiver is gone.
/// Returns how many descriptors were handed off.
pub async fn dispatch(
    template: RequestTemplate,
    total: u64,
    tx: mpsc::Sender<RequestDescriptor>,
    shutdown_rx: &mut ShutdownReceiver,
) -> u64 {
    let mut sent: u64 = 0;
    while sent < total {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                debug!("Dispatch stopped by shutdown after {} of {} requests.", sent, total);
                break;
            }
            delivered = tx.send(template.descriptor()) => {
                if delivered.is_err() {
                    debug!("Request channel closed after {} of {} requests.", sent, total);
                    break;
                }
                sent = sent.saturating_add(1);
            }
        }
    }
    sent
}

pub fn spawn_dispatcher(
    template: RequestTemplate,
    total: u64,
    tx: mpsc::Sender<RequestDescriptor>,
    shutdown_tx: &ShutdownSender,
) -> JoinHandle<u64> {
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move { dispatch(template, total, tx, &mut shutdown_rx).await })
}

use tokio::sync::broadcast;

/// Run-wide stop signal: fatal transport errors and run completion.
pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

const SHUTDOWN_CHANNEL_CAPACITY: usize = 4;

#[must_use]
pub fn shutdown_channel() -> ShutdownSender {
    let (shutdown_tx, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);
    shutdown_tx
}

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::args::{PositiveUsize, TransportErrorPolicy};
use crate::domain::RequestDescriptor;
use crate::error::HttpError;
use crate::metrics::{Outcome, ResultRecord};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};

use super::{TraceRecorder, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub policy: TransportErrorPolicy,
    /// Bounds the whole exchange, body included.
    pub request_timeout: Option<Duration>,
}

/// Channel ends handed to the worker pool.
pub struct WorkerChannels {
    pub requests: mpsc::Receiver<RequestDescriptor>,
    pub results: mpsc::Sender<ResultRecord>,
    /// Receives the first fatal error under [`TransportErrorPolicy::Abort`].
    pub fatal: mpsc::Sender<HttpError>,
}

struct Worker {
    id: usize,
    transport: Transport,
    requests: Arc<Mutex<mpsc::Receiver<RequestDescriptor>>>,
    results: mpsc::Sender<ResultRecord>,
    fatal: mpsc::Sender<HttpError>,
    settings: WorkerSettings,
    shutdown_tx: ShutdownSender,
}

/// Spawns exactly `concurrency` workers sharing one request receiver.
pub fn spawn_workers(
    concurrency: PositiveUsize,
    transport: &Transport,
    channels: WorkerChannels,
    settings: WorkerSettings,
    shutdown_tx: &ShutdownSender,
) -> Vec<JoinHandle<()>> {
    let WorkerChannels {
        requests,
        results,
        fatal,
    } = channels;
    let requests = Arc::new(Mutex::new(requests));

    (0..concurrency.get())
        .map(|id| {
            let worker = Worker {
                id,
                transport: transport.clone(),
                requests: Arc::clone(&requests),
                results: results.clone(),
                fatal: fatal.clone(),
                settings,
                shutdown_tx: shutdown_tx.clone(),
            };
            let shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(worker.run(shutdown_rx))
        })
        .collect()
}

impl Worker {
    async fn run(self, mut shutdown_rx: ShutdownReceiver) {
        loop {
            let next = tokio::select! {
                _ = shutdown_rx.recv() => break,
                descriptor = self.next_request() => descriptor,
            };
            let Some(descriptor) = next else {
                break;
            };

            let mut trace = TraceRecorder::start();
            let attempt = tokio::select! {
                _ = shutdown_rx.recv() => break,
                attempt = self.execute(&descriptor, &mut trace) => attempt,
            };

            let record = match attempt {
                Ok(status) => ResultRecord::new(Outcome::Status(status.as_u16()), trace.finish()),
                Err(err) => match self.settings.policy {
                    TransportErrorPolicy::Abort => {
                        error!(
                            "Worker {} request to {} failed: {}",
                            self.id,
                            descriptor.endpoint(),
                            err
                        );
                        drop(self.fatal.try_send(err));
                        drop(self.shutdown_tx.send(()));
                        break;
                    }
                    TransportErrorPolicy::Record => {
                        warn!(
                            "Worker {} request to {} failed: {}",
                            self.id,
                            descriptor.endpoint(),
                            err
                        );
                        ResultRecord::new(Outcome::TransportError(err.failure()), trace.finish())
                    }
                },
            };

            if self.results.send(record).await.is_err() {
                debug!("Worker {} stopping: result channel closed.", self.id);
                break;
            }
        }
    }

    async fn next_request(&self) -> Option<RequestDescriptor> {
        self.requests.lock().await.recv().await
    }

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        trace: &mut TraceRecorder,
    ) -> Result<StatusCode, HttpError> {
        let exchange = async {
            let response = self.transport.send(descriptor, trace).await?;
            let status = response.status();
            response.drain(trace).await?;
            Ok::<_, HttpError>(status)
        };
        match self.settings.request_timeout {
            Some(after) => timeout(after, exchange)
                .await
                .map_err(|err| HttpError::Timeout { after, source: err })?,
            None => exchange.await,
        }
    }
}

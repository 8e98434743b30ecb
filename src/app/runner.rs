use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{RequestTemplate, RunConfig};
use crate::error::{AppError, AppResult};
use crate::http::{
    ConnectionCounters, Transport, TransportConfig, WorkerChannels, WorkerSettings,
    spawn_dispatcher, spawn_workers,
};
use crate::metrics::{AggregateStats, Evaluator, ProgressCounter};
use crate::shutdown::ShutdownSender;

/// Closest to an unbuffered hand-off: one descriptor waits while workers are busy.
const REQUEST_CHANNEL_CAPACITY: usize = 1;
const FATAL_CHANNEL_CAPACITY: usize = 1;

/// A validated run, ready to start.
#[derive(Debug)]
pub struct LoadTest {
    config: RunConfig,
    template: RequestTemplate,
    transport: Transport,
}

impl LoadTest {
    /// Validates the request shape and builds the shared transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be built or TLS is unavailable.
    pub fn new(config: RunConfig) -> AppResult<Self> {
        let template = RequestTemplate::new(&config)?;
        let transport_config = TransportConfig::for_concurrency(config.concurrency)
            .with_connect_timeout(config.connect_timeout);
        let transport = Transport::new(transport_config, config.uses_tls())?;
        Ok(Self {
            config,
            template,
            transport,
        })
    }

    #[must_use]
    pub fn connections(&self) -> Arc<ConnectionCounters> {
        self.transport.counters()
    }

    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs dispatcher, workers and evaluator to completion.
    ///
    /// Shutdown is broadcast once the run ends, successfully or not.
    ///
    /// # Errors
    ///
    /// Returns the first fatal transport error, or an error when results stop
    /// arriving before every request has been accounted for.
    pub async fn run(
        self,
        progress: ProgressCounter,
        shutdown_tx: &ShutdownSender,
    ) -> AppResult<AggregateStats> {
        let Self {
            config,
            template,
            transport,
        } = self;

        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (results_tx, results_rx) = mpsc::channel(config.concurrency.get());
        let (fatal_tx, mut fatal_rx) = mpsc::channel(FATAL_CHANNEL_CAPACITY);

        let run_start = Instant::now();
        let dispatcher =
            spawn_dispatcher(template, config.total_requests, requests_tx, shutdown_tx);
        let workers = spawn_workers(
            config.concurrency,
            &transport,
            WorkerChannels {
                requests: requests_rx,
                results: results_tx,
                fatal: fatal_tx,
            },
            WorkerSettings {
                policy: config.error_policy,
                request_timeout: config.request_timeout,
            },
            shutdown_tx,
        );
        let evaluation = Evaluator::new(config.total_requests, config.average, progress)
            .evaluate(results_rx, run_start);

        let outcome = tokio::select! {
            biased;
            Some(err) = fatal_rx.recv() => Err(AppError::http(err)),
            evaluated = evaluation => evaluated.map_err(AppError::metrics),
        };
        drop(shutdown_tx.send(()));

        match outcome {
            Ok(stats) => {
                for worker in workers {
                    worker.await?;
                }
                let dispatched = dispatcher.await?;
                debug!("Dispatched {} requests.", dispatched);
                debug!(
                    "Run finished: {} succeeded, {} failed in {:?}.",
                    stats.succeeded, stats.failed, stats.elapsed
                );
                Ok(stats)
            }
            Err(err) => {
                for worker in &workers {
                    worker.abort();
                }
                dispatcher.abort();
                Err(err)
            }
        }
    }
}

/// Validates `config` and runs it to completion.
///
/// # Errors
///
/// See [`LoadTest::new`] and [`LoadTest::run`].
pub async fn run_load_test(
    config: RunConfig,
    progress: ProgressCounter,
    shutdown_tx: &ShutdownSender,
) -> AppResult<AggregateStats> {
    LoadTest::new(config)?.run(progress, shutdown_tx).await
}

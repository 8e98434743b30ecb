mod support;

use std::future::Future;
use std::time::Duration;

use volley::app::run_load_test;
use volley::args::{AverageMode, HttpMethod, PositiveUsize, TransportErrorPolicy};
use volley::domain::RunConfig;
use volley::error::{AppError, EXIT_TRANSPORT_ERROR, TransportFailure};
use volley::metrics::{AggregateStats, ProgressCounter};
use volley::shutdown::shutdown_channel;

use support::{ServerOptions, refused_url, spawn_http_server};

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn config(url: &str, total: u64, concurrency: usize) -> Result<RunConfig, String> {
    let concurrency = PositiveUsize::try_from(concurrency).map_err(|err| err.to_string())?;
    RunConfig::new(url, total, concurrency).map_err(|err| err.to_string())
}

async fn run(config: RunConfig) -> Result<AggregateStats, AppError> {
    let shutdown_tx = shutdown_channel();
    run_load_test(config, ProgressCounter::new(), &shutdown_tx).await
}

#[test]
fn all_ok_run_reuses_connections() -> Result<(), String> {
    let (url, server) = spawn_http_server(ServerOptions::default())?;
    run_async_test(async {
        let stats = run(config(&url, 10, 2)?)
            .await
            .map_err(|err| err.to_string())?;
        if stats.succeeded != 10 || stats.failed != 0 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        if stats.requests_per_second.is_zero() {
            return Err("Expected a positive request rate".to_owned());
        }
        if stats.reused_connections < 8 || stats.new_connections > 2 {
            return Err(format!(
                "Unexpected connections: new={} reused={}",
                stats.new_connections, stats.reused_connections
            ));
        }
        if stats.bytes_received != 20 {
            return Err(format!("Unexpected bytes: {}", stats.bytes_received));
        }
        if stats.min_latency > stats.max_latency || stats.max_latency > stats.elapsed {
            return Err(format!("Latency bounds out of order: {:?}", stats));
        }
        Ok(())
    })?;
    if server.stats().requests() != 10 {
        return Err(format!("Server saw {} requests", server.stats().requests()));
    }
    Ok(())
}

#[test]
fn unavailable_responses_are_failures() -> Result<(), String> {
    let (url, _server) = spawn_http_server(ServerOptions {
        status: 503,
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let stats = run(config(&url, 5, 5)?)
            .await
            .map_err(|err| err.to_string())?;
        if stats.succeeded != 0 || stats.failed != 5 || stats.transport_errors != 0 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        Ok(())
    })
}

#[test]
fn server_errors_are_failures() -> Result<(), String> {
    let (url, _server) = spawn_http_server(ServerOptions {
        status: 500,
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let stats = run(config(&url, 4, 2)?)
            .await
            .map_err(|err| err.to_string())?;
        if stats.succeeded != 0 || stats.failed != 4 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        Ok(())
    })
}

#[test]
fn zero_requests_complete_immediately() -> Result<(), String> {
    let (url, server) = spawn_http_server(ServerOptions::default())?;
    run_async_test(async {
        let stats = run(config(&url, 0, 3)?)
            .await
            .map_err(|err| err.to_string())?;
        if stats.succeeded != 0 || stats.failed != 0 || !stats.requests_per_second.is_zero() {
            return Err(format!("Unexpected stats: {:?}", stats));
        }
        Ok(())
    })?;
    if server.stats().requests() != 0 {
        return Err("No request should reach the server".to_owned());
    }
    Ok(())
}

#[test]
fn in_flight_requests_never_exceed_concurrency() -> Result<(), String> {
    let (url, server) = spawn_http_server(ServerOptions {
        delay: Duration::from_millis(20),
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let stats = run(config(&url, 20, 3)?)
            .await
            .map_err(|err| err.to_string())?;
        if stats.succeeded != 20 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        Ok(())
    })?;
    let max_in_flight = server.stats().max_in_flight();
    if max_in_flight == 0 || max_in_flight > 3 {
        return Err(format!("Unexpected max in flight: {}", max_in_flight));
    }
    if server.stats().connections() > 3 {
        return Err(format!(
            "Opened {} connections for 3 workers",
            server.stats().connections()
        ));
    }
    Ok(())
}

#[test]
fn record_policy_counts_refused_connections() -> Result<(), String> {
    let url = refused_url()?;
    run_async_test(async {
        let mut run_config = config(&url, 6, 2)?;
        run_config.error_policy = TransportErrorPolicy::Record;
        let stats = run(run_config).await.map_err(|err| err.to_string())?;
        if stats.failed != 6 || stats.transport_errors != 6 || stats.succeeded != 0 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        if stats.transport_error_kinds.get(TransportFailure::Connect) != 6 {
            return Err(format!("Unexpected kinds: {:?}", stats.transport_error_kinds));
        }
        Ok(())
    })
}

#[test]
fn abort_policy_fails_the_run() -> Result<(), String> {
    let url = refused_url()?;
    run_async_test(async {
        match run(config(&url, 6, 2)?).await {
            Err(err @ AppError::Http(_)) if err.exit_code() == EXIT_TRANSPORT_ERROR => Ok(()),
            Err(err) => Err(format!("Unexpected error: {}", err)),
            Ok(stats) => Err(format!("Expected failure, got {:?}", stats)),
        }
    })
}

#[test]
fn request_timeout_is_a_transport_error() -> Result<(), String> {
    let (url, _server) = spawn_http_server(ServerOptions {
        delay: Duration::from_millis(300),
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let mut run_config = config(&url, 2, 2)?;
        run_config.error_policy = TransportErrorPolicy::Record;
        run_config.request_timeout = Some(Duration::from_millis(50));
        let stats = run(run_config).await.map_err(|err| err.to_string())?;
        if stats.transport_errors != 2 {
            return Err(format!("Unexpected stats: {:?}", stats));
        }
        if stats.new_connections != 2 || stats.reused_connections != 0 {
            return Err(format!(
                "Timed out requests must still count their connections: {:?}",
                stats
            ));
        }
        Ok(())
    })?;

    let (slow_url, _slow_server) = spawn_http_server(ServerOptions {
        delay: Duration::from_millis(300),
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let mut run_config = config(&slow_url, 1, 1)?;
        run_config.request_timeout = Some(Duration::from_millis(50));
        match run(run_config).await {
            Err(AppError::Http(err)) if err.failure() == TransportFailure::Timeout => Ok(()),
            other => Err(format!("Expected a timeout, got {:?}", other.map(|_| ()))),
        }
    })
}

#[test]
fn truncated_bodies_are_recorded_or_fatal() -> Result<(), String> {
    let (url, server) = spawn_http_server(ServerOptions {
        truncate_body: true,
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let mut run_config = config(&url, 3, 1)?;
        run_config.error_policy = TransportErrorPolicy::Record;
        let stats = run(run_config).await.map_err(|err| err.to_string())?;
        if stats.succeeded != 0 || stats.failed != 3 || stats.transport_errors != 3 {
            return Err(format!("Unexpected counts: {:?}", stats));
        }
        if stats.transport_error_kinds.get(TransportFailure::Body) != 3 {
            return Err(format!("Unexpected kinds: {:?}", stats.transport_error_kinds));
        }
        if stats.new_connections != 3 || stats.reused_connections != 0 {
            return Err(format!("Unexpected connection totals: {:?}", stats));
        }
        Ok(())
    })?;
    if server.stats().requests() != 3 {
        return Err(format!(
            "Expected three requests, saw {}",
            server.stats().requests()
        ));
    }

    run_async_test(async {
        match run(config(&url, 3, 1)?).await {
            Err(AppError::Http(err)) if err.failure() == TransportFailure::Body => Ok(()),
            other => Err(format!("Expected a body error, got {:?}", other.map(|_| ()))),
        }
    })
}

#[test]
fn post_bodies_keep_connections_alive() -> Result<(), String> {
    let (url, server) = spawn_http_server(ServerOptions::default())?;
    run_async_test(async {
        let mut run_config = config(&url, 6, 1)?;
        run_config.method = HttpMethod::Post;
        run_config.body = Some("{\"hello\":\"world\"}".to_owned());
        run_config.average = AverageMode::Mean;
        let stats = run(run_config).await.map_err(|err| err.to_string())?;
        if stats.succeeded != 6 || stats.reused_connections != 5 {
            return Err(format!("Unexpected stats: {:?}", stats));
        }
        Ok(())
    })?;
    if server.stats().connections() != 1 {
        return Err(format!(
            "Expected one connection, saw {}",
            server.stats().connections()
        ));
    }
    Ok(())
}

#[test]
fn progress_is_monotonic_and_reaches_total() -> Result<(), String> {
    let (url, _server) = spawn_http_server(ServerOptions {
        delay: Duration::from_millis(2),
        ..ServerOptions::default()
    })?;
    run_async_test(async {
        let progress = ProgressCounter::new();
        let view = progress.view();
        let sampler_view = view.clone();
        let sampler = tokio::spawn(async move {
            let mut samples = Vec::new();
            for _ in 0..200 {
                samples.push(sampler_view.completed());
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            samples
        });

        let shutdown_tx = shutdown_channel();
        let stats = run_load_test(config(&url, 25, 4)?, progress, &shutdown_tx)
            .await
            .map_err(|err| err.to_string())?;
        let samples = sampler.await.map_err(|err| err.to_string())?;

        if samples.windows(2).any(|pair| pair.first() > pair.get(1)) {
            return Err(format!("Progress went backwards: {:?}", samples));
        }
        if samples.iter().any(|sample| *sample > 25) {
            return Err("Progress overshot the total".to_owned());
        }
        if view.completed() != 25 || stats.succeeded != 25 {
            return Err(format!(
                "Expected 25 completed, got {} ({:?})",
                view.completed(),
                stats
            ));
        }
        Ok(())
    })
}

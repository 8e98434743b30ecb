use std::ffi::OsString;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::info;

use crate::app::{self, LoadTest};
use crate::args::RunArgs;
use crate::config::{apply_config, load_config};
use crate::domain::RunConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::ProgressCounter;
use crate::shutdown::shutdown_channel;

/// Binary entry point: parses arguments, runs the test and maps errors to exit codes.
#[must_use]
pub fn run() -> ExitCode {
    run_from(std::env::args_os())
}

/// Same as [`run`] with explicit arguments.
#[must_use]
pub fn run_from<I, T>(raw_args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let (args, matches) = match parse_args(raw_args) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return ExitCode::SUCCESS,
        Err(err) => return report_failure(&err),
    };

    crate::logger::init_logging(args.verbose, args.no_color);

    match execute(args, &matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

fn report_failure(err: &AppError) -> ExitCode {
    if let AppError::Clap { source } = err {
        drop(source.print());
    } else {
        eprintln!("Error: {}", err);
    }
    ExitCode::from(err.exit_code())
}

fn parse_args<I, T>(raw_args: I) -> AppResult<Option<(RunArgs, ArgMatches)>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = match RunArgs::command().try_get_matches_from(raw_args) {
        Ok(matches) => matches,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let args = RunArgs::from_arg_matches(&matches)?;
    Ok(Some((args, matches)))
}

fn execute(mut args: RunArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, matches, &config)?;
    }
    let config = RunConfig::from_args(&args)?;
    let load_test = LoadTest::new(config)?;
    log_run_banner(load_test.config());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let stats = runtime.block_on(async {
        let shutdown_tx = shutdown_channel();
        let progress = ProgressCounter::new();
        let indicator = (!args.no_progress).then(|| {
            app::setup_progress_indicator(
                load_test.config().total_requests,
                progress.view(),
                load_test.connections(),
                args.no_color,
                &shutdown_tx,
            )
        });

        let result = load_test.run(progress, &shutdown_tx).await;
        if let Some(handle) = indicator {
            drop(handle.await);
        }
        result
    })?;

    app::print_summary(&stats, args.output_format, args.no_color)
}

fn log_run_banner(config: &RunConfig) {
    let cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    info!("Using {} CPUs", cpus);
    info!("URL: {}", config.url);
    info!("HTTP method: {}", config.method);
    if let Some(body) = config.body.as_deref() {
        info!("Request body: {}", body);
    }
    info!("Total number of requests: {}", config.total_requests);
    info!("Parallel requests: {}", config.concurrency.get());
}

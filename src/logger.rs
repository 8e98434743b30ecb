use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_ENV: &str = "VOLLEY_LOG";

/// Installs the global subscriber writing to stderr.
///
/// `VOLLEY_LOG` wins over `RUST_LOG`; without either the level is `info`,
/// or `debug` with `--verbose`.
pub fn init_logging(verbose: bool, no_color: bool) {
    let directive = filter_directive(verbose, |key| std::env::var(key).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("Ignoring invalid log filter '{}': {}", directive, err);
        EnvFilter::new(default_level(verbose))
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

fn filter_directive<F>(verbose: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    non_empty(LOG_ENV)
        .or_else(|| non_empty("RUST_LOG"))
        .unwrap_or_else(|| default_level(verbose).to_owned())
}

const fn default_level(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

pub const DEFAULT_TOTAL_REQUESTS: u64 = 5;
pub const DEFAULT_CONCURRENCY: usize = 1;

pub const DEFAULT_USER_AGENT: &str = concat!("volley/", env!("CARGO_PKG_VERSION"));

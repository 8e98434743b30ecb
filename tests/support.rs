use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Behaviour of the test server.
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    pub status: u16,
    pub delay: Duration,
    /// Announce a 100 byte body, send five bytes, then close the connection.
    pub truncate_body: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            delay: Duration::ZERO,
            truncate_body: false,
        }
    }
}

/// What the server observed.
#[derive(Debug, Default)]
pub struct ServerStats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: AtomicU64,
    connections: AtomicU64,
}

impl ServerStats {
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }
}

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    stats: Arc<ServerStats>,
}

impl ServerHandle {
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a keep-alive HTTP/1.1 server answering every request the same way.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_http_server(options: ServerOptions) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    server_stats.connections.fetch_add(1, Ordering::SeqCst);
                    let client_stats = Arc::clone(&server_stats);
                    thread::spawn(move || handle_client(stream, options, &client_stats));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}/", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            stats,
        },
    ))
}

/// A URL nothing listens on.
///
/// # Errors
///
/// Returns an error if a probe listener cannot be bound.
pub fn refused_url() -> Result<String, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind probe failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("probe addr failed: {}", err))?;
    drop(listener);
    Ok(format!("http://{}/", addr))
}

fn handle_client(stream: TcpStream, options: ServerOptions, stats: &ServerStats) {
    if stream.set_nonblocking(false).is_err()
        || stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .is_err()
    {
        return;
    }
    let Ok(write_half) = stream.try_clone() else {
        return;
    };
    let mut writer = write_half;
    let mut reader = BufReader::new(stream);

    loop {
        let Some(content_length) = read_request_head(&mut reader) else {
            return;
        };
        let mut body = vec![0_u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            return;
        }

        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        stats.requests.fetch_add(1, Ordering::SeqCst);
        if !options.delay.is_zero() {
            thread::sleep(options.delay);
        }
        let response = if options.truncate_body {
            format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 100\r\n\r\nhello",
                options.status,
                reason(options.status)
            )
        } else {
            format!(
                "HTTP/1.1 {} {}\r\nContent-Length: 2\r\n\r\nok",
                options.status,
                reason(options.status)
            )
        };
        stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        if writer.write_all(response.as_bytes()).is_err() || writer.flush().is_err() {
            return;
        }
        if options.truncate_body {
            return;
        }
    }
}

/// Reads one request head; returns its Content-Length, or `None` at EOF.
fn read_request_head(reader: &mut BufReader<TcpStream>) -> Option<usize> {
    let mut content_length = 0;
    let mut saw_request_line = false;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            if saw_request_line {
                return Some(content_length);
            }
            continue;
        }
        saw_request_line = true;
        if let Some((name, value)) = trimmed.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// Run the `volley` binary in `dir` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_volley<I, S>(dir: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = volley_bin()?;
    Command::new(bin)
        .args(args)
        .current_dir(dir)
        .env("VOLLEY_LOG", "error")
        .env_remove("NO_COLOR")
        .output()
        .map_err(|err| format!("run volley failed: {}", err))
}

fn volley_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_volley").map_or_else(
        || Err("CARGO_BIN_EXE_volley missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}

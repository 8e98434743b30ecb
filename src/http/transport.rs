use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::debug;

use crate::args::PositiveUsize;
use crate::domain::{Endpoint, RequestDescriptor};
use crate::error::HttpError;
use crate::metrics::ConnectionUse;

use super::TraceRecorder;

/// Pool limits of the shared transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub max_conns_per_host: usize,
    pub max_idle_per_host: usize,
    pub max_idle: usize,
    pub connect_timeout: Option<Duration>,
}

impl TransportConfig {
    /// Every pool limit set to the worker count.
    #[must_use]
    pub const fn for_concurrency(concurrency: PositiveUsize) -> Self {
        Self {
            max_conns_per_host: concurrency.get(),
            max_idle_per_host: concurrency.get(),
            max_idle: concurrency.get(),
            connect_timeout: None,
        }
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Option<Duration>) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

/// Connections opened vs. handed back from the idle pool.
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    created: AtomicU64,
    reused: AtomicU64,
}

impl ConnectionCounters {
    #[must_use]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }
}

/// Shared HTTP/1.1 client. Cloning is cheap and every clone uses the same pool.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<Inner>,
}

struct Inner {
    config: TransportConfig,
    tls: Option<tokio_native_tls::TlsConnector>,
    hosts: Mutex<HashMap<Endpoint, Arc<HostPool>>>,
    idle_total: AtomicUsize,
    counters: Arc<ConnectionCounters>,
}

struct HostPool {
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<PooledConnection>>,
    released: Notify,
}

struct PooledConnection {
    sender: SendRequest<Full<Bytes>>,
    _permit: OwnedSemaphorePermit,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.inner.config)
            .field("tls", &self.inner.tls.is_some())
            .field("counters", &self.inner.counters)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Builds the transport; the TLS connector is only created when needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the platform TLS connector cannot be built.
    pub fn new(config: TransportConfig, with_tls: bool) -> Result<Self, HttpError> {
        let tls = if with_tls {
            let connector = native_tls::TlsConnector::new()
                .map_err(|err| HttpError::TlsConnector { source: err })?;
            Some(tokio_native_tls::TlsConnector::from(connector))
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                tls,
                hosts: Mutex::new(HashMap::new()),
                idle_total: AtomicUsize::new(0),
                counters: Arc::new(ConnectionCounters::default()),
            }),
        })
    }

    #[must_use]
    pub fn counters(&self) -> Arc<ConnectionCounters> {
        Arc::clone(&self.inner.counters)
    }

    /// Sends one request and resolves once the response head has arrived.
    ///
    /// # Errors
    ///
    /// Returns an error when no connection can be obtained or the request fails.
    pub async fn send(
        &self,
        descriptor: &RequestDescriptor,
        trace: &mut TraceRecorder,
    ) -> Result<Exchange, HttpError> {
        let pool = self.host_pool(descriptor.endpoint());
        let mut connection = self.checkout(&pool, descriptor.endpoint(), trace).await?;
        let response = connection
            .sender
            .send_request(descriptor.to_request())
            .await
            .map_err(|err| HttpError::Request { source: err })?;
        trace.first_byte();
        let status = response.status();
        Ok(Exchange {
            status,
            body: response.into_body(),
            lease: Lease {
                inner: Arc::clone(&self.inner),
                pool,
                connection,
            },
        })
    }

    fn host_pool(&self, endpoint: &Endpoint) -> Arc<HostPool> {
        let mut hosts = lock(&self.inner.hosts);
        let pool = hosts.entry(endpoint.clone()).or_insert_with(|| {
            Arc::new(HostPool {
                permits: Arc::new(Semaphore::new(self.inner.config.max_conns_per_host)),
                idle: Mutex::new(Vec::new()),
                released: Notify::new(),
            })
        });
        Arc::clone(pool)
    }

    async fn checkout(
        &self,
        pool: &HostPool,
        endpoint: &Endpoint,
        trace: &mut TraceRecorder,
    ) -> Result<PooledConnection, HttpError> {
        loop {
            // Registered before the idle check so a release in between still wakes us.
            let released = pool.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if let Some(mut idle) = self.take_idle(pool) {
                if idle.sender.ready().await.is_ok() {
                    trace.got_connection(ConnectionUse::Reused);
                    self.inner.counters.reused.fetch_add(1, Ordering::Relaxed);
                    return Ok(idle);
                }
                debug!("Discarding closed idle connection to {}", endpoint);
                continue;
            }

            tokio::select! {
                acquired = Arc::clone(&pool.permits).acquire_owned() => {
                    let permit = acquired.map_err(|err| HttpError::PoolClosed {
                        addr: endpoint.authority(),
                        source: err,
                    })?;
                    let sender = self.connect(endpoint, trace).await?;
                    trace.got_connection(ConnectionUse::New);
                    self.inner.counters.created.fetch_add(1, Ordering::Relaxed);
                    return Ok(PooledConnection {
                        sender,
                        _permit: permit,
                    });
                }
                () = released => {}
            }
        }
    }

    fn take_idle(&self, pool: &HostPool) -> Option<PooledConnection> {
        let taken = lock(&pool.idle).pop();
        if taken.is_some() {
            self.inner.idle_total.fetch_sub(1, Ordering::AcqRel);
        }
        taken
    }

    async fn connect(
        &self,
        endpoint: &Endpoint,
        trace: &mut TraceRecorder,
    ) -> Result<SendRequest<Full<Bytes>>, HttpError> {
        let addr = endpoint.authority();
        let resolved = lookup_host((endpoint.host(), endpoint.port()))
            .await
            .map_err(|err| HttpError::Connect {
                addr: addr.clone(),
                source: err,
            })?;

        trace.connect_start();
        let connecting = connect_any(resolved, &addr);
        let connected = match self.inner.config.connect_timeout {
            Some(after) => timeout(after, connecting)
                .await
                .map_err(|err| HttpError::ConnectTimeout {
                    addr: addr.clone(),
                    after,
                    source: err,
                })?,
            None => connecting.await,
        };
        let stream = connected.map_err(|err| HttpError::Connect { addr, source: err })?;
        trace.connect_done();
        if let Err(err) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", endpoint, err);
        }

        if endpoint.is_tls() {
            let connector =
                self.inner
                    .tls
                    .as_ref()
                    .ok_or_else(|| HttpError::TlsUnavailable {
                        host: endpoint.host().to_owned(),
                    })?;
            let tls_stream = connector
                .connect(endpoint.host(), stream)
                .await
                .map_err(|err| HttpError::Tls {
                    host: endpoint.host().to_owned(),
                    source: err,
                })?;
            handshake(tls_stream).await
        } else {
            handshake(stream).await
        }
    }
}

async fn connect_any<I>(addrs: I, addr: &str) -> io::Result<TcpStream>
where
    I: Iterator<Item = SocketAddr>,
{
    let mut last_err = None;
    for socket_addr in addrs {
        match TcpStream::connect(socket_addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses resolved for {}", addr),
        )
    }))
}

async fn handshake<S>(stream: S) -> Result<SendRequest<Full<Bytes>>, HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sender, connection) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|err| HttpError::Handshake { source: err })?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("Connection closed with error: {}", err);
        }
    });
    Ok(sender)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A response whose body has not been read yet.
///
/// The connection goes back to the idle pool only once [`Exchange::drain`]
/// has consumed the whole body; dropping the exchange closes it instead.
pub struct Exchange {
    status: StatusCode,
    body: Incoming,
    lease: Lease,
}

impl Exchange {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Reads the body to the end, counting bytes into `trace`.
    ///
    /// # Errors
    ///
    /// Returns an error when a body frame cannot be read.
    pub async fn drain(self, trace: &mut TraceRecorder) -> Result<(), HttpError> {
        let Self {
            mut body, lease, ..
        } = self;
        while let Some(next) = body.frame().await {
            let frame = next.map_err(|err| HttpError::Body { source: err })?;
            if let Some(data) = frame.data_ref() {
                trace.add_body_bytes(u64::try_from(data.len()).unwrap_or(u64::MAX));
            }
        }
        lease.release();
        Ok(())
    }
}

struct Lease {
    inner: Arc<Inner>,
    pool: Arc<HostPool>,
    connection: PooledConnection,
}

impl Lease {
    fn release(self) {
        let Self {
            inner,
            pool,
            connection,
        } = self;
        if connection.sender.is_closed() {
            return;
        }
        let mut idle = lock(&pool.idle);
        if idle.len() >= inner.config.max_idle_per_host || !reserve_idle_slot(&inner) {
            return;
        }
        idle.push(connection);
        drop(idle);
        pool.released.notify_one();
    }
}

fn reserve_idle_slot(inner: &Inner) -> bool {
    let max_idle = inner.config.max_idle;
    inner
        .idle_total
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            if current < max_idle {
                Some(current.saturating_add(1))
            } else {
                None
            }
        })
        .is_ok()
}

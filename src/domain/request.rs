use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HOST, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::Full;
use url::{Host, Url};

use crate::args::DEFAULT_USER_AGENT;
use crate::error::ValidationError;

use super::RunConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Scheme {
    Http,
    Https,
}

/// Where connections go: the key of the transport's connection pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Endpoint {
    /// # Errors
    ///
    /// Returns an error when the URL has no host or an unsupported scheme.
    pub fn from_url(url: &Url) -> Result<Self, ValidationError> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(ValidationError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => {
                return Err(ValidationError::MissingHost {
                    value: url.to_string(),
                });
            }
        };
        let default_port = match scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        };
        Ok(Self {
            scheme,
            host,
            port: url.port().unwrap_or(default_port),
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.scheme, Scheme::Https)
    }

    /// `host:port`, with IPv6 literals bracketed.
    #[must_use]
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    fn host_header(&self) -> String {
        let default_port = match self.scheme {
            Scheme::Http => 80,
            Scheme::Https => 443,
        };
        if self.port != default_port {
            return self.authority();
        }
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.scheme {
            Scheme::Http => "http",
            Scheme::Https => "https",
        };
        write!(f, "{}://{}", scheme, self.authority())
    }
}

/// Validated request shape shared by every descriptor of a run.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    method: Method,
    endpoint: Arc<Endpoint>,
    target: Uri,
    headers: Arc<HeaderMap>,
    body: Bytes,
}

impl RequestTemplate {
    /// # Errors
    ///
    /// Returns an error when the method, URL or headers cannot form a request.
    pub fn new(config: &RunConfig) -> Result<Self, ValidationError> {
        let method = config.method.to_method();
        let endpoint = Endpoint::from_url(&config.url)?;

        let target_text = if method == Method::CONNECT {
            endpoint.authority()
        } else {
            match config.url.query() {
                Some(query) => format!("{}?{}", config.url.path(), query),
                None => config.url.path().to_owned(),
            }
        };
        let target = target_text
            .parse::<Uri>()
            .map_err(|err| ValidationError::InvalidRequestTarget {
                value: target_text.clone(),
                source: err,
            })?;

        let mut headers = HeaderMap::new();
        let host_header = endpoint.host_header();
        headers.insert(
            HOST,
            HeaderValue::from_str(&host_header).map_err(|err| {
                ValidationError::InvalidHeaderValue {
                    name: HOST.as_str().to_owned(),
                    source: err,
                }
            })?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
                ValidationError::InvalidHeaderName {
                    name: key.clone(),
                    source: err,
                }
            })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| ValidationError::InvalidHeaderValue {
                    name: key.clone(),
                    source: err,
                })?;
            headers.insert(name, header_value);
        }

        let body = config
            .body
            .as_ref()
            .map_or_else(Bytes::new, |body| Bytes::from(body.clone()));

        Ok(Self {
            method,
            endpoint: Arc::new(endpoint),
            target,
            headers: Arc::new(headers),
            body,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// A fresh descriptor; cheap, everything heavy is shared.
    #[must_use]
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor {
            method: self.method.clone(),
            endpoint: Arc::clone(&self.endpoint),
            target: self.target.clone(),
            headers: Arc::clone(&self.headers),
            body: self.body.clone(),
        }
    }
}

/// One request to be sent. Consumed exactly once by exactly one worker.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    endpoint: Arc<Endpoint>,
    target: Uri,
    headers: Arc<HeaderMap>,
    body: Bytes,
}

impl RequestDescriptor {
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub const fn target(&self) -> &Uri {
        &self.target
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn to_request(&self) -> Request<Full<Bytes>> {
        let mut request = Request::new(Full::new(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.target.clone();
        *request.headers_mut() = HeaderMap::clone(&self.headers);
        request
    }
}

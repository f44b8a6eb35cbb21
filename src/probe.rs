//! Protocol specific reachability checks.
//!
//! Each check makes a single attempt and returns the measured latency on
//! success. Failures carry the latency that applies to them (see
//! [`ProbeError::latency`]), which is zero except for HTTP status failures.

use crate::ping::{self, PingPlatform};
use crate::store::ProxyConfig;
use reqwest::{Client, Proxy};
use std::error::Error as _;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE: usize = 100;
const DEFAULT_TCP_PORT: u16 = 80;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{}", error_chain(.0))]
    Http(#[from] reqwest::Error),

    #[error("status code: {status}")]
    HttpStatus { status: u16, elapsed: Duration },

    #[error("dial tcp {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("dial tcp {addr}: i/o timeout")]
    ConnectTimeout { addr: String },

    #[error("ping command failed: {0}")]
    Command(String),
}

impl ProbeError {
    pub fn latency(&self) -> Duration {
        match self {
            ProbeError::HttpStatus { elapsed, .. } => *elapsed,
            _ => Duration::ZERO,
        }
    }
}

/// reqwest's top level message is terse, so append the underlying causes.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Builds the HTTP client used by [`check_http`].
///
/// An enabled proxy with a URL that does not parse is ignored, and the
/// client falls back to the proxies from the environment.
pub fn build_http_client(proxy: &ProxyConfig) -> Result<Client, ProbeError> {
    let mut builder = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(POOL_MAX_IDLE)
        .timeout(REQUEST_TIMEOUT);

    if let Some(proxy) = configured_proxy(proxy) {
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}

fn configured_proxy(config: &ProxyConfig) -> Option<Proxy> {
    if !config.enabled || config.url.is_empty() {
        return None;
    }

    let parsed = match url::Url::parse(&config.url) {
        Ok(url) => url,
        Err(e) => {
            warn!("Ignoring malformed proxy URL {:?}: {}", config.url, e);
            return None;
        }
    };

    match Proxy::all(parsed) {
        Ok(proxy) => Some(proxy),
        Err(e) => {
            warn!("Ignoring unsupported proxy URL {:?}: {}", config.url, e);
            None
        }
    }
}

/// GETs `target`, prefixing `http://` unless it already starts with `http`.
pub async fn check_http(target: &str, proxy: &ProxyConfig) -> Result<Duration, ProbeError> {
    let url = if target.starts_with("http") {
        target.to_string()
    } else {
        format!("http://{}", target)
    };

    let client = build_http_client(proxy)?;

    let start = Instant::now();
    let response = client.get(&url).send().await?;
    let elapsed = start.elapsed();

    let status = response.status();
    if status.as_u16() >= 400 {
        debug!("{} answered {}", url, status);
        return Err(ProbeError::HttpStatus {
            status: status.as_u16(),
            elapsed,
        });
    }

    Ok(elapsed)
}

/// Opens and immediately closes a TCP connection.
///
/// The proxy is not used: tunneling raw TCP through an HTTP or SOCKS proxy
/// is not supported.
pub async fn check_tcp(target: &str, _proxy: &ProxyConfig) -> Result<Duration, ProbeError> {
    let addr = tcp_address(target);

    let start = Instant::now();
    let connected =
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr.as_str())).await;
    let stream = match connected {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(ProbeError::Connect { addr, source }),
        Err(_) => return Err(ProbeError::ConnectTimeout { addr }),
    };
    let elapsed = start.elapsed();
    drop(stream);

    Ok(elapsed)
}

/// Runs the system `ping` once against the bare host of `target`.
///
/// The latency includes process start-up, not only the round trip.
pub async fn check_ping(target: &str) -> Result<Duration, ProbeError> {
    check_ping_with(ping::native(), target).await
}

pub async fn check_ping_with(
    platform: &dyn PingPlatform,
    target: &str,
) -> Result<Duration, ProbeError> {
    let host = ping_host(target);
    let mut command = platform.command(host);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let start = Instant::now();
    let status = command
        .status()
        .await
        .map_err(|e| ProbeError::Command(e.to_string()))?;
    let elapsed = start.elapsed();

    if !status.success() {
        return Err(ProbeError::Command(status.to_string()));
    }

    Ok(elapsed)
}

/// Drops a leading `scheme://` and anything from the first `/` after it.
fn authority(target: &str) -> &str {
    let rest = match target.find("://") {
        Some(idx) => &target[idx + 3..],
        None => target,
    };
    match rest.find('/') {
        Some(idx) => &rest[..idx],
        None => rest,
    }
}

/// `host:port` for dialing, defaulting the port to 80.
pub fn tcp_address(target: &str) -> String {
    let authority = authority(target);

    if let Some(rest) = authority.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((_, port)) if port.starts_with(':') => authority.to_string(),
            _ => format!("{}:{}", authority, DEFAULT_TCP_PORT),
        };
    }

    match authority.matches(':').count() {
        0 => format!("{}:{}", authority, DEFAULT_TCP_PORT),
        1 => authority.to_string(),
        // bare IPv6 literal
        _ => format!("[{}]:{}", authority, DEFAULT_TCP_PORT),
    }
}

/// Host without scheme, path or port.
pub fn ping_host(target: &str) -> &str {
    let authority = authority(target);

    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(host, _)| host);
    }

    match authority.matches(':').count() {
        1 => authority.split_once(':').map_or(authority, |(host, _)| host),
        _ => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_address_normalization() {
        assert_eq!(tcp_address("example.com"), "example.com:80");
        assert_eq!(tcp_address("example.com:443"), "example.com:443");
        assert_eq!(tcp_address("tcp://db.local:5432"), "db.local:5432");
        assert_eq!(tcp_address("http://example.com/health"), "example.com:80");
        assert_eq!(tcp_address("[::1]"), "[::1]:80");
        assert_eq!(tcp_address("[::1]:8080"), "[::1]:8080");
        assert_eq!(tcp_address("fe80::1"), "[fe80::1]:80");
    }

    #[test]
    fn ping_host_normalization() {
        assert_eq!(ping_host("8.8.8.8"), "8.8.8.8");
        assert_eq!(ping_host("example.com:443"), "example.com");
        assert_eq!(ping_host("https://example.com:8443/path"), "example.com");
        assert_eq!(ping_host("[::1]:80"), "::1");
        assert_eq!(ping_host("::1"), "::1");
    }

    #[test]
    fn only_status_failures_carry_latency() {
        let status = ProbeError::HttpStatus {
            status: 503,
            elapsed: Duration::from_millis(40),
        };
        assert_eq!(status.latency(), Duration::from_millis(40));
        assert_eq!(status.to_string(), "status code: 503");

        let timeout = ProbeError::ConnectTimeout {
            addr: "10.0.0.1:80".into(),
        };
        assert_eq!(timeout.latency(), Duration::ZERO);
    }

    #[test]
    fn malformed_or_disabled_proxy_is_ignored() {
        let malformed = ProxyConfig {
            enabled: true,
            url: "::not a url".into(),
        };
        assert!(configured_proxy(&malformed).is_none());
        assert!(build_http_client(&malformed).is_ok());

        let disabled = ProxyConfig {
            enabled: false,
            url: "http://127.0.0.1:3128".into(),
        };
        assert!(configured_proxy(&disabled).is_none());

        let socks = ProxyConfig {
            enabled: true,
            url: "socks5://127.0.0.1:1080".into(),
        };
        assert!(configured_proxy(&socks).is_some());
    }

    #[tokio::test]
    async fn closed_port_is_a_dial_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = check_tcp(&addr.to_string(), &ProxyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Connect { .. }));
        assert_eq!(err.latency(), Duration::ZERO);
    }

    #[tokio::test]
    async fn failing_command_is_reported() {
        struct Missing;
        impl PingPlatform for Missing {
            fn program(&self) -> &str {
                "sitecheck-no-such-ping-binary"
            }
            fn args(&self, host: &str) -> Vec<String> {
                vec![host.to_string()]
            }
        }

        let err = check_ping_with(&Missing, "127.0.0.1").await.unwrap_err();
        assert!(err.to_string().starts_with("ping command failed"));
    }
}

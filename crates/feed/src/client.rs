//! Blocking feed download.

use std::io::Read;
use std::time::Duration;

use crate::source::FeedSource;

const USER_AGENT: &str = concat!("vinrecon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// A feed could not be downloaded. Every cause is the same outcome to the
/// caller; `reason` is kept for the message.
#[derive(Debug)]
pub struct FetchError {
    pub source: String,
    pub reason: FetchFailure,
}

#[derive(Debug)]
pub enum FetchFailure {
    /// Server answered with a non-2xx status
    Status(u16),
    /// Connection, TLS or timeout failure
    Network(String),
    /// Body exceeded `max_bytes`
    TooLarge(u64),
    /// Local file could not be read
    Io(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchFailure::Status(code) => write!(f, "HTTP {}", code),
            FetchFailure::Network(msg) => write!(f, "network error: {}", msg),
            FetchFailure::TooLarge(limit) => write!(f, "response larger than {} bytes", limit),
            FetchFailure::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "download failed: {} ({})", self.source, self.reason)
    }
}

impl std::error::Error for FetchError {}

/// Feed client (blocking).
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::blocking::Client,
    max_bytes: u64,
}

impl FeedClient {
    pub fn new(opts: FetchOptions) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            max_bytes: opts.max_bytes,
        }
    }

    /// Fetch raw feed bytes. No retry, no partial content.
    pub fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FetchError> {
        let fail = |reason| FetchError {
            source: source.to_string(),
            reason,
        };

        let bytes = match source {
            FeedSource::Http(url) => self.get(url.as_str()).map_err(fail)?,
            FeedSource::File(path) => {
                let len = std::fs::metadata(path)
                    .map_err(|e| fail(FetchFailure::Io(e.to_string())))?
                    .len();
                if len > self.max_bytes {
                    return Err(fail(FetchFailure::TooLarge(self.max_bytes)));
                }
                std::fs::read(path).map_err(|e| fail(FetchFailure::Io(e.to_string())))?
            }
        };

        log::info!("fetched {} bytes from {}", bytes.len(), source);
        Ok(bytes)
    }

    fn get(&self, url: &str) -> Result<Vec<u8>, FetchFailure> {
        log::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(FetchFailure::TooLarge(self.max_bytes));
            }
        }

        // Content-Length can be absent or wrong; cap the read itself.
        let mut body = Vec::new();
        response
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| FetchFailure::Network(e.to_string()))?;
        if body.len() as u64 > self.max_bytes {
            return Err(FetchFailure::TooLarge(self.max_bytes));
        }

        Ok(body)
    }
}

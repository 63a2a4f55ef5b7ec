//! Bounded HTTP GET.
//!
//! One GET per call with a fixed client timeout. At most `max_bytes` of the
//! body are read no matter what the server sends or advertises.

use std::time::Duration;
use url::Url;

/// Cap applied when the caller passes nothing, zero or a negative number.
pub const DEFAULT_MAX_BYTES: usize = 4096;
/// Smallest cap a caller can ask for.
pub const MIN_MAX_BYTES: usize = 256;
/// Largest cap a caller can ask for.
pub const MAX_MAX_BYTES: usize = 65536;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Map a requested byte cap onto the effective one.
pub fn clamp_max_bytes(requested: i64) -> usize {
    if requested <= 0 {
        return DEFAULT_MAX_BYTES;
    }
    let requested = usize::try_from(requested).unwrap_or(MAX_MAX_BYTES);
    requested.clamp(MIN_MAX_BYTES, MAX_MAX_BYTES)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("URL is required")]
    MissingUrl,

    #[error("URL must start with http:// or https://")]
    UnsupportedScheme,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Fetch error: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Read error: {0}")]
    Read(#[source] reqwest::Error),
}

/// A validated fetch target and its effective byte cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    url: Url,
    max_bytes: usize,
}

impl FetchConfig {
    /// Validate `url` and clamp `max_bytes`. Nothing touches the network.
    pub fn new(url: &str, max_bytes: Option<i64>) -> Result<Self, FetchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::MissingUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::UnsupportedScheme);
        }

        Ok(Self {
            url: Url::parse(url)?,
            max_bytes: clamp_max_bytes(max_bytes.unwrap_or(0)),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

/// Settings for the shared outbound HTTP client.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: format!("mcpdemo/{} (+https://example.local)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// What a bounded fetch produced.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub url: String,
    /// Status code and reason, e.g. `200 OK`.
    pub status: String,
    pub bytes_read: usize,
    /// Set only when the advertised `Content-Length` exceeds the cap. A body
    /// sent without a length is never flagged, even when it was cut short.
    pub truncated: bool,
    pub body: Vec<u8>,
}

impl FetchOutcome {
    /// Render the outcome as the tool's text block.
    pub fn render(&self) -> String {
        let note = if self.truncated { " (truncated)" } else { "" };
        format!(
            "URL: {}\nStatus: {}\nBytes: {}{}\n\n{}",
            self.url,
            self.status,
            self.bytes_read,
            note,
            String::from_utf8_lossy(&self.body)
        )
    }
}

/// Outbound client shared by every fetch call.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    /// Issue the GET and read at most `config.max_bytes()` of the body.
    pub async fn fetch(&self, config: &FetchConfig) -> Result<FetchOutcome, FetchError> {
        let cap = config.max_bytes();

        let mut response = self
            .client
            .get(config.url().clone())
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status().to_string();
        let advertised = response.content_length();

        let mut body = Vec::with_capacity(cap.min(advertised.unwrap_or(cap as u64) as usize));
        while body.len() < cap {
            match response.chunk().await.map_err(FetchError::Read)? {
                Some(chunk) => {
                    let take = (cap - body.len()).min(chunk.len());
                    body.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        Ok(FetchOutcome {
            url: config.url().to_string(),
            status,
            bytes_read: body.len(),
            truncated: advertised.is_some_and(|len| len > cap as u64),
            body,
        })
    }
}

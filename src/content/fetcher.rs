//! Fetching documentation artifacts from raw repository content

use http::header::{ETAG, HeaderMap, LAST_MODIFIED};
use http::StatusCode;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::config::{CONNECT_TIMEOUT, DEFAULT_RAW_BASE_URL, UpstreamConfig};
use crate::error::{ContentError, UpstreamError};
use crate::release::DocsTarget;

/// What came back from upstream for one URL
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Validators worth passing on (ETag, Last-Modified)
    pub headers: HeaderMap,
    /// Empty unless the status is a success
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 400
    }
}

/// Trait for fetching a single artifact
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<UpstreamResponse, UpstreamError>;
}

/// Builds upstream URLs of docs artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    base_url: String,
    owner: String,
    repository: String,
}

impl Locator {
    pub fn new(base_url: &str, owner: &str, repository: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repository: repository.to_string(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        let base_url = if config.raw_base_url.is_empty() {
            DEFAULT_RAW_BASE_URL
        } else {
            &config.raw_base_url
        };
        Self::new(base_url, &config.organization, &config.repository)
    }

    /// `<base>/<owner>/<repo>/refs/tags/docs/<segment><path>`
    ///
    /// Paths with `.` or `..` segments are refused, since URL parsing would
    /// resolve them outside of the docs tag.
    pub fn url_for(&self, target: &DocsTarget, path: &str) -> Result<String, ContentError> {
        if has_dot_segment(path) {
            return Err(ContentError::InvalidPath(path.to_string()));
        }
        let separator = if path.starts_with('/') { "" } else { "/" };
        Ok(format!(
            "{}/{}/{}/refs/tags/docs/{}{}{}",
            self.base_url,
            self.owner,
            self.repository,
            target.segment(),
            separator,
            path
        ))
    }

    /// Directory index candidate of a URL
    pub fn index_of(url: &str) -> String {
        if url.ends_with('/') {
            format!("{url}index.html")
        } else {
            format!("{url}/index.html")
        }
    }
}

/// True if any segment of `path` is `.` or `..`, also when percent-encoded.
///
/// Backslashes count as separators, as they do for http(s) URLs.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// Fetches raw content with Basic authentication
pub struct RawGitHubFetcher {
    client: reqwest::Client,
    user: String,
    token: String,
}

impl RawGitHubFetcher {
    pub fn new(user: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("docs-edge")
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            user: user.to_string(),
            token: token.to_string(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(&config.access_user, &config.access_token)
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for RawGitHubFetcher {
    async fn fetch(&self, url: &str) -> Result<UpstreamResponse, UpstreamError> {
        let mut request = self.client.get(url);
        if !self.user.is_empty() || !self.token.is_empty() {
            request = request.basic_auth(&self.user, Some(&self.token));
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Fetched {} (status: {})", url, status);

        let mut headers = HeaderMap::new();
        for name in [ETAG, LAST_MODIFIED] {
            if let Some(value) = response.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }

        let body = if status.as_u16() < 400 {
            response.bytes().await?.to_vec()
        } else {
            Vec::new()
        };

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

//! Cache-aside serving of documentation artifacts
//!
//! Every artifact is looked up in the [`ResponseCache`] under its upstream URL
//! first. Misses go to the [`ArtifactFetcher`], and successful responses are
//! written back on a background task so the caller never waits for the store.

use std::future::Future;
use std::sync::{Arc, Mutex};

use http::header::{CACHE_CONTROL, ETAG, HeaderMap, HeaderName, HeaderValue, LAST_MODIFIED};
use http::{Method, StatusCode};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::content::fetcher::{ArtifactFetcher, Locator, UpstreamResponse};
use crate::content::headers::{HTML_UTF8, apply_content_type, apply_default_headers};
use crate::content::response::DocsResponse;
use crate::content::ttl::{TtlClass, filename_of};
use crate::error::ContentError;
use crate::release::{ReleaseRegistry, ResolvedTarget};
use crate::store::{CachedArtifact, ResponseCache};

/// Whether a request comes from a visitor or from the cache warmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Reads the cache, may redirect and substitutes error pages
    Visitor,
    /// Always refetches, never redirects and reports error statuses as errors
    Warm,
}

/// The parts of an inbound request that influence serving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub method: Method,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub if_none_match: Option<String>,
    pub mode: FetchMode,
}

impl ContentRequest {
    pub fn visitor(method: Method) -> Self {
        Self {
            method,
            query: None,
            if_none_match: None,
            mode: FetchMode::Visitor,
        }
    }

    pub fn warm() -> Self {
        Self {
            method: Method::GET,
            query: None,
            if_none_match: None,
            mode: FetchMode::Warm,
        }
    }

    pub fn with_query(mut self, query: Option<String>) -> Self {
        self.query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn with_if_none_match(mut self, if_none_match: Option<String>) -> Self {
        self.if_none_match = if_none_match;
        self
    }

    /// Appends the original query string to `path`
    pub fn keep_query(&self, path: &str) -> String {
        match &self.query {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        }
    }
}

/// Outcome of the cache-aside lookup before error handling
enum Fetched {
    Response(DocsResponse),
    Failed { status: StatusCode, url: String },
}

/// Background cache write-backs
///
/// Finished tasks are reaped whenever a new one is spawned, so the set only
/// holds work still in flight.
#[derive(Default)]
struct WriteBacks {
    tasks: Mutex<JoinSet<()>>,
}

impl WriteBacks {
    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    async fn settle(&self) -> usize {
        let mut pending = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *tasks)
        };

        let mut settled = 0;
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                error!("Cache write-back task failed: {}", e);
            }
            settled += 1;
        }
        settled
    }
}

pub struct ContentCache {
    registry: Arc<ReleaseRegistry>,
    fetcher: Arc<dyn ArtifactFetcher>,
    cache: Arc<dyn ResponseCache>,
    locator: Locator,
    write_backs: WriteBacks,
}

impl ContentCache {
    pub fn new(
        registry: Arc<ReleaseRegistry>,
        fetcher: Arc<dyn ArtifactFetcher>,
        cache: Arc<dyn ResponseCache>,
        locator: Locator,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
            locator,
            write_backs: WriteBacks::default(),
        }
    }

    /// Serves `path` (always starting with `/`) of a resolved target.
    ///
    /// Visitors get an error page for upstream error statuses; the warmer gets
    /// [`ContentError::UpstreamStatus`] instead. Network failures are returned
    /// to the caller in both modes.
    pub async fn serve(
        &self,
        request: &ContentRequest,
        resolved: &ResolvedTarget,
        path: &str,
    ) -> Result<DocsResponse, ContentError> {
        match self.cache_aside(request, resolved, path, false).await? {
            Fetched::Response(response) => {
                Ok(response.finish(&request.method, request.if_none_match.as_deref()))
            }
            Fetched::Failed { status, url } => match request.mode {
                FetchMode::Visitor => Ok(self.serve_error(request, status, None).await),
                FetchMode::Warm => Err(ContentError::UpstreamStatus { status, url }),
            },
        }
    }

    /// Serves the error page of the latest release for `status`.
    ///
    /// Falls back to an empty response with the same status whenever the page
    /// itself cannot be obtained.
    pub async fn serve_error(
        &self,
        request: &ContentRequest,
        status: StatusCode,
        details: Option<&str>,
    ) -> DocsResponse {
        let page = match self.error_page(request, status).await {
            Ok(Some(page)) => page.with_status(status),
            Ok(None) => minimal_error_page(status),
            Err(e) => {
                warn!("Failed to resolve {} error page: {}", status.as_u16(), e);
                minimal_error_page(status)
            }
        };
        let page = match details {
            Some(details) => page.with_details(details),
            None => page,
        };
        page.finish(&request.method, None)
    }

    /// Waits for all pending cache write-backs, returning how many there were
    pub async fn settle(&self) -> usize {
        self.write_backs.settle().await
    }

    async fn error_page(
        &self,
        request: &ContentRequest,
        status: StatusCode,
    ) -> Result<Option<DocsResponse>, ContentError> {
        let latest = ResolvedTarget::latest(self.registry.latest().await?);
        let path = format!("/{}.html", status.as_u16());
        match self.cache_aside(request, &latest, &path, true).await? {
            Fetched::Response(page) => Ok(Some(page)),
            Fetched::Failed { .. } => Ok(None),
        }
    }

    async fn cache_aside(
        &self,
        request: &ContentRequest,
        resolved: &ResolvedTarget,
        path: &str,
        error_page: bool,
    ) -> Result<Fetched, ContentError> {
        let url = self.locator.url_for(&resolved.target, path)?;

        if request.mode == FetchMode::Visitor {
            match self.cache.lookup(&url).await {
                Ok(Some(artifact)) => {
                    debug!("Cache hit: {}", url);
                    return Ok(Fetched::Response(DocsResponse::from_artifact(artifact)));
                }
                Ok(None) => debug!("Cache missed, need to retrieve {}", url),
                Err(e) => warn!("Cache lookup failed for {}: {}", url, e),
            }
        }

        let mut upstream = self.fetcher.fetch(&url).await?;
        let mut filename = filename_of(path).to_string();

        let missing = matches!(
            upstream.status,
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND
        );
        if missing && !error_page {
            let alternate_url = Locator::index_of(&url);
            let alternate = self.fetcher.fetch(&alternate_url).await?;
            if alternate.is_success() {
                if request.mode == FetchMode::Visitor && !path.ends_with('/') {
                    let location = request.keep_query(&resolved.public_path(&format!("{path}/")));
                    return Ok(Fetched::Response(DocsResponse::redirect(
                        &location,
                        StatusCode::TEMPORARY_REDIRECT,
                    )));
                }
                filename = filename_of(&alternate_url).to_string();
                upstream = alternate;
            }
        }

        if !upstream.is_success() {
            let status = match upstream.status {
                StatusCode::BAD_REQUEST => StatusCode::NOT_FOUND,
                other => other,
            };
            info!("{} could not be retrieved (status: {})", url, upstream.status);
            return Ok(Fetched::Failed { status, url });
        }

        let class = if error_page {
            TtlClass::ErrorPage
        } else {
            TtlClass::classify(&filename, &resolved.target)
        };
        let response = build_response(upstream, resolved, &filename, class, error_page);
        info!("{} retrieved (status: {})", url, response.status);

        let cache = self.cache.clone();
        let artifact = CachedArtifact {
            key: url,
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        };
        self.write_backs.spawn(async move {
            let key = artifact.key.clone();
            if let Err(e) = cache.store(artifact, class.duration()).await {
                warn!("Failed to cache {}: {}", key, e);
            }
        });

        Ok(Fetched::Response(response))
    }
}

fn build_response(
    upstream: UpstreamResponse,
    resolved: &ResolvedTarget,
    filename: &str,
    class: TtlClass,
    error_page: bool,
) -> DocsResponse {
    let mut headers = HeaderMap::new();
    for name in [ETAG, LAST_MODIFIED] {
        if let Some(value) = upstream.headers.get(&name) {
            headers.insert(name, value.clone());
        }
    }

    let (marker, value) = resolved.target.marker_header();
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(marker), value);
    }
    if let Ok(value) = HeaderValue::from_str(&class.cache_control()) {
        headers.insert(CACHE_CONTROL, value);
    }
    if error_page {
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
    } else {
        apply_content_type(&mut headers, filename);
    }
    apply_default_headers(&mut headers);

    DocsResponse::new(StatusCode::OK, headers, upstream.body)
}

fn minimal_error_page(status: StatusCode) -> DocsResponse {
    DocsResponse::minimal_error(
        status,
        &format!(
            "Cannot resolve default {} error page, using default handler.",
            status.as_u16()
        ),
    )
}

//! What the router can ask the site to do

use std::sync::Arc;

use http::{Method, StatusCode};
#[cfg(test)]
use mockall::automock;
use tracing::{error, warn};

use crate::content::{ContentCache, ContentRequest, DocsResponse};
use crate::error::{ContentError, ResolveError};
use crate::release::{DocsTarget, ReleaseRegistry, VersionResolver};
use crate::site::versions;

/// An inbound request, reduced to what routing and serving look at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub if_none_match: Option<String>,
}

impl SiteRequest {
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: None,
            if_none_match: None,
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string()).filter(|q| !q.is_empty());
        self
    }

    pub fn with_if_none_match(mut self, etag: &str) -> Self {
        self.if_none_match = Some(etag.to_string());
        self
    }

    pub fn content_request(&self) -> ContentRequest {
        ContentRequest::visitor(self.method.clone())
            .with_query(self.query.clone())
            .with_if_none_match(self.if_none_match.clone())
    }

    /// Redirect to `path` on this site, keeping the query string
    pub fn redirect(&self, path: &str, status: StatusCode) -> DocsResponse {
        let path = if path.is_empty() { "/" } else { path };
        let location = self.content_request().keep_query(path);
        DocsResponse::redirect(&location, status)
    }
}

/// Capabilities the router dispatches to
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait SiteHandler: Send + Sync {
    /// Serves `path` of `target`, or of the latest release when None
    async fn serve_default(
        &self,
        request: &SiteRequest,
        path: &str,
        target: Option<DocsTarget>,
    ) -> DocsResponse;

    async fn serve_not_found(&self, request: &SiteRequest, details: &str) -> DocsResponse;

    async fn list_versions(&self, request: &SiteRequest) -> DocsResponse;
}

/// The documentation site backed by the release registry and content cache
pub struct DocsSite {
    registry: Arc<ReleaseRegistry>,
    resolver: VersionResolver,
    content: Arc<ContentCache>,
}

impl DocsSite {
    pub fn new(registry: Arc<ReleaseRegistry>, content: Arc<ContentCache>) -> Self {
        Self {
            resolver: VersionResolver::new(registry.clone()),
            registry,
            content,
        }
    }

    fn registry_failure(request: &SiteRequest, e: impl std::fmt::Display) -> DocsResponse {
        error!("Cannot resolve releases: {}", e);
        DocsResponse::minimal_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Cannot resolve releases: {e}"),
        )
        .finish(&request.method, None)
    }
}

#[async_trait::async_trait]
impl SiteHandler for DocsSite {
    async fn serve_default(
        &self,
        request: &SiteRequest,
        path: &str,
        target: Option<DocsTarget>,
    ) -> DocsResponse {
        let resolved = match self.resolver.resolve(target.as_ref()).await {
            Ok(resolved) => resolved,
            Err(ResolveError::UnknownVersion(version)) => {
                let details = format!("Version {version} does not exist.");
                return self.serve_not_found(request, &details).await;
            }
            Err(ResolveError::Registry(e)) => return Self::registry_failure(request, e),
        };

        // the latest release lives at the site root
        if target.is_some() && resolved.is_latest {
            return request.redirect(path, StatusCode::TEMPORARY_REDIRECT);
        }

        let content_request = request.content_request();
        match self.content.serve(&content_request, &resolved, path).await {
            Ok(response) => response,
            Err(ContentError::Registry(e)) => Self::registry_failure(request, e),
            Err(ContentError::InvalidPath(path)) => {
                self.serve_not_found(request, &format!("Path {path} is not valid."))
                    .await
            }
            Err(ContentError::Upstream(e)) => {
                warn!("Upstream failure serving {}: {}", request.path, e);
                self.content
                    .serve_error(
                        &content_request,
                        StatusCode::BAD_GATEWAY,
                        Some(&format!("Cannot retrieve {path}: {e}")),
                    )
                    .await
            }
            Err(ContentError::UpstreamStatus { status, url }) => {
                warn!("Upstream returned {} for {}", status, url);
                self.content.serve_error(&content_request, status, None).await
            }
        }
    }

    async fn serve_not_found(&self, request: &SiteRequest, details: &str) -> DocsResponse {
        self.content
            .serve_error(&request.content_request(), StatusCode::NOT_FOUND, Some(details))
            .await
    }

    async fn list_versions(&self, request: &SiteRequest) -> DocsResponse {
        let snapshot = match self.registry.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return Self::registry_failure(request, e),
        };
        match versions::render(&snapshot) {
            Ok(response) => response.finish(&request.method, None),
            Err(e) => Self::registry_failure(request, e),
        }
    }
}

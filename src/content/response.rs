//! Responses produced by the proxy, independent of the HTTP server

use http::header::{ETAG, HeaderMap, HeaderValue, LOCATION};
use http::{Method, StatusCode};
use tracing::warn;

use crate::content::headers::X_ERROR_DETAILS;
use crate::store::CachedArtifact;

#[derive(Debug, Clone, PartialEq)]
pub struct DocsResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl DocsResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Redirect to `location` (301, 307, ...)
    pub fn redirect(location: &str, status: StatusCode) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(_) => warn!("Dropping unrepresentable redirect location {:?}", location),
        }
        Self::new(status, headers, Vec::new())
    }

    /// Empty response carrying only the status and an explanation
    pub fn minimal_error(status: StatusCode, details: &str) -> Self {
        Self::new(status, HeaderMap::new(), Vec::new()).with_details(details)
    }

    pub fn from_artifact(artifact: CachedArtifact) -> Self {
        Self::new(artifact.status, artifact.headers, artifact.body)
    }

    /// Attaches `x-error-details`, replacing any previous value
    pub fn with_details(mut self, details: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(details) {
            self.headers.insert(X_ERROR_DETAILS, value);
        }
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Applies conditional and method rules right before the response leaves
    ///
    /// A matching `If-None-Match` turns a success into a bodyless 304 that
    /// keeps its headers. HEAD never carries a body.
    pub fn finish(mut self, method: &Method, if_none_match: Option<&str>) -> Self {
        if self.status.is_success()
            && let Some(expected) = if_none_match
            && let Some(etag) = self.headers.get(ETAG)
            && etag.as_bytes() == expected.trim().as_bytes()
        {
            self.status = StatusCode::NOT_MODIFIED;
            self.body.clear();
        }
        if *method == Method::HEAD {
            self.body.clear();
        }
        self
    }
}

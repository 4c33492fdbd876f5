//! Maps request paths to site capabilities

use std::sync::LazyLock;

use http::{Method, StatusCode};
use regex::Regex;
use tracing::debug;

use crate::content::DocsResponse;
use crate::content::fetcher::has_dot_segment;
use crate::release::target::parse_segment;
use crate::site::handler::{SiteHandler, SiteRequest};

const VERSIONS_PATH: &str = "/versions.json";

static VERSIONED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(v\d+\.\d+\.\d+[^/]*)(/.*)?$").expect("valid regex"));

static PULL_REQUEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/pr-(\d+)(/.*)?$").expect("valid regex"));

static BARE_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(\d+\.\d+\.\d+)(/.*)?$").expect("valid regex"));

static LATEST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/latest(/.*)?$").expect("valid regex"));

pub struct SiteRouter<H: SiteHandler> {
    handler: H,
}

impl<H: SiteHandler> SiteRouter<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Dispatches a request; the first matching rule wins
    pub async fn route(&self, request: &SiteRequest) -> DocsResponse {
        if request.method != Method::GET && request.method != Method::HEAD {
            return DocsResponse::minimal_error(
                StatusCode::METHOD_NOT_ALLOWED,
                &format!(
                    "The request method {} is not allowed for this resource.",
                    request.method
                ),
            );
        }

        let path = request.path.as_str();
        debug!("Routing {} {}", request.method, path);

        if has_dot_segment(path) {
            return self
                .handler
                .serve_not_found(request, &format!("Path {path} is not valid."))
                .await;
        }

        if path == VERSIONS_PATH {
            return self.handler.list_versions(request).await;
        }

        if let Some(captures) = VERSIONED.captures(path) {
            let rest = captures.get(2).map_or("", |m| m.as_str());
            return match parse_segment(&captures[1]) {
                Some(target) => self.handler.serve_default(request, rest, Some(target)).await,
                None => self.handler.serve_default(request, path, None).await,
            };
        }

        if let Some(captures) = PULL_REQUEST.captures(path) {
            let rest = captures.get(2).map_or("", |m| m.as_str());
            return match parse_segment(&format!("pr-{}", &captures[1])) {
                Some(target) => self.handler.serve_default(request, rest, Some(target)).await,
                None => self.handler.serve_default(request, path, None).await,
            };
        }

        if let Some(captures) = BARE_VERSION.captures(path) {
            let rest = captures.get(2).map_or("", |m| m.as_str());
            return request.redirect(
                &format!("/v{}{}", &captures[1], rest),
                StatusCode::MOVED_PERMANENTLY,
            );
        }

        if let Some(captures) = LATEST.captures(path) {
            let rest = captures.get(1).map_or("", |m| m.as_str());
            return request.redirect(rest, StatusCode::MOVED_PERMANENTLY);
        }

        self.handler.serve_default(request, path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::headers::X_ERROR_DETAILS;
    use crate::release::DocsTarget;
    use crate::site::handler::MockSiteHandler;
    use http::HeaderMap;
    use rstest::rstest;
    use semver::Version;

    fn marker(tag: &str) -> DocsResponse {
        DocsResponse::new(StatusCode::OK, HeaderMap::new(), tag.as_bytes().to_vec())
    }

    #[rstest]
    #[case("/v1.2.3/guide.html", "/guide.html", Some(DocsTarget::Release(Version::new(1, 2, 3))))]
    #[case("/v1.2.3", "", Some(DocsTarget::Release(Version::new(1, 2, 3))))]
    #[case("/v2.0.0-rc.1/", "/", Some(DocsTarget::Release(Version::parse("2.0.0-rc.1").unwrap())))]
    #[case("/pr-42/index.html", "/index.html", Some(DocsTarget::PullRequest(42)))]
    #[case("/v1.2.3.4/x", "/v1.2.3.4/x", None)]
    #[case("/pr-0/x", "/pr-0/x", None)]
    #[case("/guide/intro.html", "/guide/intro.html", None)]
    #[case("/", "/", None)]
    #[tokio::test]
    async fn route_dispatches_to_serve_default(
        #[case] path: &'static str,
        #[case] expected_path: &'static str,
        #[case] expected_target: Option<DocsTarget>,
    ) {
        let mut handler = MockSiteHandler::new();
        handler
            .expect_serve_default()
            .withf(move |_, p, t| p == expected_path && *t == expected_target)
            .times(1)
            .returning(|_, _, _| marker("default"));
        let router = SiteRouter::new(handler);

        let response = router.route(&SiteRequest::get(path)).await;

        assert_eq!(response.body, b"default");
    }

    #[rstest]
    #[case("/1.2.3/guide.html", None, "/v1.2.3/guide.html")]
    #[case("/1.2.3", Some("q=1"), "/v1.2.3?q=1")]
    #[case("/latest/guide.html", None, "/guide.html")]
    #[case("/latest", Some("q=1"), "/?q=1")]
    #[tokio::test]
    async fn route_redirects_permanently(
        #[case] path: &str,
        #[case] query: Option<&str>,
        #[case] location: &str,
    ) {
        let router = SiteRouter::new(MockSiteHandler::new());
        let mut request = SiteRequest::get(path);
        if let Some(query) = query {
            request = request.with_query(query);
        }

        let response = router.route(&request).await;

        assert_eq!(response.status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), Some(location));
    }

    #[tokio::test]
    async fn route_serves_versions_listing() {
        let mut handler = MockSiteHandler::new();
        handler
            .expect_list_versions()
            .times(1)
            .returning(|_| marker("versions"));
        let router = SiteRouter::new(handler);

        let response = router.route(&SiteRequest::get("/versions.json")).await;

        assert_eq!(response.body, b"versions");
    }

    #[rstest]
    #[case("/../../other/private/main/secret.txt")]
    #[case("/%2e%2e/%2E%2E/other/private/main/secret.txt")]
    #[case("/v1.2.3/guide/../../../secret.txt")]
    #[case("/pr-42/./index.html")]
    #[tokio::test]
    async fn route_rejects_dot_segments(#[case] path: &'static str) {
        let mut handler = MockSiteHandler::new();
        handler.expect_serve_default().never();
        handler
            .expect_serve_not_found()
            .withf(move |_, details| details == format!("Path {path} is not valid."))
            .times(1)
            .returning(|_, _| DocsResponse::minimal_error(StatusCode::NOT_FOUND, "not found"));
        let router = SiteRouter::new(handler);

        let response = router.route(&SiteRequest::get(path)).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[rstest]
    #[case(Method::POST)]
    #[case(Method::PUT)]
    #[case(Method::DELETE)]
    #[tokio::test]
    async fn route_rejects_other_methods(#[case] method: Method) {
        let router = SiteRouter::new(MockSiteHandler::new());

        let response = router.route(&SiteRequest::new(method.clone(), "/")).await;

        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.header(X_ERROR_DETAILS),
            Some(
                format!("The request method {method} is not allowed for this resource.").as_str()
            )
        );
    }
}

//! GitHub REST API implementation of [`ReleaseSource`]

use http::header::{HeaderMap, LINK};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{CONNECT_TIMEOUT, DEFAULT_API_BASE_URL, UpstreamConfig};
use crate::error::UpstreamError;
use crate::release::source::{Page, PageCursor, ReleaseSource, TreeEntry};

const PER_PAGE: u32 = 100;

/// Entry of `GET /repos/{owner}/{repo}/git/matching-refs/{ref}`
#[derive(Debug, Deserialize)]
struct MatchingRef {
    #[serde(rename = "ref")]
    reference: String,
}

/// Response of `GET /repos/{owner}/{repo}/git/trees/{tree_sha}`
#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

/// Lists docs tags and release trees of one repository
pub struct GitHubSource {
    client: reqwest::Client,
    base_url: String,
    owner: String,
    repository: String,
    token: Option<String>,
}

impl GitHubSource {
    /// Creates a new GitHubSource with a custom base URL
    pub fn new(base_url: &str, owner: &str, repository: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("docs-edge")
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repository: repository.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        let base_url = if config.api_base_url.is_empty() {
            DEFAULT_API_BASE_URL
        } else {
            &config.api_base_url
        };
        Self::new(base_url, &config.organization, &config.repository)
            .with_token(&config.access_token)
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.owner, self.repository)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(T, Option<PageCursor>), UpstreamError> {
        debug!("Requesting {}", url);
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        // GitHub signals an exhausted quota with 403 as well
        let rate_limited = status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || (status == reqwest::StatusCode::FORBIDDEN
                && response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .is_some_and(|v| *v == "0"));

        if rate_limited {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(UpstreamError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("GitHub API returned status {}: {}", status, url);
            return Err(UpstreamError::Status {
                status,
                url: url.to_string(),
            });
        }

        let next = next_link(response.headers()).map(PageCursor);
        let body = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub response from {}: {}", url, e);
            UpstreamError::InvalidResponse(e.to_string())
        })?;

        Ok((body, next))
    }
}

#[async_trait::async_trait]
impl ReleaseSource for GitHubSource {
    async fn list_tags(&self, cursor: Option<PageCursor>) -> Result<Page<String>, UpstreamError> {
        let url = match cursor {
            Some(PageCursor(url)) => url,
            None => format!(
                "{}/git/matching-refs/tags/docs?per_page={}&page=1",
                self.repo_url(),
                PER_PAGE
            ),
        };

        let (refs, next): (Vec<MatchingRef>, _) = self.get_page(&url).await?;

        Ok(Page {
            items: refs.into_iter().map(|r| r.reference).collect(),
            next,
        })
    }

    async fn list_tree(
        &self,
        tag: &str,
        cursor: Option<PageCursor>,
    ) -> Result<Page<TreeEntry>, UpstreamError> {
        let url = match cursor {
            Some(PageCursor(url)) => url,
            None => format!(
                "{}/git/trees/docs/{}?recursive=1&per_page={}&page=1",
                self.repo_url(),
                tag,
                PER_PAGE
            ),
        };

        let (response, next): (TreeResponse, _) = self.get_page(&url).await?;
        if response.truncated {
            warn!("Tree listing of docs/{} was truncated by GitHub", tag);
        }

        Ok(Page {
            items: response.tree,
            next,
        })
    }
}

/// Extracts the `rel="next"` target of a `Link` header
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().eq_ignore_ascii_case("rel=\"next\""));
        is_next.then(|| {
            target
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::source::TreeEntryKind;
    use http::HeaderValue;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    #[rstest]
    #[case(
        r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#,
        Some("https://api.github.com/x?page=2")
    )]
    #[case(
        r#"<https://api.github.com/x?page=1>; rel="prev", <https://api.github.com/x?page=1>; rel="first""#,
        None
    )]
    #[case("garbage", None)]
    fn next_link_returns_expected(#[case] header: &str, #[case] expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, HeaderValue::from_str(header).unwrap());

        assert_eq!(next_link(&headers), expected.map(|s| s.to_string()));
    }

    #[tokio::test]
    async fn list_tags_follows_next_links() {
        let mut server = Server::new_async().await;
        let path = "/repos/org/repo/git/matching-refs/tags/docs";

        let first = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header(
                "link",
                &format!(r#"<{}{}?per_page=100&page=2>; rel="next""#, server.url(), path),
            )
            .with_body(r#"[{"ref": "refs/tags/docs/v1.0.0"}, {"ref": "refs/tags/docs/v1.1.0"}]"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", path)
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"ref": "refs/tags/docs/v2.0.0"}]"#)
            .create_async()
            .await;

        let source = GitHubSource::new(&server.url(), "org", "repo").with_token("secret");

        let page = source.list_tags(None).await.unwrap();
        assert_eq!(
            page.items,
            vec!["refs/tags/docs/v1.0.0", "refs/tags/docs/v1.1.0"]
        );
        let page = source.list_tags(page.next).await.unwrap();
        assert_eq!(page.items, vec!["refs/tags/docs/v2.0.0"]);
        assert_eq!(page.next, None);

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn list_tree_parses_entries() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/org/repo/git/trees/docs/v1.2.3")
            .match_query(Matcher::UrlEncoded("recursive".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "sha": "abc",
                    "tree": [
                        {"path": "index.html", "type": "blob", "mode": "100644"},
                        {"path": "assets", "type": "tree", "mode": "040000"},
                        {"path": "vendor/lib", "type": "commit", "mode": "160000"}
                    ],
                    "truncated": false
                }"#,
            )
            .create_async()
            .await;

        let source = GitHubSource::new(&server.url(), "org", "repo");
        let page = source.list_tree("v1.2.3", None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.next, None);
        assert_eq!(
            page.items
                .iter()
                .map(|e| (e.kind, e.path.as_str()))
                .collect::<Vec<_>>(),
            vec![
                (TreeEntryKind::Blob, "index.html"),
                (TreeEntryKind::Tree, "assets"),
                (TreeEntryKind::Commit, "vendor/lib"),
            ]
        );
    }

    #[tokio::test]
    async fn list_tags_returns_rate_limited_for_429() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/org/repo/git/matching-refs/tags/docs")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("retry-after", "60")
            .with_body(r#"{"message": "API rate limit exceeded"}"#)
            .create_async()
            .await;

        let source = GitHubSource::new(&server.url(), "org", "repo");
        let result = source.list_tags(None).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(UpstreamError::RateLimited {
                retry_after_secs: Some(60)
            })
        ));
    }

    #[tokio::test]
    async fn list_tree_returns_status_error_for_unknown_tag() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/repos/org/repo/git/trees/docs/v9.9.9")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let source = GitHubSource::new(&server.url(), "org", "repo");
        let result = source.list_tree("v9.9.9", None).await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(UpstreamError::Status { status, .. }) if status == reqwest::StatusCode::NOT_FOUND
        ));
    }
}

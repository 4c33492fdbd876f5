//! Fake GitHub (REST API and raw content) on a mockito server
//!
//! Every method returns a mock that still has to be created, so tests can set
//! hit expectations first.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use docs_edge::config::SiteConfig;

pub const ORG: &str = "acme";
pub const REPO: &str = "handbook";

pub struct FakeGitHub {
    pub server: ServerGuard,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    /// Configuration pointing both API and raw content at this server
    pub fn config(&self) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.upstream.organization = ORG.to_string();
        config.upstream.repository = REPO.to_string();
        config.upstream.access_user = "bot".to_string();
        config.upstream.access_token = "secret".to_string();
        config.upstream.api_base_url = self.server.url();
        config.upstream.raw_base_url = self.server.url();
        config
    }

    /// Publishes docs tags such as `v1.0.0` or `pr-3`
    pub fn tags(&mut self, tags: &[&str]) -> Mock {
        let refs: Vec<_> = tags
            .iter()
            .map(|tag| json!({ "ref": format!("refs/tags/docs/{tag}") }))
            .collect();
        self.server
            .mock(
                "GET",
                format!("/repos/{ORG}/{REPO}/git/matching-refs/tags/docs").as_str(),
            )
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!(refs).to_string())
    }

    /// Recursive tree of `docs/<tag>`; paths ending in `/` are directories
    pub fn tree(&mut self, tag: &str, paths: &[&str]) -> Mock {
        let entries: Vec<_> = paths
            .iter()
            .map(|path| match path.strip_suffix('/') {
                Some(dir) => json!({ "type": "tree", "path": dir }),
                None => json!({ "type": "blob", "path": path }),
            })
            .collect();
        self.server
            .mock(
                "GET",
                format!("/repos/{ORG}/{REPO}/git/trees/docs/{tag}").as_str(),
            )
            .match_query(Matcher::UrlEncoded("recursive".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "tree": entries, "truncated": false }).to_string())
    }

    /// Raw file `<path>` of `docs/<segment>`
    pub fn file(&mut self, segment: &str, path: &str, body: &str) -> Mock {
        self.server
            .mock("GET", raw_path(segment, path).as_str())
            .match_header("authorization", "Basic Ym90OnNlY3JldA==")
            .with_status(200)
            .with_header("etag", &format!("\"{segment}{path}\""))
            .with_body(body)
    }

    /// Raw file that does not exist
    pub fn missing(&mut self, segment: &str, path: &str) -> Mock {
        self.server
            .mock("GET", raw_path(segment, path).as_str())
            .with_status(404)
            .with_body("404: Not Found")
    }
}

fn raw_path(segment: &str, path: &str) -> String {
    format!("/{ORG}/{REPO}/refs/tags/docs/{segment}{path}")
}

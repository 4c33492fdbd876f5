//! `/versions.json` listing consumed by the docs version selector

use http::StatusCode;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use crate::config::VERSIONS_LISTING_TTL;
use crate::content::DocsResponse;
use crate::release::ReleaseSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionEntry {
    pub version: String,
    pub title: String,
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,
}

/// One entry per known release, newest first
///
/// The latest release points at the site root (`..`) since it is served
/// unversioned.
pub fn entries(snapshot: &ReleaseSnapshot) -> Vec<VersionEntry> {
    let latest = snapshot.latest.to_string();
    snapshot
        .all
        .iter()
        .map(|version| {
            let name = version.to_string();
            if name == latest {
                VersionEntry {
                    version: "..".to_string(),
                    title: format!("Latest ({name})"),
                    aliases: vec!["latest".to_string()],
                    latest: Some(true),
                }
            } else {
                VersionEntry {
                    version: format!("v{name}"),
                    title: name,
                    aliases: Vec::new(),
                    latest: None,
                }
            }
        })
        .collect()
}

pub fn render(snapshot: &ReleaseSnapshot) -> Result<DocsResponse, serde_json::Error> {
    let body = serde_json::to_vec(&entries(snapshot))?;

    let mut headers = HeaderMap::new();
    if let Ok(value) =
        HeaderValue::from_str(&format!("public, max-age={}", VERSIONS_LISTING_TTL.as_secs()))
    {
        headers.insert(CACHE_CONTROL, value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(DocsResponse::new(StatusCode::OK, headers, body))
}

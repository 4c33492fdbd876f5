//! Documentation targets: a released version or a pull-request preview

use std::fmt;

use semver::Version;

/// Prefix of every release tag carrying documentation
pub const DOCS_REF_PREFIX: &str = "refs/tags/docs/";

/// What a request selects upstream
///
/// Releases live under `docs/v<version>`, previews under `docs/pr-<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocsTarget {
    Release(Version),
    PullRequest(u64),
}

impl DocsTarget {
    /// Path segment of the tag below `refs/tags/docs/`
    pub fn segment(&self) -> String {
        match self {
            DocsTarget::Release(version) => format!("v{version}"),
            DocsTarget::PullRequest(number) => format!("pr-{number}"),
        }
    }

    /// PR previews and prereleases change often and are cached briefly
    pub fn is_volatile(&self) -> bool {
        match self {
            DocsTarget::Release(version) => !version.pre.is_empty(),
            DocsTarget::PullRequest(_) => true,
        }
    }

    /// Name and value of the header announcing what was served
    pub fn marker_header(&self) -> (&'static str, String) {
        match self {
            DocsTarget::Release(version) => ("x-version", version.to_string()),
            DocsTarget::PullRequest(number) => ("x-pr", number.to_string()),
        }
    }

    pub fn as_release(&self) -> Option<&Version> {
        match self {
            DocsTarget::Release(version) => Some(version),
            DocsTarget::PullRequest(_) => None,
        }
    }
}

impl fmt::Display for DocsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocsTarget::Release(version) => write!(f, "{version}"),
            DocsTarget::PullRequest(number) => write!(f, "pr-{number}"),
        }
    }
}

/// Parse a version with an optional leading `v`.
///
/// Examples:
/// - "v1.2.3" -> Version(1, 2, 3)
/// - "1.2.3-beta.1" -> Version(1, 2, 3, pre: beta.1)
/// - "1.2" -> None
pub fn parse_version(raw: &str) -> Option<Version> {
    let stripped = raw.strip_prefix('v').unwrap_or(raw);
    Version::parse(stripped).ok()
}

/// Parse a full tag reference such as `refs/tags/docs/v1.2.3`.
///
/// References outside the docs prefix and unparsable suffixes yield None.
pub fn parse_docs_ref(reference: &str) -> Option<Version> {
    reference
        .strip_prefix(DOCS_REF_PREFIX)
        .and_then(parse_version)
}

/// Interpret a single path segment as a target.
///
/// - `v1.2.3`, `v1.2.3-rc.1` -> release
/// - `pr-42`, `42` -> pull request
/// - anything else -> None (the request is not versioned)
pub fn parse_segment(segment: &str) -> Option<DocsTarget> {
    if let Some(number) = segment.strip_prefix("pr-") {
        return parse_pr_number(number).map(DocsTarget::PullRequest);
    }
    if let Some(number) = parse_pr_number(segment) {
        return Some(DocsTarget::PullRequest(number));
    }
    let version = segment.strip_prefix('v')?;
    Version::parse(version).ok().map(DocsTarget::Release)
}

fn parse_pr_number(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok().filter(|n| *n > 0)
}

//! Source trait for release tags and release trees

#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

use crate::error::UpstreamError;

/// Opaque continuation token returned by a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub String);

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Kind of an entry in a git tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeEntryKind {
    Blob,
    Tree,
    Commit,
    #[serde(other)]
    Other,
}

/// An entry of a recursive tree listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub kind: TreeEntryKind,
    #[serde(default)]
    pub path: String,
}

impl TreeEntry {
    pub fn blob(path: &str) -> Self {
        Self {
            kind: TreeEntryKind::Blob,
            path: path.to_string(),
        }
    }
}

/// Trait for listing what has been published upstream
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Lists full ref names below `refs/tags/docs/`
    ///
    /// # Arguments
    /// * `cursor` - None for the first page, otherwise the `next` of the previous page
    async fn list_tags(&self, cursor: Option<PageCursor>) -> Result<Page<String>, UpstreamError>;

    /// Lists the recursive tree of a docs tag (e.g. "v1.2.3")
    async fn list_tree(
        &self,
        tag: &str,
        cursor: Option<PageCursor>,
    ) -> Result<Page<TreeEntry>, UpstreamError>;
}

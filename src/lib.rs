//! Edge proxy for versioned documentation hosted as git tags on GitHub
//!
//! Requests for `/v<version>/...`, `/pr-<n>/...` or unversioned paths are
//! resolved against the published `docs/*` tags and served from a response
//! cache that is filled from raw repository content on demand.

pub mod app;
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod release;
pub mod site;
pub mod store;

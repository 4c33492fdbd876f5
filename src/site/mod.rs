//! The public documentation site
//!
//! - [`router`]: Path rules (versioned, previews, legacy redirects)
//! - [`handler`]: Capabilities behind the router and their implementation
//! - [`versions`]: `/versions.json` listing
//! - [`server`]: axum front end
//! - [`warm`]: Cache warming of the latest release

pub mod handler;
pub mod router;
pub mod server;
pub mod versions;
pub mod warm;

pub use handler::{DocsSite, SiteHandler, SiteRequest};
pub use router::SiteRouter;

//! Release tracking and version resolution
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Source    │────▶│  Registry   │◀────│  Resolver   │
//! │ (GitHub API)│     │ (snapshot)  │     │ (requests)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │   KvStore   │
//!                     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`target`]: Release / pull-request targets and their parsing
//! - [`source`]: Trait for listing docs tags and release trees
//! - [`github`]: GitHub REST API source
//! - [`registry`]: Self-healing release snapshot
//! - [`resolver`]: Request → concrete target resolution

pub mod github;
pub mod registry;
pub mod resolver;
pub mod source;
pub mod target;

pub use registry::{ReleaseRegistry, ReleaseSnapshot};
pub use resolver::{ResolvedTarget, VersionResolver};
pub use target::DocsTarget;

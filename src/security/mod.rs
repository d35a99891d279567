//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     routing.exclude_headers          → headers.rs (compiled HeaderFilter)
//!     routing.allowed_redirect_domains → redirects.rs (RedirectAllowList)
//!
//! Per request:
//!     echo endpoints  → HeaderFilter hides platform headers
//!     /redirect-to    → RedirectAllowList accepts or refuses the target
//! ```
//!
//! # Design Decisions
//! - Fail closed: a target that cannot be checked is refused
//! - Both tables are read-only after startup

pub mod headers;
pub mod redirects;

pub use headers::HeaderFilter;
pub use redirects::RedirectAllowList;

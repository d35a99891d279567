//! Endpoint execution engine.
//!
//! # Data Flow
//! ```text
//! Request
//!     → middleware.rs (declared size check, start clock, bound body)
//!     → context.rs (deadline + cancellation handed to the handler)
//!     → plan.rs (streamed output scheduled against the budget)
//!     → middleware.rs (response body keeps the deadline and the guard)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - Two ceilings only: body bytes and wall-clock duration
//! - Settings are published once as `Arc<Settings>` and never mutated
//! - Every suspension point goes through [`RequestContext`]

pub mod context;
pub mod error;
pub mod limits;
pub mod middleware;
pub mod plan;
pub mod settings;

pub use context::{CancelGuard, RequestContext};
pub use error::{EngineError, EngineResult};
pub use limits::{find_body_too_large, BodyTooLarge, BoundedBody};
pub use middleware::{bounded_output, enforce_constraints};
pub use plan::StreamPlan;
pub use settings::Settings;

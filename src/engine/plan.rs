//! Output plans for paced and streamed responses.
//!
//! A [`StreamPlan`] is computed from request parameters before any byte of the
//! response is written and never changes afterwards. Planning is where size and
//! time are checked against the ceilings, so a request that cannot be served fails
//! with a clean error instead of a truncated stream.

use std::time::Duration;

use tokio::time::Instant;

use crate::engine::context::RequestContext;
use crate::engine::error::{EngineError, EngineResult};

/// Immutable schedule for a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    items: u64,
    bytes: Option<u64>,
    initial_delay: Duration,
    interval: Duration,
    origin: Instant,
    clamped: bool,
}

impl StreamPlan {
    /// Plan `items` writes: the first after `initial_delay`, the rest spaced by
    /// `duration / items`. `bytes`, when known, is split evenly across the items.
    ///
    /// If the schedule does not fit the request's budget, the initial delay and the
    /// spacing are scaled down by the same factor and the plan is marked clamped.
    pub fn build(
        ctx: &RequestContext,
        items: u64,
        bytes: Option<u64>,
        initial_delay: Duration,
        duration: Duration,
    ) -> EngineResult<Self> {
        if items == 0 {
            return Err(EngineError::InvalidParameter(
                "number of chunks must be at least 1".into(),
            ));
        }
        if let Some(bytes) = bytes {
            let limit = ctx.settings().max_body_size;
            if bytes > limit {
                return Err(EngineError::InvalidParameter(format!(
                    "response of {bytes} bytes exceeds the {limit} byte limit"
                )));
            }
            if items > bytes {
                return Err(EngineError::InvalidParameter(format!(
                    "cannot split {bytes} bytes into {items} chunks"
                )));
            }
        }
        ctx.check()?;

        let interval = duration / u32::try_from(items).unwrap_or(u32::MAX);
        let mut plan = Self {
            items,
            bytes,
            initial_delay,
            interval,
            origin: Instant::now(),
            clamped: false,
        };

        let projected = plan.projected_duration();
        let budget = ctx.budget();
        if projected > budget {
            let factor = budget.as_secs_f64() / projected.as_secs_f64();
            plan.initial_delay = plan.initial_delay.mul_f64(factor);
            plan.interval = plan.interval.mul_f64(factor);
            plan.clamped = true;

            // Float rounding must never push the last write past the budget.
            if plan.projected_duration() > budget {
                let spacing = plan.projected_duration() - plan.initial_delay;
                plan.initial_delay = budget.saturating_sub(spacing);
            }
            tracing::debug!(
                projected_ms = projected.as_millis() as u64,
                budget_ms = budget.as_millis() as u64,
                "Stream schedule scaled to fit duration budget"
            );
        }

        Ok(plan)
    }

    pub fn items(&self) -> u64 {
        self.items
    }

    pub fn is_clamped(&self) -> bool {
        self.clamped
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time from planning to the last write. Saturates at `Duration::MAX`.
    pub fn projected_duration(&self) -> Duration {
        let gaps = u32::try_from(self.items.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_add(self.interval.saturating_mul(gaps))
    }

    /// When the first item is due.
    pub fn start_at(&self) -> Instant {
        later(self.origin, self.initial_delay)
    }

    /// When item `index` is due. Absolute, so pacing never drifts.
    pub fn due_at(&self, index: u64) -> Instant {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        later(self.start_at(), self.interval.saturating_mul(index))
    }

    /// Length of chunk `index` when the byte total is known. Chunk lengths differ by
    /// at most one byte, the longer ones first.
    pub fn chunk_len(&self, index: u64) -> u64 {
        let Some(bytes) = self.bytes else { return 0 };
        if index >= self.items {
            return 0;
        }
        let base = bytes / self.items;
        let extra = bytes % self.items;
        base + u64::from(index < extra)
    }

    /// Byte offset at which chunk `index` starts.
    pub fn chunk_offset(&self, index: u64) -> u64 {
        let Some(bytes) = self.bytes else { return 0 };
        let index = index.min(self.items);
        let base = bytes / self.items;
        let extra = bytes % self.items;
        index * base + index.min(extra)
    }

    /// Header value advertising the effective duration of a clamped plan.
    pub fn clamped_header(&self) -> Option<String> {
        self.clamped
            .then(|| format!("{:.3}", self.projected_duration().as_secs_f64()))
    }
}

/// `base + offset`, or roughly thirty years out when that is not representable.
fn later(base: Instant, offset: Duration) -> Instant {
    base.checked_add(offset)
        .unwrap_or_else(|| base + Duration::from_secs(86_400 * 365 * 30))
}

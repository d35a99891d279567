//! Per-request execution context: deadline and cancellation.
//!
//! # Responsibilities
//! - Derive the request deadline from the configured duration ceiling
//! - Carry a cancellation signal that fires at the deadline or when the client goes away
//! - Provide the only sleep primitive handlers are allowed to use
//!
//! # Design Decisions
//! - Cancellation is a `watch` channel; the sender lives in a [`CancelGuard`] owned by
//!   whoever holds the response (middleware, then the response body). Dropping the guard
//!   closes the channel, which every receiver observes as cancellation.
//! - Client-requested delays are clamped by the caller, never silently extended

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::engine::error::EngineError;
use crate::engine::settings::Settings;

/// Time kept back from handler budgets so the final write lands before the deadline.
const FLUSH_HEADROOM: Duration = Duration::from_millis(50);

/// Owner side of a request's cancellation signal.
///
/// Dropping it cancels the request.
#[derive(Debug)]
pub struct CancelGuard {
    tx: watch::Sender<bool>,
}

impl CancelGuard {
    /// Fire the signal explicitly.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Per-request state handed to every handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    started: Instant,
    deadline: Instant,
    cancel_rx: watch::Receiver<bool>,
    settings: Arc<Settings>,
    peer: Option<SocketAddr>,
}

impl RequestContext {
    /// Start the clock for a new request.
    pub fn new(settings: Arc<Settings>, peer: Option<SocketAddr>) -> (Self, CancelGuard) {
        let started = Instant::now();
        let deadline = started + settings.max_duration;
        let (tx, cancel_rx) = watch::channel(false);
        (
            Self {
                started,
                deadline,
                cancel_rx,
                settings,
                peer,
            },
            CancelGuard { tx },
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Time a handler may still plan to spend: the remaining time minus a small
    /// headroom (at most a tenth of it) for flushing the last write.
    pub fn budget(&self) -> Duration {
        let remaining = self.remaining();
        remaining.saturating_sub(FLUSH_HEADROOM.min(remaining / 10))
    }

    /// Shorten `requested` to the budget. The flag reports whether it was cut.
    pub fn clamp(&self, requested: Duration) -> (Duration, bool) {
        let budget = self.budget();
        if requested > budget {
            tracing::debug!(
                requested_ms = requested.as_millis() as u64,
                granted_ms = budget.as_millis() as u64,
                "Clamping requested duration to remaining budget"
            );
            (budget, true)
        } else {
            (requested, false)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        Instant::now() >= self.deadline
            || self.cancel_rx.has_changed().is_err()
            || *self.cancel_rx.borrow()
    }

    /// Fail fast if the request is already cancelled.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.is_cancelled() {
            Err(EngineError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Resolves once the deadline passes or the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        tokio::select! {
            () = tokio::time::sleep_until(self.deadline) => {}
            _ = rx.wait_for(|cancelled| *cancelled) => {}
        }
    }

    /// Sleep for `duration`, returning early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), EngineError> {
        self.sleep_until(Instant::now() + duration).await
    }

    /// Sleep until `wake`, returning early with an error on cancellation.
    ///
    /// A wake time past the deadline sleeps until the deadline and fails;
    /// one exactly on it succeeds.
    pub async fn sleep_until(&self, wake: Instant) -> Result<(), EngineError> {
        self.check()?;

        let mut rx = self.cancel_rx.clone();
        tokio::select! {
            biased;
            () = tokio::time::sleep_until(wake.min(self.deadline)) => {}
            _ = rx.wait_for(|cancelled| *cancelled) => return Err(EngineError::DeadlineExceeded),
        }

        if wake > self.deadline {
            Err(EngineError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

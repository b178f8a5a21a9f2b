//! Per-feature request state and single-flight enforcement.
//!
//! Each feature instance owns a [`FlightControl`]. Starting a request moves it
//! from `Idle` (or `Failed`) to `Generating`; a second start while
//! `Generating` is rejected rather than queued. The returned [`FlightGuard`]
//! settles the state when the request finishes, or resets it to `Idle` if
//! the request future is dropped.

use std::sync::{Mutex, MutexGuard};

/// Request state of one feature instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureState {
    /// No request outstanding.
    #[default]
    Idle,
    /// A request is outstanding.
    Generating,
    /// The last request failed. A new request may start.
    Failed,
}

/// A request was started while another was outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a request is already in flight")]
pub struct Busy;

/// Owner of a feature's [`FeatureState`].
#[derive(Debug, Default)]
pub struct FlightControl {
    state: Mutex<FeatureState>,
}

impl FlightControl {
    /// Start in `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeatureState> {
        // The state is a plain Copy value, so a poisoned lock still holds a valid one.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> FeatureState {
        *self.lock()
    }

    /// Whether a request is outstanding.
    pub fn is_generating(&self) -> bool {
        self.state() == FeatureState::Generating
    }

    /// Transition to `Generating`.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] if a request is already outstanding.
    pub fn begin(&self) -> Result<FlightGuard<'_>, Busy> {
        let mut state = self.lock();
        if *state == FeatureState::Generating {
            return Err(Busy);
        }
        *state = FeatureState::Generating;
        Ok(FlightGuard {
            control: self,
            settled: false,
        })
    }

    fn settle(&self, next: FeatureState) {
        *self.lock() = next;
    }
}

/// Proof that the holder owns the single in-flight slot.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    control: &'a FlightControl,
    settled: bool,
}

impl FlightGuard<'_> {
    /// Request finished normally: back to `Idle`.
    pub fn succeed(mut self) {
        self.settled = true;
        self.control.settle(FeatureState::Idle);
    }

    /// Request failed: move to `Failed`.
    pub fn fail(mut self) {
        self.settled = true;
        self.control.settle(FeatureState::Failed);
    }

    /// Settle according to whether the request succeeded.
    pub fn finish(self, ok: bool) {
        if ok {
            self.succeed();
        } else {
            self.fail();
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.control.settle(FeatureState::Idle);
        }
    }
}

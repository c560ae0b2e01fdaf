//! Idle timeout guard
//!
//! The guard is an explicit, call-scoped deadline rather than a process-wide alarm.
//! It moves through `Disarmed -> Armed -> (Fired | Disarmed)`:
//!
//! - armed immediately before a blocking pull/read,
//! - disarmed immediately after that call returns,
//! - fired when the source stays silent until the deadline.
//!
//! Arming replaces any earlier deadline; there is never more than one. Waiting is a
//! timed `poll` on the source, so an expired deadline never interrupts a syscall
//! half way and cannot corrupt the delivered byte count.

use catn_types::{Error, IdleTimeout, Result, StreamEndpoints};
use std::time::{Duration, Instant};
use tracing::warn;

/// Where the guard is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// No deadline pending
    Disarmed,
    /// A deadline is pending for the current blocking call
    Armed {
        /// When the pending call times out
        deadline: Instant,
    },
    /// The deadline expired; the transfer is over
    Fired,
}

/// Deadline around each blocking pull/read
#[derive(Debug, Clone)]
pub struct IdleGuard {
    timeout: IdleTimeout,
    state: GuardState,
}

impl IdleGuard {
    /// Create a disarmed guard; a disabled timeout makes every operation a no-op
    pub fn new(timeout: IdleTimeout) -> Self {
        Self {
            timeout,
            state: GuardState::Disarmed,
        }
    }

    /// Whether a timeout is configured
    pub fn is_enabled(&self) -> bool {
        self.timeout.is_enabled()
    }

    /// Current state
    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Arm a fresh deadline, replacing any pending one
    pub fn arm(&mut self) {
        if let Some(timeout) = self.timeout.duration() {
            self.state = GuardState::Armed {
                deadline: Instant::now() + timeout,
            };
        }
    }

    /// Clear the pending deadline
    pub fn disarm(&mut self) {
        if matches!(self.state, GuardState::Armed { .. }) {
            self.state = GuardState::Disarmed;
        }
    }

    /// Block until the source has input or the armed deadline expires
    ///
    /// `delivered` is the count already confirmed at the destination; it is carried
    /// in the timeout error so the caller never sees more than was flushed.
    pub fn wait_for_input<E>(&mut self, endpoints: &mut E, delivered: u64) -> Result<()>
    where
        E: StreamEndpoints + ?Sized,
    {
        let GuardState::Armed { deadline } = self.state else {
            return Ok(());
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let ready = if remaining.is_zero() {
            false
        } else {
            endpoints
                .wait_readable(remaining)
                .map_err(|e| Error::read(endpoints.source_fd(), &e))?
        };

        if ready {
            return Ok(());
        }

        self.state = GuardState::Fired;
        warn!(
            "no data on fd {} for {} sec, aborting after {} bytes",
            endpoints.source_fd(),
            self.timeout.as_secs(),
            delivered
        );
        Err(Error::Timeout {
            seconds: self.timeout.as_secs(),
            delivered,
        })
    }

    /// Time left on the pending deadline
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            GuardState::Armed { deadline } => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
            _ => None,
        }
    }
}

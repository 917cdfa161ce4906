//! Status-flag wait policies.
//!
//! Every busy-wait in the engine goes through a [`WaitPolicy`], with the
//! condition expressed as a named predicate over the controller registers
//! (see [`crate::lpspi::tx_fifo_drained`] and friends).
//!
//! The default policy, [`Spin`], never gives up: a peripheral that stops
//! clocking blocks the calling thread forever. That is the synchronous
//! contract of the bus. Continuous chip-select depends on the transfer not
//! being preempted, so there is no yield point. [`BoundedSpin`] is for callers
//! that would rather see [`Error::PeripheralUnresponsive`].

use crate::Error;

/// Strategy for polling a hardware condition.
pub trait WaitPolicy {
    /// Poll `ready` until it returns `true`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; [`Spin`] never fails.
    fn wait_until<F>(&mut self, ready: F) -> Result<(), Error>
    where
        F: FnMut() -> bool;
}

/// Unbounded busy-wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Spin;

impl WaitPolicy for Spin {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<(), Error>
    where
        F: FnMut() -> bool,
    {
        while !ready() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Busy-wait that gives up after `max_polls` unsuccessful polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundedSpin {
    max_polls: u32,
}

impl BoundedSpin {
    /// Give up after `max_polls` polls of the condition.
    #[must_use]
    pub const fn new(max_polls: u32) -> Self {
        Self { max_polls }
    }

    /// Poll budget per wait.
    #[must_use]
    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }
}

impl WaitPolicy for BoundedSpin {
    fn wait_until<F>(&mut self, mut ready: F) -> Result<(), Error>
    where
        F: FnMut() -> bool,
    {
        for _ in 0..self.max_polls {
            if ready() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        warn!("status wait gave up after {} polls", self.max_polls);
        Err(Error::PeripheralUnresponsive)
    }
}

impl<W: WaitPolicy + ?Sized> WaitPolicy for &mut W {
    fn wait_until<F>(&mut self, ready: F) -> Result<(), Error>
    where
        F: FnMut() -> bool,
    {
        (**self).wait_until(ready)
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn spin_returns_once_ready() {
        let mut polls = 0u32;
        let result = Spin.wait_until(|| {
            polls += 1;
            polls == 5
        });
        assert_eq!(result, Ok(()));
        assert_eq!(polls, 5);
    }

    #[test]
    fn bounded_spin_succeeds_within_budget() {
        let mut polls = 0u32;
        let result = BoundedSpin::new(10).wait_until(|| {
            polls += 1;
            polls == 10
        });
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn bounded_spin_gives_up() {
        let mut polls = 0u32;
        let result = BoundedSpin::new(3).wait_until(|| {
            polls += 1;
            false
        });
        assert_eq!(result, Err(Error::PeripheralUnresponsive));
        assert_eq!(polls, 3);
    }

    #[test]
    fn zero_budget_never_polls() {
        let mut polled = false;
        let result = BoundedSpin::new(0).wait_until(|| {
            polled = true;
            true
        });
        assert_eq!(result, Err(Error::PeripheralUnresponsive));
        assert!(!polled);
    }
}

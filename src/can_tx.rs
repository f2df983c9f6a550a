//! C12: CAN TX manager. One reserved mailbox for the control frame, an
//! abort/retry policy on pending occupancy, and a high-water occupancy
//! counter for diagnostics.
//!
//! The HAL/peripheral calls (`is_pending`, `abort`, `post`) are injected via
//! the `CanMailbox` trait so this module stays free of any FDCAN/HAL types
//! and is host-testable.

use crate::error::{Error, Result};

/// The three HAL-level primitives the manager needs from the CAN
/// peripheral's reserved TX mailbox.
pub trait CanMailbox {
    /// True if the mailbox still holds an unsent frame.
    fn is_pending(&mut self) -> bool;
    /// Requests the peripheral abort the pending frame (non-blocking).
    fn request_abort(&mut self);
    /// Posts `payload` to the mailbox. Only called once `is_pending` is false.
    fn post(&mut self, payload: &[u8; 8]);
}

pub struct CanTxManager {
    can_occupancy_cnt: u32,
    max_can_occupancy_cnt: u32,
}

impl CanTxManager {
    pub fn new() -> Self {
        Self {
            can_occupancy_cnt: 0,
            max_can_occupancy_cnt: 0,
        }
    }

    pub fn occupancy_high_water(&self) -> u32 {
        self.max_can_occupancy_cnt
    }

    /// Sends `payload` on `mailbox`. `poll_cleared` is called in a bounded
    /// busy loop (no sleep) until the abort completes or
    /// `abort_poll_ms` elapses; the caller supplies wall-clock so this stays
    /// host-testable without a real timer.
    pub fn send(
        &mut self,
        mailbox: &mut impl CanMailbox,
        payload: &[u8; 8],
        abort_poll_ms: u32,
        mut elapsed_ms: impl FnMut() -> u32,
    ) -> Result<()> {
        if !mailbox.is_pending() {
            self.can_occupancy_cnt = 0;
            mailbox.post(payload);
            return Ok(());
        }

        self.can_occupancy_cnt += 1;
        if self.can_occupancy_cnt > self.max_can_occupancy_cnt {
            self.max_can_occupancy_cnt = self.can_occupancy_cnt;
        }
        mailbox.request_abort();

        // Wrapping subtraction against a captured start, not `start + abort_poll_ms`,
        // so a free-running ms counter near `u32::MAX` can't overflow the deadline.
        let start = elapsed_ms();
        loop {
            if !mailbox.is_pending() {
                mailbox.post(payload);
                return Ok(());
            }
            if crate::clock::elapsed_ms(elapsed_ms(), start) >= abort_poll_ms {
                return Err(Error::BusStuck);
            }
        }
    }
}

impl Default for CanTxManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct FakeMailbox {
        pending: bool,
        aborts_requested: u32,
        posts: u32,
        /// Clears `pending` the Nth poll after `request_abort`, to simulate
        /// an abort completing after some ticks.
        clears_after_polls: Option<u32>,
        polls_since_abort: u32,
    }

    impl CanMailbox for FakeMailbox {
        fn is_pending(&mut self) -> bool {
            if self.pending {
                if let Some(n) = self.clears_after_polls {
                    self.polls_since_abort += 1;
                    if self.polls_since_abort >= n {
                        self.pending = false;
                    }
                }
            }
            self.pending
        }
        fn request_abort(&mut self) {
            self.aborts_requested += 1;
            self.polls_since_abort = 0;
        }
        fn post(&mut self, _payload: &[u8; 8]) {
            self.posts += 1;
            self.pending = true;
        }
    }

    #[test]
    fn free_mailbox_posts_once() {
        let mut mgr = CanTxManager::new();
        let mut mb = FakeMailbox {
            pending: false,
            aborts_requested: 0,
            posts: 0,
            clears_after_polls: None,
            polls_since_abort: 0,
        };
        mgr.send(&mut mb, &[0u8; 8], 2, || 0).unwrap();
        assert_eq!(mb.posts, 1);
        assert_eq!(mb.aborts_requested, 0);
    }

    #[test]
    fn pending_mailbox_aborts_then_posts_after_clear() {
        let mut mgr = CanTxManager::new();
        let mut mb = FakeMailbox {
            pending: true,
            aborts_requested: 0,
            posts: 0,
            clears_after_polls: Some(2),
            polls_since_abort: 0,
        };
        let t = Cell::new(0u32);
        mgr.send(&mut mb, &[0u8; 8], 2, || {
            let now = t.get();
            t.set(now + 1);
            now
        })
        .unwrap();
        assert_eq!(mb.aborts_requested, 1);
        assert_eq!(mb.posts, 1);
    }

    #[test]
    fn pending_that_never_clears_is_bus_stuck() {
        let mut mgr = CanTxManager::new();
        let mut mb = FakeMailbox {
            pending: true,
            aborts_requested: 0,
            posts: 0,
            clears_after_polls: None,
            polls_since_abort: 0,
        };
        let t = Cell::new(0u32);
        let result = mgr.send(&mut mb, &[0u8; 8], 2, || {
            let now = t.get();
            t.set(now + 1);
            now
        });
        assert_eq!(result, Err(Error::BusStuck));
        assert_eq!(mb.posts, 0);
    }
}

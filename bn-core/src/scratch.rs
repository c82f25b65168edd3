//! The reusable workspace lent to multi-precision primitives.
use crate::{
    error::{queue, Reason},
    prim::{Failed, Status},
};
use num_bigint::BigInt;
use num_traits::Zero;
use tracing::debug;

/// A pool of big-integer temporaries.
///
/// Primitives borrow a frame of slots for the duration of one call. Slots are reset to
/// zero on every lend, so nothing computed by one call is visible to the next.
#[derive(Debug)]
pub struct Scratch {
    slots: Vec<BigInt>,
    lends: u64,
    peak: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchStats {
    /// Frames lent so far.
    pub lends: u64,
    /// Largest frame lent so far.
    pub peak: usize,
    /// Slots currently held by the pool.
    pub slots: usize,
}

impl Scratch {
    /// Reserve `slots` temporaries; a failed reservation is queued as a malloc failure.
    pub(crate) fn new(slots: usize) -> Status<Self> {
        let mut pool = Vec::new();
        if pool.try_reserve_exact(slots).is_err() {
            queue::push(Reason::MallocFailure, "Scratch::new");
            return Err(Failed);
        }
        pool.resize_with(slots, BigInt::zero);
        debug!(slots, "scratch workspace reserved");
        Ok(Self {
            slots: pool,
            lends: 0,
            peak: 0,
        })
    }

    /// Lend `n` zeroed slots to `f`; the pool grows if it holds fewer.
    pub(crate) fn frame<R>(&mut self, n: usize, f: impl FnOnce(&mut [BigInt]) -> R) -> R {
        if self.slots.len() < n {
            debug!(from = self.slots.len(), to = n, "growing scratch workspace");
            self.slots.resize_with(n, BigInt::zero);
        }
        let frame = &mut self.slots[..n];
        frame.iter_mut().for_each(Zero::set_zero);
        self.lends += 1;
        self.peak = self.peak.max(n);
        f(frame)
    }

    pub fn stats(&self) -> ScratchStats {
        ScratchStats {
            lends: self.lends,
            peak: self.peak,
            slots: self.slots.len(),
        }
    }
}

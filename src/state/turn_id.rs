use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Cheap per-process turn ids: a random seed XOR a monotonically increasing
/// sequence number.
pub(crate) struct TurnIdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl TurnIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        let seed_hi = u128::from(fastrand::u64(..));
        let seed_lo = u128::from(fastrand::u64(..));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            counter: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_turn_id(&self) -> Uuid {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        Uuid::from_u128(self.seed ^ u128::from(seq))
    }
}

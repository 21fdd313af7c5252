//! Order Number Generation
//!
//! Human-facing numbers, distinct from the internal snowflake id.
//! Timestamp + sequence + random suffix makes collisions unlikely, but
//! the UNIQUE index on orders.order_number is the actual guarantee; on
//! a constraint hit the caller regenerates and retries.

use rand::Rng;
use shared::util::now_millis;
use std::sync::atomic::{AtomicU32, Ordering};

/// Generate order numbers for one process.
///
/// Format: ORD{unix_millis}{seq:04}{random:03}
/// Example: ORD17561234567891234507
pub struct OrderNumberGenerator {
    /// Wrapping per-process sequence, decorrelates same-millisecond calls
    seq: AtomicU32,
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self {
            seq: AtomicU32::new(0),
        }
    }

    pub fn next(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) % 10_000;
        let random: u32 = rand::thread_rng().gen_range(0..1000);
        format!("ORD{}{seq:04}{random:03}", now_millis())
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

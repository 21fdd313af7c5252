/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: wrapping sequence, randomly seeded per process
///
/// Orders, order items and history rows all draw from this generator.
/// Creating one order mints a whole batch of ids inside a single
/// millisecond, so the low bits advance as a sequence rather than
/// rolling fresh random values per call.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    static SEQ: OnceLock<AtomicU32> = OnceLock::new();

    let seq = SEQ.get_or_init(|| AtomicU32::new(rand::thread_rng().gen_range(0..0x1000)));
    let ts = (now_millis() - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let low = i64::from(seq.fetch_add(1, Ordering::Relaxed)) & 0xFFF; // 12 bits
    (ts << 12) | low
}

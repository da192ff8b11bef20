//! Delay strategies: how long to wait before the next attempt.

use std::time::Duration;

use super::policy::Config;

/// Largest shift allowed on a duration counted in signed 64-bit nanoseconds.
/// 1 << 63 would reach the sign bit, thus 62.
const MAX_SHIFT: u32 = 62;

/// Base delay in nanoseconds as the backoff math sees it: at least 1ns and
/// no larger than a signed 64-bit nanosecond count.
pub(crate) fn base_nanos(delay: Duration) -> u64 {
    delay.as_nanos().clamp(1, i64::MAX as u128) as u64
}

/// Largest `m` such that `base << m` still fits in a signed 64-bit nanosecond count.
pub(crate) fn max_backoff_exponent(delay: Duration) -> u32 {
    let floor_log2 = 63 - base_nanos(delay).leading_zeros();
    MAX_SHIFT.saturating_sub(floor_log2)
}

/// Binary backoff: `delay * 2^n`, with `n` clamped so the result never overflows.
///
/// `n` is the 0-based attempt index. Not capped by `max_delay`; use
/// [`capped_backoff_delay`] for that.
pub fn backoff_delay<E>(n: u32, _err: &E, config: &Config<E>) -> Duration {
    let n = n.min(config.max_backoff_n());
    Duration::from_nanos(base_nanos(config.delay()) << n)
}

/// Always the configured base delay.
pub fn fixed_delay<E>(_n: u32, _err: &E, config: &Config<E>) -> Duration {
    config.delay()
}

/// [`backoff_delay`] clamped to the configured `max_delay`.
pub fn capped_backoff_delay<E>(n: u32, err: &E, config: &Config<E>) -> Duration {
    backoff_delay(n, err, config).min(config.max_delay())
}

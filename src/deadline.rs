//! # Deadlines
//!
//! Absolute call deadlines and the `grpc-timeout` header encoding that carries
//! the remaining budget to the server.

use std::time::{Duration, SystemTime};

use tokio::time::Instant;

/// Largest value the `grpc-timeout` header allows (8 ASCII digits).
const MAX_TIMEOUT_VALUE: u128 = 99_999_999;

/// Units from finest to coarsest, in nanoseconds.
const TIMEOUT_UNITS: [(u128, char); 6] = [
    (1, 'n'),
    (1_000, 'u'),
    (1_000_000, 'm'),
    (1_000_000_000, 'S'),
    (60_000_000_000, 'M'),
    (3_600_000_000_000, 'H'),
];

/// Horizon used when a requested deadline lies beyond what `Instant` can hold.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Absolute point in time after which a call is aborted.
///
/// Timeouts too large to represent saturate to a deadline about thirty years
/// out, so `Duration::MAX` reads as "effectively never".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    instant: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self {
            instant: saturating_from_now(Instant::now(), timeout),
        }
    }

    /// Deadline at a wall-clock timestamp; a timestamp in the past yields an
    /// already expired deadline.
    pub fn at(when: SystemTime) -> Self {
        let now = Instant::now();
        let instant = match when.duration_since(SystemTime::now()) {
            Ok(remaining) => saturating_from_now(now, remaining),
            Err(elapsed) => now.checked_sub(elapsed.duration()).unwrap_or(now),
        };
        Self { instant }
    }

    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.instant.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// `grpc-timeout` header value for the remaining budget.
    pub fn to_header_value(&self) -> String {
        encode_timeout(self.remaining())
    }
}

fn saturating_from_now(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Encode a duration as `<value><unit>`, using the finest unit whose value
/// fits in 8 digits. Values are rounded up.
pub fn encode_timeout(timeout: Duration) -> String {
    let nanos = timeout.as_nanos();
    for (scale, unit) in TIMEOUT_UNITS {
        let value = nanos.div_ceil(scale);
        if value <= MAX_TIMEOUT_VALUE {
            return format!("{value}{unit}");
        }
    }
    format!("{MAX_TIMEOUT_VALUE}H")
}

/// Parse a `grpc-timeout` header value.
pub fn decode_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;
    let duration = match unit {
        "n" => Duration::from_nanos(amount),
        "u" => Duration::from_micros(amount),
        "m" => Duration::from_millis(amount),
        "S" => Duration::from_secs(amount),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        _ => return None,
    };
    Some(duration)
}

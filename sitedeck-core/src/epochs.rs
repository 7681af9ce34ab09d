//! Epoch arithmetic, duration/expiry rendering and lenient timestamp parsing.
//!
//! Epoch length depends on the network: 14 days on mainnet, 1 day on testnet.
//!
//! Ledger rows written by older tools carry timestamps in several textual
//! shapes. [`parse_timestamp`] is the one place that knows about them; callers
//! that aggregate should use [`parse_timestamp_or_zero`] and skip
//! [`is_zero_timestamp`] values instead of failing.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::types::Network;

pub const MAINNET_EPOCH_DAYS: i64 = 14;
pub const TESTNET_EPOCH_DAYS: i64 = 1;

/// Offset-carrying layouts, tried in order after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Offset-less layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

// ---------------------------------------------------------------------------
// Epochs
// ---------------------------------------------------------------------------

pub fn epoch_days(network: Network) -> i64 {
    match network {
        Network::Mainnet => MAINNET_EPOCH_DAYS,
        Network::Testnet => TESTNET_EPOCH_DAYS,
    }
}

pub fn epoch_duration(network: Network) -> Duration {
    Duration::days(epoch_days(network))
}

pub fn total_duration(network: Network, epochs: u64) -> Duration {
    let epochs = i64::try_from(epochs).unwrap_or(i64::MAX / epoch_days(network));
    Duration::days(epochs.saturating_mul(epoch_days(network)))
}

/// Storage time bought by `epochs`, e.g. `"3 days"`, `"2 weeks"`, `"4 weeks, 2 days"`.
pub fn format_epoch_duration(network: Network, epochs: u64) -> String {
    format_days(total_duration(network, epochs).num_days())
}

fn format_days(days: i64) -> String {
    if days < 7 {
        return if days == 1 {
            "1 day".to_string()
        } else {
            format!("{days} days")
        };
    }
    format_weeks(days)
}

fn format_weeks(days: i64) -> String {
    let weeks = days / 7;
    let rest = days % 7;
    if rest == 0 {
        format!("{weeks} weeks")
    } else {
        format!("{weeks} weeks, {rest} days")
    }
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Time left until `expiry`, measured from now.
pub fn format_expiry_duration(expiry: DateTime<Utc>) -> String {
    format_expiry_duration_at(expiry, Utc::now())
}

/// Time left until `expiry`, measured from `now`. Whole units, rounded down.
pub fn format_expiry_duration_at(expiry: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = expiry.signed_duration_since(now);
    if left <= Duration::zero() {
        return "Expired".to_string();
    }
    if left < Duration::hours(1) {
        return "Expiring soon".to_string();
    }

    let hours = left.num_hours();
    if hours < 24 {
        return format!("{hours} hours");
    }

    let days = left.num_days();
    if days == 1 {
        let rest = hours - 24;
        return if rest > 0 {
            format!("1 day, {rest} hours")
        } else {
            "1 day".to_string()
        };
    }
    if days < 7 {
        return format!("{days} days");
    }
    format_weeks(days)
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Placeholder for "unknown time": the Unix epoch.
pub fn zero_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

pub fn is_zero_timestamp(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0
}

/// Parse a stored timestamp in any of the known layouts.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let cleaned = normalize_timestamp(raw);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(&cleaned, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(ts.and_utc());
        }
    }
    None
}

/// [`parse_timestamp`], degrading to [`zero_timestamp`] on failure.
pub fn parse_timestamp_or_zero(raw: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        tracing::debug!(raw, "unparsable timestamp, treating as unknown");
        zero_timestamp()
    })
}

/// Strip a monotonic-clock annotation (`m=+0.0123`), drop a trailing zone
/// abbreviation (`UTC`, `CET`) and collapse a repeated numeric offset.
fn normalize_timestamp(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(idx) = s.find(" m=") {
        s = s[..idx].trim_end();
    }

    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.len() >= 3 {
        if let Some(last) = tokens.last() {
            if last.chars().all(|c| c.is_ascii_alphabetic()) {
                tokens.pop();
            }
        }
    }
    while tokens.len() >= 4 && is_numeric_offset(tokens[tokens.len() - 1])
        && is_numeric_offset(tokens[tokens.len() - 2])
    {
        tokens.pop();
    }
    tokens.join(" ")
}

fn is_numeric_offset(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some('+') | Some('-'))
        && token.len() >= 5
        && chars.all(|c| c.is_ascii_digit() || c == ':')
}

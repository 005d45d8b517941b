//! Poll interval controller
//!
//! Free IP-lookup services tolerate roughly one request per client every
//! five minutes. Because the engine rotates through the resolver roster,
//! each resolver is hit once every `roster_len × interval`; this module
//! keeps that product at or above [`COURTESY_WINDOW_SECS`] and never lets
//! the interval itself drop below [`MIN_INTERVAL_SECS`].

use std::time::Duration;
use tracing::{info, warn};

/// Minimum time between two requests to the same resolver
pub const COURTESY_WINDOW_SECS: u64 = 300;

/// Absolute floor for the poll interval
pub const MIN_INTERVAL_SECS: u64 = 30;

/// Configured poll interval policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalPolicy {
    /// Derive the interval from the roster length
    Auto,
    /// Poll every N seconds (still subject to the courtesy floor)
    Explicit(u64),
}

impl IntervalPolicy {
    /// Parse a configured policy value
    ///
    /// `"auto"`, an empty string, zero and anything that is not a positive
    /// integer all yield [`IntervalPolicy::Auto`]; malformed values are
    /// logged rather than rejected.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
            return IntervalPolicy::Auto;
        }

        match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => IntervalPolicy::Explicit(secs),
            _ => {
                warn!("Invalid check interval '{}', falling back to automatic", raw);
                IntervalPolicy::Auto
            }
        }
    }
}

/// Compute the poll interval for a roster of `roster_len` resolvers
///
/// Never fails: every input produces an interval of at least
/// [`MIN_INTERVAL_SECS`].
pub fn poll_interval(policy: &IntervalPolicy, roster_len: usize) -> Duration {
    let roster_len = roster_len.max(1) as u64;
    let courtesy = automatic_secs(roster_len);

    let secs = match *policy {
        IntervalPolicy::Auto => courtesy,
        IntervalPolicy::Explicit(secs) if secs.saturating_mul(roster_len) < COURTESY_WINDOW_SECS => {
            warn!(
                "Check interval of {}s across {} resolver(s) is below the {}s courtesy window, using {}s",
                secs, roster_len, COURTESY_WINDOW_SECS, courtesy
            );
            courtesy
        }
        IntervalPolicy::Explicit(secs) => secs,
    };

    let secs = secs.max(MIN_INTERVAL_SECS);
    info!("Check interval set to {}s for {} resolver(s)", secs, roster_len);
    Duration::from_secs(secs)
}

/// round(300 / n)
fn automatic_secs(roster_len: u64) -> u64 {
    (COURTESY_WINDOW_SECS as f64 / roster_len as f64).round() as u64
}

//! Duration parsing utilities.

use anyhow::Context;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "10s", "250ms" or "10".
/// Supports:
/// - Plain numbers (interpreted as seconds): "10"
/// - Milliseconds suffix: "250ms"
/// - Seconds suffix: "10s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // "ms" must be checked before "m" and "s"
    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        let secs = hours
            .checked_mul(3600)
            .with_context(|| format!("Duration too large: {s}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        let secs = minutes
            .checked_mul(60)
            .with_context(|| format!("Duration too large: {s}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }

    // No suffix - treat as seconds
    s.parse::<u64>()
        .map(Duration::from_secs)
        .with_context(|| format!("Invalid duration value: {s}"))
}

//! ⏱️ Time values: durations the way the engine likes to spell them.
//!
//! The engine does not say "seven days". It says `"7d"`. It does not say
//! "twenty seconds". It says `"20s"`. We say `Duration`, because we have types,
//! and convert at the border like a very pedantic customs officer. 🛂
//!
//! Supported units: `nanos`, `micros`, `ms`, `s`, `m`, `h`, `d`.

use std::time::Duration;

const MILLIS_PER_SECOND: u128 = 1_000;
const MILLIS_PER_MINUTE: u128 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u128 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u128 = 24 * MILLIS_PER_HOUR;

/// 🖨️ Render a duration using the largest unit that divides it evenly.
///
/// `7 days` -> `"7d"`, `90 minutes` -> `"90m"`, `1500ms` -> `"1500ms"`.
pub fn format(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos % 1_000_000 != 0 {
        // -- 🔬 sub-millisecond precision. someone is being very specific today.
        return if nanos % 1_000 == 0 {
            format!("{}micros", nanos / 1_000)
        } else {
            format!("{}nanos", nanos)
        };
    }

    let millis = duration.as_millis();
    if millis == 0 {
        return "0ms".to_string();
    }
    for (unit_millis, suffix) in [
        (MILLIS_PER_DAY, "d"),
        (MILLIS_PER_HOUR, "h"),
        (MILLIS_PER_MINUTE, "m"),
        (MILLIS_PER_SECOND, "s"),
    ] {
        if millis % unit_millis == 0 {
            return format!("{}{}", millis / unit_millis, suffix);
        }
    }
    format!("{}ms", millis)
}

/// 🔍 Parse `"7d"`, `"1h"`, `"250ms"` and friends back into a `Duration`.
///
/// Whole numbers only. `"1.5h"` gets a polite no; write `"90m"` like an adult.
pub fn parse(raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("time value [{}] is missing a unit", raw))?;
    let (digits, unit) = trimmed.split_at(split_at);
    if digits.is_empty() {
        return Err(format!("time value [{}] is missing a number", raw));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|e| format!("time value [{}] has an unreadable number: {}", raw, e))?;

    let duration = match unit {
        "nanos" => Duration::from_nanos(amount),
        "micros" => Duration::from_micros(amount),
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        "h" => Duration::from_secs(amount.saturating_mul(60 * 60)),
        "d" => Duration::from_secs(amount.saturating_mul(60 * 60 * 24)),
        other => {
            return Err(format!(
                "time value [{}] has unknown unit [{}], expected one of nanos, micros, ms, s, m, h, d",
                raw, other
            ));
        }
    };
    Ok(duration)
}

/// 📦 serde adapter for `Option<Duration>` fields that travel as time-value strings.
///
/// Use with `#[serde(default, with = "crate::time_value::option")]`.
pub mod option {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(&super::format(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

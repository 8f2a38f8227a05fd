//! Formatting helpers shared across UIs.

use chrono::{DateTime, Local, TimeZone, Utc};

/// Format a dollar amount with precision scaled to its magnitude.
pub fn format_cost(cost: f64) -> String {
    if cost >= 100.0 {
        format!("${:.0}", cost)
    } else if cost >= 1.0 {
        format!("${:.2}", cost)
    } else if cost >= 0.01 {
        format!("${:.3}", cost)
    } else if cost == 0.0 {
        "$0.00".to_string()
    } else {
        format!("${:.4}", cost)
    }
}

/// Format a token count (e.g., "12.5K", "3.2M").
pub fn format_tokens(count: u64) -> String {
    let n = count as f64;
    if count >= 1_000_000_000 {
        format!("{:.1}B", n / 1e9)
    } else if count >= 1_000_000 {
        format!("{:.1}M", n / 1e6)
    } else if count >= 10_000 {
        format!("{:.1}K", n / 1e3)
    } else if count >= 1_000 {
        format!("{:.2}K", n / 1e3)
    } else {
        count.to_string()
    }
}

/// Format an integer with thousands separators.
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format a millisecond duration (e.g., "850ms", "4.2s", "3m 12s", "2h 5m").
pub fn format_duration_ms(ms: i64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else if ms < 3_600_000 {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    } else {
        format!("{}h {}m", ms / 3_600_000, (ms % 3_600_000) / 60_000)
    }
}

/// Format a ratio in `[0, 1]` as a percentage.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format an epoch-millis timestamp as a local `YYYY-MM-DD` date.
pub fn format_date(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

/// Format an epoch-millis timestamp relative to `now` (e.g., "2m ago").
pub fn format_relative_time(timestamp_ms: i64, now: DateTime<Utc>) -> String {
    let diff = now.timestamp_millis() - timestamp_ms;

    if diff < 60_000 {
        "just now".to_string()
    } else if diff < 3_600_000 {
        format!("{}m ago", diff / 60_000)
    } else if diff < 86_400_000 {
        format!("{}h ago", diff / 3_600_000)
    } else if diff < 604_800_000 {
        format!("{}d ago", diff / 86_400_000)
    } else {
        format_date(timestamp_ms)
    }
}

/// Format seconds until a rate-limit reset (e.g., "2d 3h", "4h 10m", "12m").
pub fn format_reset_countdown(reset_after_seconds: i64) -> String {
    if reset_after_seconds <= 0 {
        return "now".to_string();
    }
    let days = reset_after_seconds / 86_400;
    let hours = (reset_after_seconds % 86_400) / 3_600;
    let minutes = (reset_after_seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Label for a rate-limit window length (e.g., "5h", "7d" shown as "Weekly").
pub fn format_window_label(window_seconds: i64) -> String {
    let hours = window_seconds as f64 / 3_600.0;
    if hours >= 168.0 {
        "Weekly".to_string()
    } else if hours >= 24.0 {
        format!("{}d", (hours / 24.0).round() as i64)
    } else {
        format!("{}h", hours.round() as i64)
    }
}

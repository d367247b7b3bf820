// Display formatting for card values, axis labels and chart points.

use serde::Serialize;

use crate::catalog::{MetricPolicy, Unit};
use crate::models::MetricSeries;

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// `HH:MM` (24h) for an RFC 3339 or naive ISO timestamp; anything else is returned as-is.
pub fn timestamp_label(timestamp: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(timestamp) {
        return dt.format("%H:%M").to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(timestamp, fmt) {
            return dt.format("%H:%M").to_string();
        }
    }
    timestamp.to_string()
}

/// 1024-based, one decimal, trailing ".0" dropped: `1536` -> `"1.5 KB"`, `1024` -> `"1 KB"`.
pub fn format_bytes(bytes: f64) -> String {
    if !bytes.is_finite() || bytes <= 0.0 {
        return "0 B".into();
    }
    let exp = ((bytes.ln() / 1024f64.ln()).floor() as i32).clamp(0, BYTE_UNITS.len() as i32 - 1);
    let scaled = bytes / 1024f64.powi(exp);
    format!("{} {}", trim_one_decimal(scaled), BYTE_UNITS[exp as usize])
}

fn trim_one_decimal(v: f64) -> String {
    let s = format!("{:.1}", v);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

/// `"12.3 ms"` below one second, `"1.23 s"` from there on.
pub fn format_ms(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{:.1} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, value)
}

pub fn format_value(unit: Unit, value: f64) -> String {
    match unit {
        Unit::Percent => format_percent(value, 2),
        Unit::Milliseconds => format_ms(value),
        Unit::Bytes => format_bytes(value),
        Unit::Count => format!("{:.0}", value),
        Unit::Currency => format!("${:.2}", value),
    }
}

/// Like `format_value`, with the policy's percent precision.
pub fn format_metric(policy: &MetricPolicy, value: f64) -> String {
    match policy.unit {
        Unit::Percent => format_percent(value, policy.percent_decimals),
        unit => format_value(unit, value),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

pub fn chart_points(series: &MetricSeries) -> Vec<ChartPoint> {
    series
        .samples()
        .iter()
        .map(|s| ChartPoint {
            label: timestamp_label(&s.timestamp),
            value: s.value,
        })
        .collect()
}

// Derived statistics, period-over-period delta and status levels

use serde::{Deserialize, Serialize};

/// Summary aggregates over one series. Optional fields are present only when the metric's
/// policy asks for them; on an empty series every present field is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<f64>,
    /// Fraction in 0..=1 of samples meeting the uptime rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_ratio: Option<f64>,
}

impl DerivedStats {
    pub fn uptime_percent(&self) -> Option<f64> {
        self.uptime_ratio.map(|r| r * 100.0)
    }
}

/// Which direction of change is good news for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Favorable,
    Unfavorable,
    Neutral,
}

/// Current (last) vs previous (second-to-last) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    /// `change / previous * 100`, or 0 when `previous` is 0.
    pub change_percent: f64,
    pub trend: Trend,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Good,
    Warning,
    Critical,
}

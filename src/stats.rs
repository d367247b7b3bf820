// Statistics deriver: summary aggregates, nearest-rank percentiles, uptime, delta and status.
// Everything is recomputed from the full series on each call and never suspends.

use crate::catalog::{MetricPolicy, StatusRule, UptimeRule};
use crate::models::{
    BillingLine, Delta, DerivedStats, MetricSeries, Polarity, Sentiment, StatusLevel, Trend,
};

/// Stats for a series under `policy`.
pub fn derive(series: &MetricSeries, policy: &MetricPolicy) -> DerivedStats {
    derive_values(&series.values(), policy)
}

/// Stats over billing line costs (total spend, cheapest/most expensive service).
pub fn derive_billing(lines: &[BillingLine], policy: &MetricPolicy) -> DerivedStats {
    let costs: Vec<f64> = lines.iter().map(|l| l.cost).collect();
    derive_values(&costs, policy)
}

/// Core aggregation. Every field is 0 when `values` is empty.
pub fn derive_values(values: &[f64], policy: &MetricPolicy) -> DerivedStats {
    let (min, max, avg) = min_max_avg(values);
    let aggregates = policy.aggregates;

    let (p95, p99) = if aggregates.percentiles {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        (
            Some(percentile_nearest_rank(&sorted, 0.95)),
            Some(percentile_nearest_rank(&sorted, 0.99)),
        )
    } else {
        (None, None)
    };

    DerivedStats {
        min,
        max,
        avg,
        total: aggregates.total.then(|| values.iter().sum::<f64>()),
        p95,
        p99,
        uptime_ratio: aggregates
            .uptime
            .then(|| uptime_ratio(values, policy.uptime_rule)),
    }
}

fn min_max_avg(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    (min, max, avg)
}

/// Nearest-rank estimate: `sorted[floor(n * q)]`, no interpolation between ranks.
///
/// At small `n` this over- or under-shoots interpolated definitions; for 20 samples both
/// p95 and p99 land on index 19. `sorted` must be ascending. Returns 0 for an empty slice.
pub fn percentile_nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (sorted.len() as f64 * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Share of samples satisfying `rule`; 0 for no samples.
pub fn uptime_ratio(values: &[f64], rule: UptimeRule) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let met = values.iter().filter(|v| rule.is_met(**v)).count();
    met as f64 / values.len() as f64
}

/// Current vs previous sample. Missing samples count as 0; a zero previous value yields a
/// 0% change rather than an infinite one.
pub fn delta(series: &MetricSeries, polarity: Polarity) -> Delta {
    delta_between(
        series.current().unwrap_or(0.0),
        series.previous().unwrap_or(0.0),
        polarity,
    )
}

pub fn delta_between(current: f64, previous: f64, polarity: Polarity) -> Delta {
    let change = current - previous;
    let change_percent = if previous != 0.0 {
        change / previous * 100.0
    } else {
        0.0
    };
    let trend = if change > 0.0 {
        Trend::Up
    } else if change < 0.0 {
        Trend::Down
    } else {
        Trend::Flat
    };
    let sentiment = match (trend, polarity) {
        (Trend::Flat, _) | (_, Polarity::Neutral) => Sentiment::Neutral,
        (Trend::Up, Polarity::HigherIsBetter) | (Trend::Down, Polarity::LowerIsBetter) => {
            Sentiment::Favorable
        }
        _ => Sentiment::Unfavorable,
    };
    Delta {
        current,
        previous,
        change,
        change_percent,
        trend,
        sentiment,
    }
}

pub fn classify(value: f64, rule: StatusRule) -> StatusLevel {
    match rule {
        StatusRule::AtLeast {
            target,
            warning_margin,
        } => {
            if value >= target {
                StatusLevel::Good
            } else if value >= target - warning_margin {
                StatusLevel::Warning
            } else {
                StatusLevel::Critical
            }
        }
        StatusRule::AtMost {
            limit,
            warning_factor,
        } => {
            if value <= limit {
                StatusLevel::Good
            } else if value <= limit * warning_factor {
                StatusLevel::Warning
            } else {
                StatusLevel::Critical
            }
        }
    }
}

// Raw backend payloads -> ordered sequences of valid samples.
// Every function here is a pure transform; a malformed shape degrades to empty output.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::{AwsInstance, BillingLine, MergedRow, MetricSample, MetricSeries, NamedSeries};

/// Azure monitor shape: `metrics[0].timeseries[0].data[] = {time_stamp, average?}`.
/// Entries without a finite `average` are dropped; order is preserved.
pub fn normalize_timeseries(raw: &Value) -> MetricSeries {
    let Some(points) = raw
        .get("metrics")
        .and_then(|m| m.get(0))
        .and_then(|m| m.get("timeseries"))
        .and_then(|t| t.get(0))
        .and_then(|t| t.get("data"))
        .and_then(Value::as_array)
    else {
        return MetricSeries::default();
    };
    let samples = points
        .iter()
        .filter_map(|p| sample_from(p, "time_stamp", "average"))
        .collect();
    MetricSeries::from_samples(samples)
}

/// CloudWatch datapoints, either a bare array or `{Datapoints: [...]}`, each `{Timestamp, Average}`.
/// CloudWatch returns datapoints unordered, so these are sorted by timestamp.
pub fn normalize_aws_datapoints(raw: &Value) -> MetricSeries {
    let points = match raw {
        Value::Array(a) => a.as_slice(),
        other => match other.get("Datapoints").and_then(Value::as_array) {
            Some(a) => a.as_slice(),
            None => return MetricSeries::default(),
        },
    };
    let mut samples: Vec<MetricSample> = points
        .iter()
        .filter_map(|p| sample_from(p, "Timestamp", "Average"))
        .collect();
    // ISO-8601 strings from one source share an offset, so lexical order is chronological.
    samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    MetricSeries::from_samples(samples)
}

fn sample_from(point: &Value, ts_key: &str, value_key: &str) -> Option<MetricSample> {
    let value = point.get(value_key)?.as_f64().filter(|v| v.is_finite())?;
    let timestamp = point
        .get(ts_key)
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(MetricSample::new(timestamp, value))
}

/// Cost Explorer output. Accepts a flat list of groups `{Keys, Metrics.UnblendedCost}`,
/// `ResultsByTime[]` buckets with nested `Groups`, or buckets carrying only a `Total`
/// (labelled by their period start). Unparsable amounts count as 0.
pub fn normalize_billing(raw: &Value) -> Vec<BillingLine> {
    let items = match raw {
        Value::Array(a) => a.as_slice(),
        other => match other.get("ResultsByTime").and_then(Value::as_array) {
            Some(a) => a.as_slice(),
            None => return Vec::new(),
        },
    };

    let mut lines = Vec::new();
    for item in items {
        if let Some(groups) = item.get("Groups").and_then(Value::as_array) {
            lines.extend(groups.iter().filter_map(|g| billing_line(g, "Metrics")));
        } else if item.get("Keys").is_some() {
            lines.extend(billing_line(item, "Metrics"));
        } else if item.get("Total").is_some() {
            lines.extend(billing_line(item, "Total"));
        }
    }
    lines
}

fn billing_line(item: &Value, metrics_key: &str) -> Option<BillingLine> {
    let cost = item.get(metrics_key)?.get("UnblendedCost")?;
    let amount = match cost.get("Amount") {
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        Some(v) => v.as_f64().unwrap_or(0.0),
        None => 0.0,
    };
    let service = item
        .get("Keys")
        .and_then(|k| k.get(0))
        .and_then(Value::as_str)
        .or_else(|| {
            item.get("TimePeriod")
                .and_then(|p| p.get("Start"))
                .and_then(Value::as_str)
        })
        .unwrap_or("Unknown");
    Some(BillingLine {
        service: service.to_string(),
        cost: if amount.is_finite() { amount } else { 0.0 },
        unit: cost
            .get("Unit")
            .and_then(Value::as_str)
            .unwrap_or("USD")
            .to_string(),
    })
}

/// Lines worth charting: zero-cost services are noise.
pub fn chargeable_lines(lines: &[BillingLine]) -> Vec<BillingLine> {
    lines.iter().filter(|l| l.cost != 0.0).cloned().collect()
}

/// EC2 instance list; entries that do not parse are skipped.
pub fn normalize_instances(raw: &Value) -> Vec<AwsInstance> {
    raw.as_array()
        .map(|a| {
            a.iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Joins composite members on timestamp. Rows follow first appearance (first member first);
/// a member with no sample at a timestamp contributes 0.
pub fn merge_by_timestamp(members: &[NamedSeries]) -> Vec<MergedRow> {
    let mut rows: Vec<MergedRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, member) in members.iter().enumerate() {
        for s in member.series.samples() {
            let row = *index.entry(s.timestamp.as_str()).or_insert_with(|| {
                rows.push(MergedRow {
                    timestamp: s.timestamp.clone(),
                    values: vec![0.0; members.len()],
                });
                rows.len() - 1
            });
            rows[row].values[i] = s.value;
        }
    }
    rows
}

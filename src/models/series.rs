// Metric samples, series and widget payloads

use serde::Serialize;

/// One valid (timestamp, value) point. The timestamp is kept as delivered upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub timestamp: String,
    pub value: f64,
}

impl MetricSample {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Ordered run of valid samples for one metric. Order is upstream order; never re-sorted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSeries {
    samples: Vec<MetricSample>,
}

impl MetricSeries {
    /// Builds a series, dropping samples whose value is not finite.
    pub fn from_samples(samples: Vec<MetricSample>) -> Self {
        Self {
            samples: samples
                .into_iter()
                .filter(|s| s.value.is_finite())
                .collect(),
        }
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Last sample value ("current").
    pub fn current(&self) -> Option<f64> {
        self.samples.last().map(|s| s.value)
    }

    /// Second-to-last sample value ("previous").
    pub fn previous(&self) -> Option<f64> {
        self.samples
            .len()
            .checked_sub(2)
            .map(|i| self.samples[i].value)
    }
}

/// One member of a composite widget (e.g. disk read vs write).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSeries {
    pub name: String,
    pub series: MetricSeries,
}

/// Composite members merged on timestamp; `values[i]` belongs to member `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRow {
    pub timestamp: String,
    pub values: Vec<f64>,
}

/// What a widget's fetch pipeline produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WidgetData {
    Series { series: MetricSeries },
    Composite { members: Vec<NamedSeries> },
    Billing { lines: Vec<super::BillingLine> },
}

// Request descriptions: endpoint + payload + response shape, built from a widget's source.

use serde::Serialize;
use serde_json::{Value, json};

use crate::catalog::{AWS_METRICS_PATH, STORAGE_METRICS_PATH, VM_METRICS_PATH};
use crate::config::ResourcesConfig;
use crate::models::MetricSeries;
use crate::normalizer;

/// How to pull a series out of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `metrics[0].timeseries[0].data[]`
    AzureTimeseries,
    /// CloudWatch `Datapoints`
    AwsDatapoints,
}

impl ResponseShape {
    pub fn normalize(&self, raw: &Value) -> MetricSeries {
        match self {
            ResponseShape::AzureTimeseries => normalizer::normalize_timeseries(raw),
            ResponseShape::AwsDatapoints => normalizer::normalize_aws_datapoints(raw),
        }
    }
}

/// One "fetch metric series" call.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub path: String,
    pub payload: Value,
    pub shape: ResponseShape,
}

/// Resources every request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
    pub resource_group: String,
    pub storage_account: String,
    pub vm_name: String,
    pub aws_instance_id: Option<String>,
    pub billing_start: Option<String>,
    pub billing_end: Option<String>,
}

impl From<&ResourcesConfig> for ResourceContext {
    fn from(c: &ResourcesConfig) -> Self {
        Self {
            resource_group: c.resource_group.clone(),
            storage_account: c.storage_account.clone(),
            vm_name: c.vm_name.clone(),
            aws_instance_id: c.aws_instance_id.clone(),
            billing_start: c.billing_start.clone(),
            billing_end: c.billing_end.clone(),
        }
    }
}

/// `{start, end}` body for AWS CPU and billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ResourceContext {
    pub fn storage_metric(&self, metric_name: &str) -> SeriesRequest {
        SeriesRequest {
            path: STORAGE_METRICS_PATH.into(),
            payload: json!({
                "resource_group": self.resource_group,
                "storage_account": self.storage_account,
                "metric_name": metric_name,
            }),
            shape: ResponseShape::AzureTimeseries,
        }
    }

    pub fn vm_metric(&self, metric_name: &str) -> SeriesRequest {
        SeriesRequest {
            path: VM_METRICS_PATH.into(),
            payload: json!({
                "resource_group": self.resource_group,
                "vm_name": self.vm_name,
                "metric_name": metric_name,
            }),
            shape: ResponseShape::AzureTimeseries,
        }
    }

    /// Backend picks the last hour when start/end are null.
    pub fn aws_cpu(&self, instance_id: &str) -> SeriesRequest {
        SeriesRequest {
            path: format!("{}/{}", AWS_METRICS_PATH, instance_id),
            payload: json!({ "start": null, "end": null }),
            shape: ResponseShape::AwsDatapoints,
        }
    }

    /// Configured billing window, defaulting to the 30 days up to `today`.
    pub fn billing_range(&self, today: chrono::NaiveDate) -> DateRange {
        let start = self.billing_start.clone().unwrap_or_else(|| {
            (today - chrono::Duration::days(30))
                .format("%Y-%m-%d")
                .to_string()
        });
        let end = self
            .billing_end
            .clone()
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }
}

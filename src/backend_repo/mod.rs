// Metrics backend over HTTP (reqwest). One parameterised series fetch serves every widget.

mod request;

pub use request::{DateRange, ResourceContext, ResponseShape, SeriesRequest};

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::catalog::{AWS_INSTANCES_PATH, BILLING_PATH, MetricSource};
use crate::models::{
    AwsCredentials, AwsInstance, AzureCredentials, BillingLine, ConnectorPayload,
    ConnectorStatus, FirewallRule, MetricSeries, NamedSeries, ScaleRequest, WidgetData,
};
use crate::normalizer;

const CONNECTOR_STATUS_PATH: &str = "/api/connectors/status";
const CONNECT_AWS_PATH: &str = "/api/connectors/aws";
const CONNECT_AZURE_PATH: &str = "/api/connectors/azure";
const AWS_SCALE_PATH: &str = "/api/aws/scale";
const AWS_FIREWALL_PATH: &str = "/api/aws/security/firewall";

/// Widget-level fetch failures. Shape problems in a decoded body are not errors.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("not signed in")]
    Unauthenticated,
}

pub struct BackendRepo {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendRepo {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Decode(e.to_string())
            }
        })
    }

    #[instrument(skip(self, body, token), fields(repo = "backend", operation = "post_json"))]
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> Result<Value, FetchError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_json(response).await
    }

    #[instrument(skip(self, token), fields(repo = "backend", operation = "get_json"))]
    pub async fn get_json(&self, path: &str, token: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_json(response).await
    }

    /// The single series capability: POST `payload` to `path`, normalize by `shape`.
    pub async fn fetch_series(
        &self,
        request: &SeriesRequest,
        token: &str,
    ) -> Result<MetricSeries, FetchError> {
        let raw = self.post_json(&request.path, &request.payload, token).await?;
        Ok(request.shape.normalize(&raw))
    }

    /// Fetches and shapes whatever `source` describes.
    pub async fn fetch_widget_data(
        &self,
        source: &MetricSource,
        ctx: &ResourceContext,
        token: &str,
    ) -> Result<WidgetData, FetchError> {
        match source {
            MetricSource::AzureStorage { metric_name } => {
                let series = self
                    .fetch_series(&ctx.storage_metric(metric_name), token)
                    .await?;
                Ok(WidgetData::Series { series })
            }
            MetricSource::AzureVm { metric_names } if metric_names.len() == 1 => {
                let series = self
                    .fetch_series(&ctx.vm_metric(&metric_names[0]), token)
                    .await?;
                Ok(WidgetData::Series { series })
            }
            MetricSource::AzureVm { metric_names } => {
                let requests: Vec<SeriesRequest> =
                    metric_names.iter().map(|m| ctx.vm_metric(m)).collect();
                let results = futures_util::future::join_all(
                    requests.iter().map(|r| self.fetch_series(r, token)),
                )
                .await;
                let mut members = Vec::with_capacity(results.len());
                for (name, result) in metric_names.iter().zip(results) {
                    members.push(NamedSeries {
                        name: name.clone(),
                        series: result?,
                    });
                }
                Ok(WidgetData::Composite { members })
            }
            MetricSource::AwsCpu => {
                let instance_id = match &ctx.aws_instance_id {
                    Some(id) => Some(id.clone()),
                    None => self
                        .list_aws_instances(token)
                        .await?
                        .into_iter()
                        .next()
                        .map(|i| i.instance_id),
                };
                let series = match instance_id {
                    Some(id) => self.fetch_series(&ctx.aws_cpu(&id), token).await?,
                    None => MetricSeries::default(),
                };
                Ok(WidgetData::Series { series })
            }
            MetricSource::AwsBilling => {
                let range = ctx.billing_range(chrono::Utc::now().date_naive());
                let lines = self.fetch_billing(&range, token).await?;
                Ok(WidgetData::Billing { lines })
            }
        }
    }

    pub async fn fetch_billing(
        &self,
        range: &DateRange,
        token: &str,
    ) -> Result<Vec<BillingLine>, FetchError> {
        let raw = self.post_json(BILLING_PATH, range, token).await?;
        Ok(normalizer::normalize_billing(&raw))
    }

    pub async fn list_aws_instances(&self, token: &str) -> Result<Vec<AwsInstance>, FetchError> {
        let raw = self.get_json(AWS_INSTANCES_PATH, token).await?;
        Ok(normalizer::normalize_instances(&raw))
    }

    pub async fn connector_status(&self, token: &str) -> Result<ConnectorStatus, FetchError> {
        let raw = self.get_json(CONNECTOR_STATUS_PATH, token).await?;
        serde_json::from_value(raw).map_err(|e| FetchError::Decode(e.to_string()))
    }

    pub async fn connect_aws(
        &self,
        credentials: &AwsCredentials,
        token: &str,
    ) -> Result<Value, FetchError> {
        self.post_json(CONNECT_AWS_PATH, credentials, token).await
    }

    pub async fn connect_azure(
        &self,
        credentials: &AzureCredentials,
        token: &str,
    ) -> Result<Value, FetchError> {
        self.post_json(CONNECT_AZURE_PATH, credentials, token).await
    }

    pub async fn connect(
        &self,
        payload: &ConnectorPayload,
        token: &str,
    ) -> Result<Value, FetchError> {
        match payload {
            ConnectorPayload::Aws(c) => self.connect_aws(c, token).await,
            ConnectorPayload::Azure(c) => self.connect_azure(c, token).await,
        }
    }

    /// Sets an Auto Scaling group's desired capacity; returns the backend's `{msg}` body.
    pub async fn scale_asg(
        &self,
        request: &ScaleRequest,
        token: &str,
    ) -> Result<Value, FetchError> {
        self.post_json(AWS_SCALE_PATH, request, token).await
    }

    pub async fn add_firewall_rule(
        &self,
        rule: &FirewallRule,
        token: &str,
    ) -> Result<Value, FetchError> {
        self.post_json(AWS_FIREWALL_PATH, rule, token).await
    }
}

// Domain models

mod billing;
mod connector;
mod control;
mod series;
mod stats;
mod widget;

pub use billing::{AwsInstance, BillingLine};
pub use connector::{
    AwsCredentials, AzureCredentials, ConnectorPayload, ConnectorStatus, DEFAULT_AWS_REGION,
};
pub use control::{ControlError, FirewallRule, IpProtocol, ScaleRequest};
pub use series::{MergedRow, MetricSample, MetricSeries, NamedSeries, WidgetData};
pub use stats::{Delta, DerivedStats, Polarity, Sentiment, StatusLevel, Trend};
pub use widget::{Provider, WidgetState};

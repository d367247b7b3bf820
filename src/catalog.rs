// Per-metric policy data and the default widget/group catalog.
// Thresholds, polarity and which aggregates to compute are data, never inferred from the widget.

use serde::{Deserialize, Serialize};

use crate::models::{Polarity, Provider};
use crate::registry::{WidgetDescriptor, WidgetGroup};

pub const STORAGE_METRICS_PATH: &str = "/api/azure/storage-metrics";
pub const VM_METRICS_PATH: &str = "/api/azure/vm-metrics";
pub const AWS_METRICS_PATH: &str = "/api/aws/metrics";
pub const AWS_INSTANCES_PATH: &str = "/api/aws/instances";
pub const BILLING_PATH: &str = "/api/billing";

/// How a value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Percent,
    Milliseconds,
    Bytes,
    Count,
    Currency,
}

/// Which optional aggregates a metric carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub total: bool,
    pub percentiles: bool,
    pub uptime: bool,
}

/// Sample predicate for the uptime ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UptimeRule {
    /// value >= threshold (e.g. availability SLA)
    AtLeast(f64),
    /// value > threshold (e.g. non-zero transaction presence)
    Above(f64),
}

impl UptimeRule {
    pub fn is_met(&self, value: f64) -> bool {
        match *self {
            UptimeRule::AtLeast(t) => value >= t,
            UptimeRule::Above(t) => value > t,
        }
    }
}

/// Good/warning/critical banding for the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusRule {
    /// Good at or above `target`, warning within `warning_margin` below it.
    AtLeast { target: f64, warning_margin: f64 },
    /// Good at or below `limit`, warning up to `limit * warning_factor`.
    AtMost { limit: f64, warning_factor: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricPolicy {
    pub unit: Unit,
    pub aggregates: Aggregates,
    pub uptime_rule: UptimeRule,
    pub polarity: Polarity,
    pub status: Option<StatusRule>,
    /// Decimals shown for percent values.
    pub percent_decimals: usize,
}

impl MetricPolicy {
    pub fn new(unit: Unit, polarity: Polarity) -> Self {
        Self {
            unit,
            aggregates: Aggregates::default(),
            uptime_rule: UptimeRule::Above(0.0),
            polarity,
            status: None,
            percent_decimals: 2,
        }
    }

    pub fn with_total(mut self) -> Self {
        self.aggregates.total = true;
        self
    }

    pub fn with_percentiles(mut self) -> Self {
        self.aggregates.percentiles = true;
        self
    }

    pub fn with_uptime(mut self, rule: UptimeRule) -> Self {
        self.aggregates.uptime = true;
        self.uptime_rule = rule;
        self
    }

    pub fn with_percent_decimals(mut self, decimals: usize) -> Self {
        self.percent_decimals = decimals;
        self
    }

    pub fn with_status(mut self, rule: StatusRule) -> Self {
        self.status = Some(rule);
        self
    }

    /// Applies a config override. A new uptime threshold keeps the rule's kind.
    pub fn apply(&mut self, o: &MetricPolicyOverride) {
        if let Some(t) = o.uptime_threshold {
            self.aggregates.uptime = true;
            self.uptime_rule = match self.uptime_rule {
                UptimeRule::AtLeast(_) => UptimeRule::AtLeast(t),
                UptimeRule::Above(_) => UptimeRule::Above(t),
            };
        }
        if let Some(p) = o.polarity {
            self.polarity = p;
        }
        if let Some(target) = o.status_target {
            self.status = Some(match self.status {
                Some(StatusRule::AtMost { warning_factor, .. }) => StatusRule::AtMost {
                    limit: target,
                    warning_factor,
                },
                Some(StatusRule::AtLeast { warning_margin, .. }) => StatusRule::AtLeast {
                    target,
                    warning_margin,
                },
                None => match self.polarity {
                    Polarity::LowerIsBetter => StatusRule::AtMost {
                        limit: target,
                        warning_factor: 1.5,
                    },
                    _ => StatusRule::AtLeast {
                        target,
                        warning_margin: 0.5,
                    },
                },
            });
        }
    }
}

/// `[[metric_policy]]` entry in config.toml.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricPolicyOverride {
    pub widget: String,
    pub uptime_threshold: Option<f64>,
    pub polarity: Option<Polarity>,
    pub status_target: Option<f64>,
}

/// Where a widget's data comes from and how the response is shaped.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSource {
    AzureStorage { metric_name: String },
    /// One metric name gives a plain series; several give a composite.
    AzureVm { metric_names: Vec<String> },
    AwsCpu,
    AwsBilling,
}

impl MetricSource {
    fn storage(metric_name: &str) -> Self {
        MetricSource::AzureStorage {
            metric_name: metric_name.into(),
        }
    }

    fn vm(metric_names: &[&str]) -> Self {
        MetricSource::AzureVm {
            metric_names: metric_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn widget(
    id: &str,
    label: &str,
    provider: Provider,
    source: MetricSource,
    policy: MetricPolicy,
) -> WidgetDescriptor {
    WidgetDescriptor {
        id: id.into(),
        label: label.into(),
        provider,
        source,
        policy,
    }
}

/// Widgets in their initial display order.
pub fn default_widgets() -> Vec<WidgetDescriptor> {
    use Polarity::*;
    use Provider::*;
    vec![
        widget(
            "awsCpu",
            "AWS CPU Usage",
            Aws,
            MetricSource::AwsCpu,
            MetricPolicy::new(Unit::Percent, LowerIsBetter),
        ),
        widget(
            "awsBilling",
            "AWS Billing",
            Aws,
            MetricSource::AwsBilling,
            MetricPolicy::new(Unit::Currency, LowerIsBetter).with_total(),
        ),
        widget(
            "availability",
            "Availability",
            Azure,
            MetricSource::storage("Availability"),
            MetricPolicy::new(Unit::Percent, HigherIsBetter)
                .with_percent_decimals(3)
                .with_uptime(UptimeRule::AtLeast(99.9))
                .with_status(StatusRule::AtLeast {
                    target: 99.9,
                    warning_margin: 0.5,
                }),
        ),
        widget(
            "ingress",
            "Ingress",
            Azure,
            MetricSource::storage("Ingress"),
            MetricPolicy::new(Unit::Bytes, Neutral).with_total(),
        ),
        widget(
            "egress",
            "Egress",
            Azure,
            MetricSource::storage("Egress"),
            MetricPolicy::new(Unit::Bytes, Neutral).with_total(),
        ),
        widget(
            "e2eLatency",
            "End-to-End Latency",
            Azure,
            MetricSource::storage("SuccessE2ELatency"),
            MetricPolicy::new(Unit::Milliseconds, LowerIsBetter)
                .with_percentiles()
                .with_status(StatusRule::AtMost {
                    limit: 200.0,
                    warning_factor: 1.5,
                }),
        ),
        widget(
            "serverLatency",
            "Server Latency",
            Azure,
            MetricSource::storage("SuccessServerLatency"),
            MetricPolicy::new(Unit::Milliseconds, LowerIsBetter)
                .with_percentiles()
                .with_status(StatusRule::AtMost {
                    limit: 100.0,
                    warning_factor: 1.5,
                }),
        ),
        widget(
            "transactions",
            "Transactions",
            Azure,
            MetricSource::storage("Transactions"),
            MetricPolicy::new(Unit::Count, HigherIsBetter)
                .with_total()
                .with_uptime(UptimeRule::Above(0.0)),
        ),
        widget(
            "usedCapacity",
            "Used Capacity",
            Azure,
            MetricSource::storage("UsedCapacity"),
            MetricPolicy::new(Unit::Bytes, Neutral),
        ),
        widget(
            "cpu",
            "CPU Usage",
            Azure,
            MetricSource::vm(&["Percentage CPU"]),
            MetricPolicy::new(Unit::Percent, LowerIsBetter),
        ),
        widget(
            "memory",
            "Memory Usage",
            Azure,
            MetricSource::vm(&["Available Memory Percentage"]),
            MetricPolicy::new(Unit::Percent, HigherIsBetter),
        ),
        widget(
            "diskThroughput",
            "Disk Throughput",
            Azure,
            MetricSource::vm(&["OS Disk Read Bytes/sec", "OS Disk Write Bytes/sec"]),
            MetricPolicy::new(Unit::Bytes, Neutral),
        ),
        widget(
            "diskLatency",
            "Disk Latency",
            Azure,
            MetricSource::vm(&["OS Disk Latency", "Data Disk Latency"]),
            MetricPolicy::new(Unit::Milliseconds, LowerIsBetter).with_percentiles(),
        ),
        widget(
            "iops",
            "IOPS Usage",
            Azure,
            MetricSource::vm(&[
                "VM Cached IOPS Consumed Percentage",
                "VM Uncached IOPS Consumed Percentage",
            ]),
            MetricPolicy::new(Unit::Percent, LowerIsBetter),
        ),
        widget(
            "network",
            "Network Traffic",
            Azure,
            MetricSource::vm(&["Network In Total", "Network Out Total"]),
            MetricPolicy::new(Unit::Bytes, Neutral).with_total(),
        ),
        widget(
            "burstCredits",
            "Burst Credits",
            Azure,
            MetricSource::vm(&["CPU Credits Remaining", "CPU Credits Consumed"]),
            MetricPolicy::new(Unit::Count, HigherIsBetter),
        ),
    ]
}

pub fn default_groups() -> Vec<WidgetGroup> {
    let group = |id: &str, label: &str, members: &[&str]| WidgetGroup {
        id: id.into(),
        label: label.into(),
        provider: Provider::Azure,
        member_ids: members.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        group("latency", "Latency Metrics", &["e2eLatency", "serverLatency"]),
        group(
            "storage",
            "Storage Metrics",
            &["diskThroughput", "diskLatency", "iops"],
        ),
        group("compute", "Compute Metrics", &["cpu", "memory", "burstCredits"]),
    ]
}

/// Applies `[[metric_policy]]` overrides; returns ids that matched no widget.
pub fn apply_overrides(
    widgets: &mut [WidgetDescriptor],
    overrides: &[MetricPolicyOverride],
) -> Vec<String> {
    let mut unknown = Vec::new();
    for o in overrides {
        match widgets.iter_mut().find(|w| w.id == o.widget) {
            Some(w) => w.policy.apply(o),
            None => unknown.push(o.widget.clone()),
        }
    }
    unknown
}

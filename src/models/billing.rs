// AWS billing lines and EC2 instances

use serde::{Deserialize, Serialize};

/// Cost of one service (or one billing period) as shown in the billing table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingLine {
    pub service: String,
    pub cost: f64,
    pub unit: String,
}

/// EC2 instance as listed by the backend (PascalCase keys upstream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsInstance {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

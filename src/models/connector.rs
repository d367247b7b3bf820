// Connector status and credential payloads

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Provider;

pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Which cloud connectors the user has completed setup for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    #[serde(default)]
    pub aws: bool,
    #[serde(default)]
    pub azure: bool,
}

impl ConnectorStatus {
    pub fn is_connected(&self, provider: Provider) -> bool {
        match provider {
            Provider::Aws => self.aws,
            Provider::Azure => self.azure,
        }
    }

    pub fn set(&mut self, provider: Provider, connected: bool) {
        match provider {
            Provider::Aws => self.aws = connected,
            Provider::Azure => self.azure = connected,
        }
    }
}

/// Body of POST /api/connectors/aws.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    pub access_key: String,
    pub secret_key: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_AWS_REGION.into()
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Body of POST /api/connectors/azure (app registration).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// A finished setup wizard, ready to post to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorPayload {
    Aws(AwsCredentials),
    Azure(AzureCredentials),
}

impl ConnectorPayload {
    pub fn provider(&self) -> Provider {
        match self {
            ConnectorPayload::Aws(_) => Provider::Aws,
            ConnectorPayload::Azure(_) => Provider::Azure,
        }
    }
}

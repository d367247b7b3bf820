// Connector setup wizard: five steps per provider, collecting the credentials that
// POST /api/connectors/{aws,azure} expects.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::backend_repo::{BackendRepo, FetchError};
use crate::models::{
    AwsCredentials, AzureCredentials, ConnectorPayload, DEFAULT_AWS_REGION, Provider,
};
use crate::session::Session;

pub const WIZARD_STEPS: u8 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown field for {provider}: {field}")]
    UnknownField { provider: Provider, field: String },
    #[error("cannot finish on step {0} of 5")]
    NotOnFinalStep(u8),
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

struct FieldSpec {
    name: &'static str,
    step: u8,
    required: bool,
    secret: bool,
}

const fn field(name: &'static str, step: u8, required: bool, secret: bool) -> FieldSpec {
    FieldSpec {
        name,
        step,
        required,
        secret,
    }
}

// Root email, account id and IAM user are informational; the backend only takes the key pair.
const AWS_FIELDS: &[FieldSpec] = &[
    field("root_email", 1, false, false),
    field("account_id", 2, false, false),
    field("iam_user", 3, false, false),
    field("access_key", 4, true, false),
    field("region", 4, false, false),
    field("secret_key", 5, true, true),
];

const AZURE_FIELDS: &[FieldSpec] = &[
    field("subscription_id", 2, true, false),
    field("tenant_id", 3, true, false),
    field("client_id", 3, true, false),
    field("client_secret", 4, true, true),
];

fn fields_for(provider: Provider) -> &'static [FieldSpec] {
    match provider {
        Provider::Aws => AWS_FIELDS,
        Provider::Azure => AZURE_FIELDS,
    }
}

#[derive(Clone)]
pub struct SetupWizard {
    provider: Provider,
    step: u8,
    values: BTreeMap<&'static str, String>,
}

impl SetupWizard {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            step: 1,
            values: BTreeMap::new(),
        }
    }

    /// A wizard filled in one go (e.g. from a form post), positioned on the last step.
    pub fn from_form<'a>(
        provider: Provider,
        form: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, WizardError> {
        let mut wizard = Self::new(provider);
        for (name, value) in form {
            wizard.set_field(name, value)?;
        }
        wizard.step = WIZARD_STEPS;
        Ok(wizard)
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn next(&mut self) -> u8 {
        self.step = (self.step + 1).min(WIZARD_STEPS);
        self.step
    }

    pub fn prev(&mut self) -> u8 {
        self.step = self.step.saturating_sub(1).max(1);
        self.step
    }

    /// Fraction of steps reached, in (0, 1].
    pub fn progress(&self) -> f64 {
        f64::from(self.step) / f64::from(WIZARD_STEPS)
    }

    pub fn is_final_step(&self) -> bool {
        self.step == WIZARD_STEPS
    }

    /// Names of the fields shown on the current step.
    pub fn step_fields(&self) -> Vec<&'static str> {
        fields_for(self.provider)
            .iter()
            .filter(|f| f.step == self.step)
            .map(|f| f.name)
            .collect()
    }

    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), WizardError> {
        let spec = fields_for(self.provider)
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| WizardError::UnknownField {
                provider: self.provider,
                field: name.to_string(),
            })?;
        self.values.insert(spec.name, value.trim().to_string());
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn required(&self, name: &'static str) -> Result<String, WizardError> {
        match self.values.get(name) {
            Some(v) if !v.is_empty() => Ok(v.clone()),
            _ => Err(WizardError::MissingField(name)),
        }
    }

    /// Builds the connector payload. Only allowed on the last step with every required field set.
    pub fn finish(&self) -> Result<ConnectorPayload, WizardError> {
        if !self.is_final_step() {
            return Err(WizardError::NotOnFinalStep(self.step));
        }
        for spec in fields_for(self.provider).iter().filter(|f| f.required) {
            self.required(spec.name)?;
        }
        Ok(match self.provider {
            Provider::Aws => ConnectorPayload::Aws(AwsCredentials {
                access_key: self.required("access_key")?,
                secret_key: self.required("secret_key")?,
                region: self
                    .field("region")
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_AWS_REGION)
                    .to_string(),
            }),
            Provider::Azure => ConnectorPayload::Azure(AzureCredentials {
                tenant_id: self.required("tenant_id")?,
                client_id: self.required("client_id")?,
                client_secret: self.required("client_secret")?,
                subscription_id: self.required("subscription_id")?,
            }),
        })
    }
}

impl fmt::Debug for SetupWizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secrets: Vec<&str> = fields_for(self.provider)
            .iter()
            .filter(|s| s.secret)
            .map(|s| s.name)
            .collect();
        let values: BTreeMap<&str, &str> = self
            .values
            .iter()
            .map(|(k, v)| {
                let shown = if secrets.contains(k) {
                    "<redacted>"
                } else {
                    v.as_str()
                };
                (*k, shown)
            })
            .collect();
        f.debug_struct("SetupWizard")
            .field("provider", &self.provider)
            .field("step", &self.step)
            .field("values", &values)
            .finish()
    }
}

/// Finishes the wizard, posts the credentials and marks the connector active.
pub async fn submit(
    repo: &BackendRepo,
    session: &Session,
    wizard: &SetupWizard,
) -> Result<(), SetupError> {
    let payload = wizard.finish()?;
    let token = session.token().await.ok_or(FetchError::Unauthenticated)?;
    repo.connect(&payload, &token).await?;
    session.set_connector(payload.provider(), true).await;
    tracing::info!(provider = %payload.provider(), "connector configured");
    Ok(())
}

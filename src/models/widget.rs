// Providers and per-widget fetch state

use serde::{Deserialize, Serialize};
use std::fmt;

use super::WidgetData;

/// Cloud vendor a widget's data comes from; serializes lowercase ("aws", "azure").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
        }
    }

    /// Parse from a path segment or config string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "aws" => Some(Provider::Aws),
            "azure" => Some(Provider::Azure),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// data/loading/error triple for one widget plus the latest issued request sequence.
///
/// Lifecycle: Idle -> Loading -> (Success | Error) -> Idle. Entering Loading clears the error
/// but keeps stale data for display until the request resolves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    pub data: Option<WidgetData>,
    pub loading: bool,
    pub error: Option<String>,
    /// Epoch millis of the last successful fetch.
    pub last_updated: Option<u64>,
    pub seq: u64,
}

impl WidgetState {
    /// Enters Loading and returns the sequence number tagging this request.
    pub fn begin(&mut self) -> u64 {
        self.seq += 1;
        self.loading = true;
        self.error = None;
        self.seq
    }

    /// Applies a finished request. Returns false (state untouched) unless `seq` is the latest issued.
    pub fn complete(&mut self, seq: u64, result: Result<WidgetData, String>, now_ms: u64) -> bool {
        if seq != self.seq {
            return false;
        }
        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.last_updated = Some(now_ms);
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    /// Invalidates any in-flight request and returns to Idle.
    pub fn retire(&mut self) {
        self.seq += 1;
        self.loading = false;
    }

    /// Invalidates any in-flight request and drops everything fetched so far.
    pub fn clear(&mut self) {
        *self = WidgetState {
            seq: self.seq + 1,
            ..WidgetState::default()
        };
    }

    /// Data that may be used for current-value computations: none while loading or after an error.
    pub fn current_data(&self) -> Option<&WidgetData> {
        if self.loading || self.error.is_some() {
            None
        } else {
            self.data.as_ref()
        }
    }
}

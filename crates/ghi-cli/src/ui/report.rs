//! Single-line JSON result for machine callers.

use serde::Serialize;

use crate::ops::{Outcome, RunError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Success {
        changed: bool,
        asset: Option<String>,
        tag: String,
    },
    Failure {
        failed: bool,
        kind: &'static str,
        msg: String,
    },
}

impl Report {
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"failed":true,"kind":"io","msg":"failed to encode report: {e}"}}"#)
        })
    }
}

impl From<&Outcome> for Report {
    fn from(outcome: &Outcome) -> Self {
        Self::Success {
            changed: outcome.changed,
            asset: outcome.asset.as_ref().map(|a| a.name.clone()),
            tag: outcome.tag.clone(),
        }
    }
}

impl From<&RunError> for Report {
    fn from(err: &RunError) -> Self {
        Self::Failure {
            failed: true,
            kind: err.kind().as_str(),
            msg: err.to_string(),
        }
    }
}

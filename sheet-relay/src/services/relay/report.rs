//! Failure reporting for relay dispatch

use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::range::RangeParseError;
use crate::api::a1::CellRange;

/// Something that went wrong while relaying one submission
#[derive(Debug, Clone, PartialEq)]
pub enum RelayFailure {
    /// A marked field whose name does not yield a range; nothing was sent
    InvalidField { field: String, error: RangeParseError },
    /// The service rejected or never answered a single-range write
    Update {
        field: Option<String>,
        range: CellRange,
        error: String,
        status: Option<u16>,
    },
    /// The service rejected a batched write
    Batch {
        requests: usize,
        error: String,
        status: Option<u16>,
    },
}

impl fmt::Display for RelayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidField { error, .. } => write!(f, "{error}"),
            Self::Update {
                field: Some(field),
                range,
                error,
                ..
            } => write!(f, "write of field '{field}' to {range} failed: {error}"),
            Self::Update {
                field: None, range, error, ..
            } => write!(f, "write to {range} failed: {error}"),
            Self::Batch {
                requests, error, ..
            } => write!(f, "batch write of {requests} ranges failed: {error}"),
        }
    }
}

/// What to do when a write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report and carry on with the next write
    #[default]
    Ignore,
    /// Report and stop dispatching
    Abort,
}

/// Policies for the two kinds of writes in a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayPolicies {
    /// The fixed header write
    pub fixed: FailurePolicy,
    /// Writes derived from marked fields
    pub fields: FailurePolicy,
}

impl RelayPolicies {
    /// Strictest of the two, used when everything travels in one call
    pub fn combined(&self) -> FailurePolicy {
        if self.fixed == FailurePolicy::Abort || self.fields == FailurePolicy::Abort {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Ignore
        }
    }
}

/// Receives every failure the relay encounters
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &RelayFailure);
}

/// Reports failures through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, failure: &RelayFailure) {
        match failure {
            RelayFailure::Update {
                status: Some(status),
                ..
            }
            | RelayFailure::Batch {
                status: Some(status),
                ..
            } => warn!("Relay failure (HTTP {}): {}", status, failure),
            _ => warn!("Relay failure: {}", failure),
        }
    }
}

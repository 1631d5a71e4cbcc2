//! Form-to-spreadsheet relay
//!
//! Turns one [`Submission`] into a plan of [`UpdateRequest`]s and submits
//! them. The four header fields always go to the fixed range as one vertical
//! write; every marked field goes to the cell named in its field name.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::range::{RADIO_MARKER, RangeParseError, is_marked, parse_field_range};
use super::report::{FailurePolicy, FailureReporter, LogReporter, RelayFailure, RelayPolicies};
use super::submission::Submission;
use crate::api::a1::CellRange;
use crate::api::client::SheetsApi;
use crate::api::operations::{UpdateOutcome, UpdateRequest};

/// Header fields, in the order they are written down the fixed range
pub const FIXED_FIELDS: [&str; 4] = ["Data", "Operatore", "nome_scheda", "numero_unita"];

/// Destination of the header fields
pub const FIXED_RANGE: &str = "B2:B";

/// How planned writes are sent to the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One call per range; earlier writes stay if a later one fails
    #[default]
    Individual,
    /// One `batchUpdate` call for the whole submission
    Batch,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("required field '{0}' is missing from the submission")]
    MissingField(&'static str),

    #[error("relay aborted after {succeeded} successful writes: {failure}")]
    Aborted {
        failure: RelayFailure,
        succeeded: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub spreadsheet_id: String,
    pub fixed_range: CellRange,
    pub marker: String,
    pub policies: RelayPolicies,
    pub mode: DispatchMode,
}

impl RelaySettings {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            fixed_range: CellRange::parse(FIXED_RANGE).expect("FIXED_RANGE is valid A1"),
            marker: RADIO_MARKER.to_string(),
            policies: RelayPolicies::default(),
            mode: DispatchMode::default(),
        }
    }
}

/// A marked field and the write it maps to
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub request: UpdateRequest,
}

/// Everything one submission will write, computed before anything is sent
#[derive(Debug, Clone, PartialEq)]
pub struct RelayPlan {
    pub fixed: UpdateRequest,
    pub fields: Vec<FieldUpdate>,
    pub rejected: Vec<(String, RangeParseError)>,
}

impl RelayPlan {
    /// All requests in dispatch order
    pub fn requests(&self) -> impl Iterator<Item = &UpdateRequest> {
        std::iter::once(&self.fixed).chain(self.fields.iter().map(|f| &f.request))
    }
}

/// Outcome of relaying one submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelayReport {
    pub outcomes: Vec<UpdateOutcome>,
    /// Marked fields skipped because their name is not a valid cell
    pub rejected: usize,
}

impl RelayReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }
}

/// Build the write plan for a submission.
///
/// Fails with [`RelayError::MissingField`] if any header field is absent.
pub fn plan(submission: &Submission, settings: &RelaySettings) -> Result<RelayPlan, RelayError> {
    let mut header = Vec::with_capacity(FIXED_FIELDS.len());
    for name in FIXED_FIELDS {
        let value = submission.first(name).ok_or(RelayError::MissingField(name))?;
        header.push(value.to_string());
    }
    let fixed = UpdateRequest::column(settings.fixed_range.clone(), header);

    let mut fields = Vec::new();
    let mut rejected = Vec::new();
    for (name, values) in submission.iter() {
        if !is_marked(name, &settings.marker) {
            continue;
        }
        let Some(value) = values.first() else {
            continue;
        };
        match parse_field_range(name, &settings.marker) {
            Ok(range) => fields.push(FieldUpdate {
                field: name.to_string(),
                request: UpdateRequest::single(range, value.clone()),
            }),
            Err(err) => rejected.push((name.to_string(), err)),
        }
    }

    Ok(RelayPlan {
        fixed,
        fields,
        rejected,
    })
}

/// Relays submissions into one spreadsheet
pub struct Relay {
    api: Arc<dyn SheetsApi>,
    reporter: Arc<dyn FailureReporter>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(api: Arc<dyn SheetsApi>, settings: RelaySettings) -> Self {
        Self {
            api,
            reporter: Arc::new(LogReporter),
            settings,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    pub fn plan(&self, submission: &Submission) -> Result<RelayPlan, RelayError> {
        plan(submission, &self.settings)
    }

    /// Plan and submit every write for `submission`
    pub async fn relay(&self, submission: &Submission) -> Result<RelayReport, RelayError> {
        let plan = self.plan(submission)?;

        for (field, error) in &plan.rejected {
            let failure = RelayFailure::InvalidField {
                field: field.clone(),
                error: error.clone(),
            };
            self.reporter.report(&failure);
            if self.settings.policies.fields == FailurePolicy::Abort {
                return Err(RelayError::Aborted {
                    failure,
                    succeeded: 0,
                });
            }
        }

        let mut report = match self.settings.mode {
            DispatchMode::Individual => self.dispatch_individual(&plan).await?,
            DispatchMode::Batch => self.dispatch_batch(&plan).await?,
        };
        report.rejected = plan.rejected.len();

        info!(
            "Relayed submission: {}/{} writes succeeded, {} fields rejected",
            report.succeeded(),
            report.attempted(),
            report.rejected
        );
        Ok(report)
    }

    async fn dispatch_individual(&self, plan: &RelayPlan) -> Result<RelayReport, RelayError> {
        let mut report = RelayReport::default();

        let writes = std::iter::once((None, &plan.fixed, self.settings.policies.fixed)).chain(
            plan.fields
                .iter()
                .map(|f| (Some(&f.field), &f.request, self.settings.policies.fields)),
        );

        for (field, request, policy) in writes {
            debug!("Writing {} cells to {}", request.cell_count(), request.range);
            match self
                .api
                .update_values(&self.settings.spreadsheet_id, request)
                .await
            {
                Ok(response) => {
                    report
                        .outcomes
                        .push(UpdateOutcome::success(request.range.clone(), response.updated_cells));
                }
                Err(err) => {
                    let failure = RelayFailure::Update {
                        field: field.cloned(),
                        range: request.range.clone(),
                        error: err.to_string(),
                        status: err.status(),
                    };
                    self.reporter.report(&failure);
                    report
                        .outcomes
                        .push(UpdateOutcome::error(request.range.clone(), err.to_string()));
                    if policy == FailurePolicy::Abort {
                        return Err(RelayError::Aborted {
                            failure,
                            succeeded: report.succeeded(),
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    async fn dispatch_batch(&self, plan: &RelayPlan) -> Result<RelayReport, RelayError> {
        let requests: Vec<UpdateRequest> = plan.requests().cloned().collect();
        debug!("Writing {} ranges in one batch", requests.len());

        let outcomes = match self
            .api
            .batch_update_values(&self.settings.spreadsheet_id, &requests)
            .await
        {
            Ok(response) => requests
                .iter()
                .enumerate()
                .map(|(i, request)| {
                    let cells = response.responses.get(i).and_then(|r| r.updated_cells);
                    UpdateOutcome::success(request.range.clone(), cells)
                })
                .collect(),
            Err(err) => {
                let failure = RelayFailure::Batch {
                    requests: requests.len(),
                    error: err.to_string(),
                    status: err.status(),
                };
                self.reporter.report(&failure);
                if self.settings.policies.combined() == FailurePolicy::Abort {
                    return Err(RelayError::Aborted {
                        failure,
                        succeeded: 0,
                    });
                }
                requests
                    .iter()
                    .map(|r| UpdateOutcome::error(r.range.clone(), err.to_string()))
                    .collect()
            }
        };

        Ok(RelayReport {
            outcomes,
            rejected: 0,
        })
    }
}

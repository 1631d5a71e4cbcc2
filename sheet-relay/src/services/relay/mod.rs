// Relay service for forwarding form submissions into a spreadsheet
//
// This service owns the mapping from submitted form fields to spreadsheet
// writes, decoupled from the HTTP layer and reusable from tests or the CLI.

pub mod core;
pub mod range;
pub mod report;
pub mod submission;

// Re-export commonly used types
pub use self::core::{
    DispatchMode, FIXED_FIELDS, FIXED_RANGE, FieldUpdate, Relay, RelayError, RelayPlan,
    RelayReport, RelaySettings, plan,
};
pub use range::{RADIO_MARKER, RangeParseError, is_marked, parse_field_range};
pub use report::{FailurePolicy, FailureReporter, LogReporter, RelayFailure, RelayPolicies};
pub use submission::Submission;

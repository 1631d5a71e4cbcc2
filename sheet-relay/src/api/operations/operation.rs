//! Core request types for spreadsheet value writes

use serde::{Deserialize, Serialize};

use crate::api::a1::CellRange;
use crate::api::models::{ValueInputOption, ValueRange};

/// A single write of a rectangular grid of values into one range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Destination range in A1 notation
    pub range: CellRange,
    /// Row-major grid of values
    pub values: Vec<Vec<String>>,
    /// How the service should interpret the values
    pub input_option: ValueInputOption,
}

/// Result of submitting one UpdateRequest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Range the request targeted
    pub range: CellRange,
    /// Whether the service accepted the write
    pub success: bool,
    /// Number of cells the service reports as written
    pub updated_cells: Option<u32>,
    /// Error message if the write failed
    pub error: Option<String>,
}

impl UpdateRequest {
    /// Create a request writing `values` downwards, one value per row
    pub fn column(range: CellRange, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            range,
            values: values.into_iter().map(|v| vec![v.into()]).collect(),
            input_option: ValueInputOption::Raw,
        }
    }

    /// Create a one-cell request
    pub fn single(range: CellRange, value: impl Into<String>) -> Self {
        Self {
            range,
            values: vec![vec![value.into()]],
            input_option: ValueInputOption::Raw,
        }
    }

    /// Number of cells this request writes
    pub fn cell_count(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// Convert into the wire `ValueRange` body
    pub fn to_value_range(&self) -> ValueRange {
        ValueRange {
            range: self.range.to_string(),
            major_dimension: "ROWS".to_string(),
            values: self.values.clone(),
        }
    }
}

impl UpdateOutcome {
    /// Create a new successful outcome
    pub fn success(range: CellRange, updated_cells: Option<u32>) -> Self {
        Self {
            range,
            success: true,
            updated_cells,
            error: None,
        }
    }

    /// Create a new failed outcome
    pub fn error(range: CellRange, error: impl Into<String>) -> Self {
        Self {
            range,
            success: false,
            updated_cells: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn is_error(&self) -> bool {
        !self.success
    }
}

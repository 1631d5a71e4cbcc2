//! Mapping marked field names to cell ranges
//!
//! A form field named `radioC5` carries its destination in its own name: the
//! marker is stripped and the remaining A1 reference becomes the one-cell
//! range `C5:C5`. Absolute (`radio$C$5`) and sheet-qualified
//! (`radioFoglio1!C5`) references are routed too.

use thiserror::Error;

use crate::api::a1::{A1Error, CellRange};

/// Marker carried by fields whose name encodes a destination cell
pub const RADIO_MARKER: &str = "radio";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("field '{0}' does not start with the cell marker")]
    MissingMarker(String),

    #[error("field '{0}' has no cell reference after the marker")]
    EmptyFragment(String),

    #[error("field '{field}' does not name a cell: {source}")]
    InvalidFragment {
        field: String,
        #[source]
        source: A1Error,
    },
}

/// Whether `name` should be routed to a cell at all
pub fn is_marked(name: &str, marker: &str) -> bool {
    !marker.is_empty() && name.contains(marker)
}

/// Derive the destination range from a marked field name
pub fn parse_field_range(name: &str, marker: &str) -> Result<CellRange, RangeParseError> {
    let fragment = name
        .strip_prefix(marker)
        .ok_or_else(|| RangeParseError::MissingMarker(name.to_string()))?;

    if fragment.is_empty() {
        return Err(RangeParseError::EmptyFragment(name.to_string()));
    }

    CellRange::single(fragment).map_err(|source| RangeParseError::InvalidFragment {
        field: name.to_string(),
        source,
    })
}

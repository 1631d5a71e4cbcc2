//! A1 notation ranges
//!
//! Typed wrapper around spreadsheet range strings such as `B2:B` or `C5:C5`.
//! Only the forms the relay writes to are accepted: single cells, whole
//! columns and whole rows, optionally joined into a `start:end` pair. Each
//! side may carry `$` anchors, and the whole range may be qualified with a
//! sheet name (`Foglio1!C5:C5`, `'Scheda 2'!B2:B`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One side of a range: `C5`, `C` (column) or `5` (row), each part
/// optionally anchored with `$`
static ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\$?[A-Za-z]+(?:\$?[1-9][0-9]*)?|\$?[1-9][0-9]*)$").unwrap()
});

/// Sheet qualifier before `!`: a plain name or a quoted one with `''` escapes
static SHEET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z0-9_.]+|'(?:[^']|'')+')$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A1Error {
    #[error("empty range")]
    Empty,
    #[error("invalid A1 reference '{0}'")]
    InvalidReference(String),
    #[error("too many ':' separators in '{0}'")]
    TooManyParts(String),
    #[error("invalid sheet name '{0}'")]
    InvalidSheet(String),
}

/// A validated A1 range
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRange(String);

impl CellRange {
    /// Parse a full range like `B2:B`, `C5:C5` or a bare reference like `C5`
    pub fn parse(text: &str) -> Result<Self, A1Error> {
        let (_, cells) = split_sheet(text)?;

        let mut parts = cells.split(':');
        let start = parts.next().unwrap_or_default();
        let end = parts.next();
        if parts.next().is_some() {
            return Err(A1Error::TooManyParts(text.to_string()));
        }

        validate_endpoint(start)?;
        if let Some(end) = end {
            validate_endpoint(end)?;
        }

        Ok(Self(text.to_string()))
    }

    /// Build the one-cell range `reference:reference`. A sheet qualifier is
    /// kept once, in front: `Foglio1!C5` becomes `Foglio1!C5:C5`.
    pub fn single(reference: &str) -> Result<Self, A1Error> {
        let (sheet, cell) = split_sheet(reference)?;
        validate_endpoint(cell)?;
        Ok(match sheet {
            Some(sheet) => Self(format!("{sheet}!{cell}:{cell}")),
            None => Self(format!("{cell}:{cell}")),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Split off an optional `sheet!` qualifier, validating it
fn split_sheet(text: &str) -> Result<(Option<&str>, &str), A1Error> {
    let (sheet, cells) = match text.rsplit_once('!') {
        Some((sheet, cells)) => {
            if !SHEET.is_match(sheet) {
                return Err(A1Error::InvalidSheet(sheet.to_string()));
            }
            (Some(sheet), cells)
        }
        None => (None, text),
    };
    if cells.is_empty() {
        return Err(A1Error::Empty);
    }
    Ok((sheet, cells))
}

fn validate_endpoint(reference: &str) -> Result<(), A1Error> {
    if ENDPOINT.is_match(reference) {
        Ok(())
    } else {
        Err(A1Error::InvalidReference(reference.to_string()))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CellRange {
    type Error = A1Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellRange> for String {
    fn from(range: CellRange) -> Self {
        range.0
    }
}

impl std::str::FromStr for CellRange {
    type Err = A1Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_range() {
        let range = CellRange::parse("B2:B").unwrap();
        assert_eq!(range.as_str(), "B2:B");
    }

    #[test]
    fn test_single_cell_doubles_reference() {
        assert_eq!(CellRange::single("C5").unwrap().as_str(), "C5:C5");
        assert_eq!(CellRange::single("aa12").unwrap().as_str(), "aa12:aa12");
    }

    #[test]
    fn test_whole_row_and_column() {
        assert!(CellRange::parse("3:3").is_ok());
        assert!(CellRange::parse("D:D").is_ok());
    }

    #[test]
    fn test_absolute_anchors() {
        assert_eq!(CellRange::single("$C$5").unwrap().as_str(), "$C$5:$C$5");
        assert_eq!(CellRange::single("C$5").unwrap().as_str(), "C$5:C$5");
        assert!(CellRange::parse("$B$2:$B").is_ok());
        assert!(CellRange::single("C$").is_err());
        assert!(CellRange::single("$$C5").is_err());
    }

    #[test]
    fn test_sheet_qualifier() {
        assert_eq!(
            CellRange::single("Foglio1!C5").unwrap().as_str(),
            "Foglio1!C5:C5"
        );
        assert_eq!(
            CellRange::single("'Scheda 2'!$D$3").unwrap().as_str(),
            "'Scheda 2'!$D$3:$D$3"
        );
        assert!(CellRange::parse("Foglio1!B2:B").is_ok());
        assert_eq!(
            CellRange::single("Scheda 2!C5"),
            Err(A1Error::InvalidSheet("Scheda 2".to_string()))
        );
        assert_eq!(CellRange::single("Foglio1!"), Err(A1Error::Empty));
        assert!(CellRange::single("!C5").is_err());
    }

    #[test]
    fn test_rejects_bad_references() {
        assert_eq!(CellRange::parse(""), Err(A1Error::Empty));
        assert_eq!(
            CellRange::single("5C"),
            Err(A1Error::InvalidReference("5C".to_string()))
        );
        assert_eq!(
            CellRange::single("C0"),
            Err(A1Error::InvalidReference("C0".to_string()))
        );
        assert!(matches!(
            CellRange::parse("A1:B2:C3"),
            Err(A1Error::TooManyParts(_))
        ));
        assert!(CellRange::parse("C5 ").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ok: CellRange = serde_json::from_str("\"B2:B\"").unwrap();
        assert_eq!(ok.to_string(), "B2:B");
        assert!(serde_json::from_str::<CellRange>("\"B2!\"").is_err());
    }
}

//! Domain models for the dashboard pipeline.
//!
//! - [`DepartmentRecord`] - one row of the department reference table
//! - [`TransactionRecord`] - one raw DVF transaction row
//! - [`MergedTransaction`] - a transaction after the left join
//! - [`EnrichedTransaction`] - a joined, typed row of the working set
//! - [`Month`] / [`Quarter`] - calendar periods used as grouping keys
//! - [`TableSchema`] - header contract of a source file

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Table Schemas
// =============================================================================

/// Header contract of a source table.
///
/// Loaders check the file header against [`TableSchema::COLUMNS`] before
/// reading any row.
pub trait TableSchema {
    /// Human-readable table name used in error messages.
    const NAME: &'static str;
    /// Columns that must be present in the header (any order, extra columns allowed).
    const COLUMNS: &'static [&'static str];
    /// Field delimiter of the source extract.
    const DELIMITER: u8;
}

// =============================================================================
// Department Reference
// =============================================================================

/// A French department with its region.
///
/// Deserialized from `departements-france.csv`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentRecord {
    #[serde(rename(deserialize = "code_departement"))]
    pub department_code: String,
    #[serde(rename(deserialize = "nom_departement"))]
    pub department_name: String,
    #[serde(rename(deserialize = "code_region"))]
    pub region_code: String,
    #[serde(rename(deserialize = "nom_region"))]
    pub region_name: String,
}

impl TableSchema for DepartmentRecord {
    const NAME: &'static str = "departments";
    const COLUMNS: &'static [&'static str] =
        &["code_departement", "nom_departement", "code_region", "nom_region"];
    const DELIMITER: u8 = b',';
}

// =============================================================================
// Raw Transactions
// =============================================================================

/// A raw transaction row from `ValeursFoncieres-<year>.txt`.
///
/// Every field is kept as text; empty source fields are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    #[serde(rename(deserialize = "Date mutation"), default)]
    pub mutation_date: Option<String>,
    #[serde(rename(deserialize = "Code departement"), default)]
    pub department_code: Option<String>,
    #[serde(rename(deserialize = "Type local"), default)]
    pub property_type: Option<String>,
    #[serde(rename(deserialize = "Valeur fonciere"), default)]
    pub property_value: Option<String>,
}

impl TableSchema for TransactionRecord {
    const NAME: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] =
        &["Date mutation", "Code departement", "Type local", "Valeur fonciere"];
    const DELIMITER: u8 = b'|';
}

// =============================================================================
// Joined Rows
// =============================================================================

/// A transaction after the left join; `department` is `None` when the code
/// has no match in the reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTransaction {
    pub transaction: TransactionRecord,
    pub department: Option<DepartmentRecord>,
}

/// A row of the working set.
///
/// `value` is always a finite number: rows whose value cannot be parsed
/// never become an `EnrichedTransaction`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedTransaction {
    pub mutation_date: Option<String>,
    /// Code as written in the transaction file, not normalized.
    pub department_code: Option<String>,
    pub property_type: Option<String>,
    pub property_value: Option<String>,
    pub department_name: Option<String>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub value: f64,
}

impl EnrichedTransaction {
    /// Calendar month of the mutation, if the date parsed.
    pub fn month(&self) -> Option<Month> {
        self.date.map(Month::from)
    }

    /// Calendar quarter of the mutation, if the date parsed.
    pub fn quarter(&self) -> Option<Quarter> {
        self.date.map(Quarter::from)
    }

    /// Whether the join found a department for this row.
    pub fn is_matched(&self) -> bool {
        self.department_name.is_some()
    }
}

/// Column names of the merged table, in output order.
pub const MERGED_COLUMNS: &[&str] = &[
    "Date mutation",
    "Code departement",
    "Type local",
    "Valeur fonciere",
    "code_departement",
    "nom_departement",
    "code_region",
    "nom_region",
];

// =============================================================================
// Periods
// =============================================================================

/// A calendar month. Orders chronologically, displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A calendar quarter. Orders chronologically, displays as `YYYYQn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    pub year: i32,
    pub quarter: u32,
}

impl From<NaiveDate> for Quarter {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}Q{}", self.year, self.quarter)
    }
}

// =============================================================================
// Department Codes
// =============================================================================

/// Normalize a department code for joining and lookups.
///
/// Trims whitespace and zero-pads single-digit numeric codes ("1" -> "01").
/// Corsican ("2A", "2B") and overseas ("971") codes are unchanged.
/// Returns `None` for a blank code.
pub fn normalize_department_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() {
        return None;
    }
    if code.len() < 2 && code.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{:0>2}", code))
    } else {
        Some(code.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_label_and_order() {
        let jan = Month::from(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap());
        let nov = Month::from(NaiveDate::from_ymd_opt(2023, 11, 2).unwrap());
        let next_jan = Month::from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        assert_eq!(jan.to_string(), "2023-01");
        assert_eq!(nov.to_string(), "2023-11");
        assert!(jan < nov);
        assert!(nov < next_jan);
    }

    #[test]
    fn test_quarter_boundaries() {
        let q = |m| Quarter::from(NaiveDate::from_ymd_opt(2023, m, 1).unwrap()).quarter;
        assert_eq!(q(1), 1);
        assert_eq!(q(3), 1);
        assert_eq!(q(4), 2);
        assert_eq!(q(9), 3);
        assert_eq!(q(12), 4);

        let label = Quarter::from(NaiveDate::from_ymd_opt(2023, 5, 31).unwrap()).to_string();
        assert_eq!(label, "2023Q2");
    }

    #[test]
    fn test_normalize_department_code() {
        assert_eq!(normalize_department_code("1").as_deref(), Some("01"));
        assert_eq!(normalize_department_code(" 75 ").as_deref(), Some("75"));
        assert_eq!(normalize_department_code("2a").as_deref(), Some("2A"));
        assert_eq!(normalize_department_code("971").as_deref(), Some("971"));
        assert_eq!(normalize_department_code("   "), None);
    }

    #[test]
    fn test_schemas_name_their_columns() {
        assert_eq!(DepartmentRecord::COLUMNS.len(), 4);
        assert!(TransactionRecord::COLUMNS.contains(&"Valeur fonciere"));
        assert_eq!(TransactionRecord::DELIMITER, b'|');
    }
}

//! Type coercion of merged rows.
//!
//! - `Date mutation` is parsed as `dd/mm/yyyy`; failures leave `date = None`.
//! - `Valeur fonciere` uses a decimal comma ("150000,50"); rows whose value
//!   cannot be parsed are dropped.

use chrono::NaiveDate;

use crate::error::{ParseError, ParseResult};
use crate::models::{EnrichedTransaction, MergedTransaction};

/// Date layout of the DVF extracts.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Outcome of normalizing a merged table.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub rows: Vec<EnrichedTransaction>,
    /// Rows removed because their value did not parse.
    pub dropped_rows: usize,
    /// Retained rows whose date did not parse.
    pub undated_rows: usize,
}

/// Parse a French day/month/year date.
pub fn parse_date(raw: &str) -> ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ParseError::InvalidDate(raw.to_string()))
}

/// Parse a decimal-comma amount into a finite number.
pub fn parse_value(raw: Option<&str>) -> ParseResult<f64> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(ParseError::MissingValue)?;

    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidValue(raw.to_string()))
}

/// Coerce one merged row. Fails only when the value cannot be parsed.
pub fn enrich(merged: MergedTransaction) -> ParseResult<EnrichedTransaction> {
    let MergedTransaction {
        transaction,
        department,
    } = merged;

    let value = parse_value(transaction.property_value.as_deref())?;
    let date = transaction
        .mutation_date
        .as_deref()
        .and_then(|d| parse_date(d).ok());

    let (department_name, region_code, region_name) = match department {
        Some(d) => (Some(d.department_name), Some(d.region_code), Some(d.region_name)),
        None => (None, None, None),
    };

    Ok(EnrichedTransaction {
        mutation_date: transaction.mutation_date,
        department_code: transaction.department_code,
        property_type: transaction.property_type,
        property_value: transaction.property_value,
        department_name,
        region_code,
        region_name,
        date,
        value,
    })
}

/// Normalize every merged row, dropping those without a usable value.
pub fn normalize(merged: Vec<MergedTransaction>) -> Normalized {
    let mut result = Normalized::default();

    for row in merged {
        match enrich(row) {
            Ok(enriched) => {
                if enriched.date.is_none() {
                    result.undated_rows += 1;
                }
                result.rows.push(enriched);
            }
            Err(_) => result.dropped_rows += 1,
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionRecord;

    fn merged(date: Option<&str>, value: Option<&str>) -> MergedTransaction {
        MergedTransaction {
            transaction: TransactionRecord {
                mutation_date: date.map(String::from),
                department_code: Some("75".into()),
                property_type: Some("Maison".into()),
                property_value: value.map(String::from),
            },
            department: None,
        }
    }

    #[test]
    fn test_parse_value_decimal_comma() {
        assert_eq!(parse_value(Some("150000,50")), Ok(150000.5));
        assert_eq!(parse_value(Some("100000")), Ok(100000.0));
        assert_eq!(parse_value(Some(" 42,0 ")), Ok(42.0));
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        assert_eq!(parse_value(Some("abc")), Err(ParseError::InvalidValue("abc".into())));
        assert_eq!(parse_value(Some("")), Err(ParseError::MissingValue));
        assert_eq!(parse_value(None), Err(ParseError::MissingValue));
        assert!(parse_value(Some("inf")).is_err());
        assert!(parse_value(Some("NaN")).is_err());
    }

    #[test]
    fn test_parse_date_day_first() {
        let date = parse_date("03/01/2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
        assert!(parse_date("2023-01-03").is_err());
        assert!(parse_date("31/02/2023").is_err());
    }

    #[test]
    fn test_scenario_unparseable_value_row_is_dropped() {
        let rows = vec![
            merged(Some("05/01/2023"), Some("100000")),
            merged(Some("06/01/2023"), Some("abc")),
            merged(Some("07/01/2023"), Some("200000,50")),
        ];

        let normalized = normalize(rows);

        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.dropped_rows, 1);
        let total: f64 = normalized.rows.iter().map(|r| r.value).sum();
        assert_eq!(total, 300000.5);
    }

    #[test]
    fn test_bad_date_keeps_row() {
        let normalized = normalize(vec![merged(Some("not a date"), Some("10,5")), merged(None, Some("1"))]);

        assert_eq!(normalized.rows.len(), 2);
        assert_eq!(normalized.undated_rows, 2);
        assert!(normalized.rows[0].date.is_none());
        assert_eq!(normalized.rows[0].mutation_date.as_deref(), Some("not a date"));
    }

    #[test]
    fn test_every_kept_row_has_finite_value() {
        let inputs = ["1", "x", "", "2,5", "1e3", "-", "3,", "NaN"];
        let rows = inputs.iter().map(|v| merged(Some("01/01/2023"), Some(v))).collect();

        let normalized = normalize(rows);
        assert!(normalized.rows.iter().all(|r| r.value.is_finite()));
        assert_eq!(normalized.rows.len() + normalized.dropped_rows, inputs.len());
    }
}

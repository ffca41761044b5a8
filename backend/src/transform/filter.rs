//! Categorical filtering of the working set.
//!
//! Three selectors (region, department, property type), each either the
//! "no filter" sentinel or an exact value. Active selectors are ANDed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::models::EnrichedTransaction;

/// Sentinel label shown for the region selector.
pub const ALL_REGIONS: &str = "Toutes";
/// Sentinel label shown for the department selector.
pub const ALL_DEPARTMENTS: &str = "Tous";
/// Sentinel label shown for the property type selector.
pub const ALL_TYPES: &str = "Tous";

const SENTINELS: &[&str] = &["toutes", "tous", "all", "every"];

/// One categorical selector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Selector {
    /// No filter.
    #[default]
    All,
    /// Keep rows whose field equals this value exactly.
    Only(String),
}

impl Selector {
    /// Parse a user choice. Blank input and sentinel labels disable the filter.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
            Selector::All
        } else {
            Selector::Only(trimmed.to_string())
        }
    }

    /// Parse an optional choice, `None` meaning no filter.
    pub fn from_option(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }

    /// Whether a row field passes this selector. A missing field only passes `All`.
    pub fn matches(&self, field: Option<&str>) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => field == Some(wanted.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "*"),
            Selector::Only(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selector::All => serializer.serialize_none(),
            Selector::Only(v) => serializer.serialize_some(v),
        }
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Selector::from_option(raw.as_deref()))
    }
}

/// The three dashboard selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default)]
    pub region: Selector,
    #[serde(default)]
    pub department: Selector,
    #[serde(default)]
    pub property_type: Selector,
}

impl Selectors {
    /// Build selectors from optional raw choices.
    pub fn from_choices(region: Option<&str>, department: Option<&str>, property_type: Option<&str>) -> Self {
        Self {
            region: Selector::from_option(region),
            department: Selector::from_option(department),
            property_type: Selector::from_option(property_type),
        }
    }

    /// Whether every selector is the sentinel.
    pub fn is_unfiltered(&self) -> bool {
        self.region.is_all() && self.department.is_all() && self.property_type.is_all()
    }

    /// Whether a row passes every active selector.
    pub fn matches(&self, row: &EnrichedTransaction) -> bool {
        self.region.matches(row.region_name.as_deref())
            && self.department.matches(row.department_name.as_deref())
            && self.property_type.matches(row.property_type.as_deref())
    }
}

/// Keep the rows that pass every active selector, preserving order.
pub fn apply(rows: &[EnrichedTransaction], selectors: &Selectors) -> Vec<EnrichedTransaction> {
    rows.iter().filter(|row| selectors.matches(row)).cloned().collect()
}

/// Choice lists for the three selectors, sentinel first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectorOptions {
    pub regions: Vec<String>,
    pub departments: Vec<String>,
    pub property_types: Vec<String>,
}

impl SelectorOptions {
    /// Derive choices from the distinct non-null values of a working set,
    /// in order of first appearance.
    pub fn from_rows(rows: &[EnrichedTransaction]) -> Self {
        Self {
            regions: choices(ALL_REGIONS, rows.iter().map(|r| r.region_name.as_deref())),
            departments: choices(ALL_DEPARTMENTS, rows.iter().map(|r| r.department_name.as_deref())),
            property_types: choices(ALL_TYPES, rows.iter().map(|r| r.property_type.as_deref())),
        }
    }
}

fn choices<'a>(sentinel: &str, values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = vec![sentinel.to_string()];
    for value in values.flatten() {
        if seen.insert(value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(region: Option<&str>, department: Option<&str>, kind: Option<&str>) -> EnrichedTransaction {
        EnrichedTransaction {
            mutation_date: None,
            department_code: None,
            property_type: kind.map(String::from),
            property_value: Some("1".into()),
            department_name: department.map(String::from),
            region_code: None,
            region_name: region.map(String::from),
            date: None,
            value: 1.0,
        }
    }

    fn sample() -> Vec<EnrichedTransaction> {
        vec![
            row(Some("Île-de-France"), Some("Paris"), Some("Appartement")),
            row(Some("Île-de-France"), Some("Essonne"), Some("Maison")),
            row(Some("Bretagne"), Some("Finistère"), Some("Maison")),
            row(None, None, Some("Dépendance")),
            row(Some("Bretagne"), Some("Morbihan"), None),
        ]
    }

    #[test]
    fn test_sentinels_parse_to_all() {
        for raw in ["Toutes", "Tous", "tous", "All", "Every", "", "  "] {
            assert_eq!(Selector::parse(raw), Selector::All, "{raw:?}");
        }
        assert_eq!(Selector::parse(" Maison "), Selector::Only("Maison".into()));
        assert_eq!(Selector::from_option(None), Selector::All);
    }

    #[test]
    fn test_all_sentinels_return_everything() {
        let rows = sample();
        let selectors = Selectors::from_choices(Some("Toutes"), Some("Tous"), Some("Tous"));

        assert!(selectors.is_unfiltered());
        assert_eq!(apply(&rows, &selectors), rows);
    }

    #[test]
    fn test_predicates_and_together() {
        let rows = sample();
        let selectors = Selectors::from_choices(Some("Île-de-France"), None, Some("Maison"));

        let result = apply(&rows, &selectors);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].department_name.as_deref(), Some("Essonne"));
    }

    #[test]
    fn test_missing_field_never_matches_a_value() {
        let rows = sample();
        let selectors = Selectors::from_choices(None, None, Some("Dépendance"));
        assert_eq!(apply(&rows, &selectors).len(), 1);

        let selectors = Selectors::from_choices(Some("Bretagne"), None, Some("Maison"));
        assert_eq!(apply(&rows, &selectors).len(), 1);
    }

    #[test]
    fn test_unknown_value_gives_empty_result() {
        let selectors = Selectors::from_choices(Some("Atlantide"), None, None);
        assert!(apply(&sample(), &selectors).is_empty());
    }

    #[test]
    fn test_additional_selector_never_grows_result() {
        let rows = sample();
        let region = Selectors::from_choices(Some("Bretagne"), None, None);
        let region_type = Selectors::from_choices(Some("Bretagne"), None, Some("Maison"));
        let all_three = Selectors::from_choices(Some("Bretagne"), Some("Finistère"), Some("Maison"));

        let a = apply(&rows, &region).len();
        let b = apply(&rows, &region_type).len();
        let c = apply(&rows, &all_three).len();
        assert!(a <= rows.len());
        assert!(b <= a);
        assert!(c <= b);
    }

    #[test]
    fn test_filter_order_does_not_matter() {
        let rows = sample();
        let by_type = Selectors::from_choices(None, None, Some("Maison"));
        let by_region = Selectors::from_choices(Some("Bretagne"), None, None);
        let both = Selectors::from_choices(Some("Bretagne"), None, Some("Maison"));

        let type_then_region = apply(&apply(&rows, &by_type), &by_region);
        let region_then_type = apply(&apply(&rows, &by_region), &by_type);
        assert_eq!(type_then_region, region_then_type);
        assert_eq!(type_then_region, apply(&rows, &both));
    }

    #[test]
    fn test_selector_options_first_appearance_order() {
        let options = SelectorOptions::from_rows(&sample());

        assert_eq!(options.regions, vec!["Toutes", "Île-de-France", "Bretagne"]);
        assert_eq!(options.departments[0], "Tous");
        assert_eq!(options.departments.len(), 5);
        assert_eq!(options.property_types, vec!["Tous", "Appartement", "Maison", "Dépendance"]);
    }

    #[test]
    fn test_selectors_deserialize_sentinels() {
        let selectors: Selectors =
            serde_json::from_str(r#"{"region": "Toutes", "property_type": "Maison"}"#).unwrap();
        assert_eq!(selectors.region, Selector::All);
        assert_eq!(selectors.department, Selector::All);
        assert_eq!(selectors.property_type, Selector::Only("Maison".into()));
    }
}

//! Reference statistics over the department table.
//!
//! These figures describe the administrative hierarchy itself and do not
//! depend on the transaction selectors.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{normalize_department_code, DepartmentRecord};

/// A region of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub region_code: String,
    pub region_name: String,
}

/// Number of departments in one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region_name: String,
    pub departments: usize,
}

/// Everything the reference panel shows at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub total_departments: usize,
    pub total_regions: usize,
    pub departments_per_region: Vec<RegionCount>,
    pub departments_by_region: BTreeMap<String, Vec<String>>,
    pub regions: Vec<Region>,
}

/// Read-only view over the loaded department records.
pub struct DepartmentCatalog<'a> {
    departments: &'a [DepartmentRecord],
}

impl<'a> DepartmentCatalog<'a> {
    pub fn new(departments: &'a [DepartmentRecord]) -> Self {
        Self { departments }
    }

    pub fn total_departments(&self) -> usize {
        self.departments.len()
    }

    /// Distinct region names.
    pub fn total_regions(&self) -> usize {
        self.departments
            .iter()
            .map(|d| d.region_name.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Department count per region, largest first, ties by region name.
    pub fn departments_per_region(&self) -> Vec<RegionCount> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for d in self.departments {
            *counts.entry(d.region_name.as_str()).or_default() += 1;
        }

        let mut result: Vec<RegionCount> = counts
            .into_iter()
            .map(|(name, n)| RegionCount {
                region_name: name.to_string(),
                departments: n,
            })
            .collect();
        result.sort_by(|a, b| {
            b.departments
                .cmp(&a.departments)
                .then_with(|| a.region_name.cmp(&b.region_name))
        });
        result
    }

    /// Department names per region, in file order.
    pub fn departments_by_region(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for d in self.departments {
            map.entry(d.region_name.clone())
                .or_default()
                .push(d.department_name.clone());
        }
        map
    }

    /// Records whose code equals `code` after normalization.
    pub fn find_by_code(&self, code: &str) -> Vec<&'a DepartmentRecord> {
        let Some(wanted) = normalize_department_code(code) else {
            return Vec::new();
        };
        self.departments
            .iter()
            .filter(|d| normalize_department_code(&d.department_code).as_deref() == Some(wanted.as_str()))
            .collect()
    }

    /// Records whose name equals `name` exactly.
    pub fn find_by_name(&self, name: &str) -> Vec<&'a DepartmentRecord> {
        let name = name.trim();
        self.departments
            .iter()
            .filter(|d| d.department_name == name)
            .collect()
    }

    /// Distinct (code, name) regions ordered by region code.
    pub fn regions(&self) -> Vec<Region> {
        let mut seen = HashSet::new();
        let mut regions: Vec<Region> = self
            .departments
            .iter()
            .filter(|d| seen.insert((d.region_code.as_str(), d.region_name.as_str())))
            .map(|d| Region {
                region_code: d.region_code.clone(),
                region_name: d.region_name.clone(),
            })
            .collect();
        regions.sort_by(|a, b| compare_codes(&a.region_code, &b.region_code));
        regions
    }

    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            total_departments: self.total_departments(),
            total_regions: self.total_regions(),
            departments_per_region: self.departments_per_region(),
            departments_by_region: self.departments_by_region(),
            regions: self.regions(),
        }
    }
}

/// Numeric order when both codes are numbers, lexicographic otherwise.
fn compare_codes(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u32>(), b.trim().parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(code: &str, name: &str, region_code: &str, region: &str) -> DepartmentRecord {
        DepartmentRecord {
            department_code: code.into(),
            department_name: name.into(),
            region_code: region_code.into(),
            region_name: region.into(),
        }
    }

    fn sample() -> Vec<DepartmentRecord> {
        vec![
            dep("01", "Ain", "84", "Auvergne-Rhône-Alpes"),
            dep("29", "Finistère", "53", "Bretagne"),
            dep("75", "Paris", "11", "Île-de-France"),
            dep("35", "Ille-et-Vilaine", "53", "Bretagne"),
            dep("971", "Guadeloupe", "1", "Guadeloupe"),
            dep("91", "Essonne", "11", "Île-de-France"),
        ]
    }

    #[test]
    fn test_totals() {
        let deps = sample();
        let catalog = DepartmentCatalog::new(&deps);
        assert_eq!(catalog.total_departments(), 6);
        assert_eq!(catalog.total_regions(), 4);
    }

    #[test]
    fn test_departments_per_region_sorted_by_count() {
        let deps = sample();
        let counts = DepartmentCatalog::new(&deps).departments_per_region();

        assert_eq!(counts[0], RegionCount { region_name: "Bretagne".into(), departments: 2 });
        assert_eq!(counts[1].region_name, "Île-de-France");
        assert_eq!(counts[2].region_name, "Auvergne-Rhône-Alpes");
        assert_eq!(counts[3].departments, 1);
    }

    #[test]
    fn test_departments_by_region_keeps_file_order() {
        let deps = sample();
        let map = DepartmentCatalog::new(&deps).departments_by_region();
        assert_eq!(map["Bretagne"], vec!["Finistère", "Ille-et-Vilaine"]);
        assert_eq!(map["Île-de-France"], vec!["Paris", "Essonne"]);
    }

    #[test]
    fn test_find_by_code_and_name() {
        let deps = sample();
        let catalog = DepartmentCatalog::new(&deps);

        assert_eq!(catalog.find_by_code("1")[0].department_name, "Ain");
        assert_eq!(catalog.find_by_code("75")[0].region_name, "Île-de-France");
        assert!(catalog.find_by_code("00").is_empty());
        assert!(catalog.find_by_code("").is_empty());

        assert_eq!(catalog.find_by_name("Essonne")[0].department_code, "91");
        assert!(catalog.find_by_name("essonne").is_empty());
    }

    #[test]
    fn test_regions_sorted_numerically() {
        let deps = sample();
        let codes: Vec<_> = DepartmentCatalog::new(&deps)
            .regions()
            .into_iter()
            .map(|r| r.region_code)
            .collect();
        assert_eq!(codes, vec!["1", "11", "53", "84"]);
    }
}

//! Grouped summary views and scalar aggregates over the working set.
//!
//! Groups are accumulated in a `BTreeMap`, so view rows come out in key
//! order: lexicographic for names, chronological for periods. Rows whose
//! key is missing are left out of that view.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::models::EnrichedTransaction;

/// Statistic computed per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Count,
}

/// One group of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    pub key: String,
    pub value: f64,
}

/// A named grouping of the working set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub name: String,
    pub statistic: Statistic,
    pub rows: Vec<ViewRow>,
}

impl AggregateView {
    pub fn empty(name: &str, statistic: Statistic) -> Self {
        Self {
            name: name.to_string(),
            statistic,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a group, if present.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rows.iter().find(|r| r.key == key).map(|r| r.value)
    }
}

/// The five dashboard views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregates {
    pub mean_by_type: AggregateView,
    pub count_by_month: AggregateView,
    pub mean_by_quarter: AggregateView,
    pub mean_by_department: AggregateView,
    pub mean_by_region: AggregateView,
}

/// Working-set wide figures. Sum and mean are `None` for an empty set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scalars {
    pub row_count: usize,
    pub total_value: Option<f64>,
    pub mean_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn get(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Count => self.count as f64,
            Statistic::Mean => self.sum / self.count as f64,
        }
    }
}

/// Group rows by a key and compute a statistic per group.
pub fn group_by<K, F>(rows: &[EnrichedTransaction], name: &str, statistic: Statistic, key: F) -> AggregateView
where
    K: Ord + Display,
    F: Fn(&EnrichedTransaction) -> Option<K>,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(row.value);
        }
    }

    AggregateView {
        name: name.to_string(),
        statistic,
        rows: groups
            .into_iter()
            .map(|(k, acc)| ViewRow {
                key: k.to_string(),
                value: acc.get(statistic),
            })
            .collect(),
    }
}

pub fn mean_by_type(rows: &[EnrichedTransaction]) -> AggregateView {
    group_by(rows, "mean_by_type", Statistic::Mean, |r| r.property_type.clone())
}

pub fn count_by_month(rows: &[EnrichedTransaction]) -> AggregateView {
    group_by(rows, "count_by_month", Statistic::Count, EnrichedTransaction::month)
}

pub fn mean_by_quarter(rows: &[EnrichedTransaction]) -> AggregateView {
    group_by(rows, "mean_by_quarter", Statistic::Mean, EnrichedTransaction::quarter)
}

/// Mean value per department name. Empty when no row carries a department.
pub fn mean_by_department(rows: &[EnrichedTransaction]) -> AggregateView {
    group_by(rows, "mean_by_department", Statistic::Mean, |r| r.department_name.clone())
}

pub fn mean_by_region(rows: &[EnrichedTransaction]) -> AggregateView {
    group_by(rows, "mean_by_region", Statistic::Mean, |r| r.region_name.clone())
}

/// Compute all five views.
pub fn aggregate(rows: &[EnrichedTransaction]) -> Aggregates {
    Aggregates {
        mean_by_type: mean_by_type(rows),
        count_by_month: count_by_month(rows),
        mean_by_quarter: mean_by_quarter(rows),
        mean_by_department: mean_by_department(rows),
        mean_by_region: mean_by_region(rows),
    }
}

/// Total and mean value over the working set.
pub fn scalars(rows: &[EnrichedTransaction]) -> Scalars {
    if rows.is_empty() {
        return Scalars {
            row_count: 0,
            total_value: None,
            mean_value: None,
        };
    }

    let total: f64 = rows.iter().map(|r| r.value).sum();
    Scalars {
        row_count: rows.len(),
        total_value: Some(total),
        mean_value: Some(total / rows.len() as f64),
    }
}

//! Left join of transactions onto the department reference table.
//!
//! ```text
//! transactions (N rows)            departments (unique code)
//! ┌──────────────────────┐        ┌─────────────────────────┐
//! │ 75 | Appartement     │───┐    │ 75 | Paris | Île-de-Fr. │
//! │ 99 | Maison          │─┐ └───▶│ 01 | Ain   | Auvergne.. │
//! └──────────────────────┘ │      └─────────────────────────┘
//!                          └────▶ no match: department = None
//! ```
//!
//! Output has exactly N rows, in input order.

use std::collections::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::models::{normalize_department_code, DepartmentRecord, MergedTransaction, TransactionRecord};

/// Summary of a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// Index departments by normalized code, rejecting duplicate codes.
///
/// Duplicates are detected after normalization, so a table listing both
/// `1` and `01` is rejected as well.
pub fn index_departments(
    departments: &[DepartmentRecord],
) -> SchemaResult<HashMap<String, &DepartmentRecord>> {
    let mut index = HashMap::with_capacity(departments.len());

    for department in departments {
        let Some(code) = normalize_department_code(&department.department_code) else {
            continue;
        };
        if index.insert(code.clone(), department).is_some() {
            return Err(SchemaError::DuplicateKey {
                column: "code_departement".to_string(),
                key: code,
            });
        }
    }

    Ok(index)
}

/// Left-join transactions with departments on the department code.
///
/// Every transaction appears exactly once, with its fields unchanged; the
/// normalized code is only the join key. Fails with
/// [`SchemaError::DuplicateKey`] when the reference table repeats a code.
pub fn merge(
    transactions: Vec<TransactionRecord>,
    departments: &[DepartmentRecord],
) -> SchemaResult<(Vec<MergedTransaction>, MergeStats)> {
    let index = index_departments(departments)?;
    Ok(merge_indexed(transactions, &index))
}

/// Left-join against a department index built by [`index_departments`].
pub fn merge_indexed(
    transactions: Vec<TransactionRecord>,
    index: &HashMap<String, &DepartmentRecord>,
) -> (Vec<MergedTransaction>, MergeStats) {
    let mut stats = MergeStats::default();

    let merged = transactions
        .into_iter()
        .map(|transaction| {
            let department = transaction
                .department_code
                .as_deref()
                .and_then(normalize_department_code)
                .and_then(|code| index.get(&code))
                .map(|d| (*d).clone());

            if department.is_some() {
                stats.matched += 1;
            } else {
                stats.unmatched += 1;
            }

            MergedTransaction {
                transaction,
                department,
            }
        })
        .collect();

    (merged, stats)
}

/// Carry transactions through without any department data.
///
/// Used when the reference table cannot be joined; the dependent views
/// then come out empty instead of failing the whole render.
pub fn without_departments(transactions: Vec<TransactionRecord>) -> Vec<MergedTransaction> {
    transactions
        .into_iter()
        .map(|transaction| MergedTransaction {
            transaction,
            department: None,
        })
        .collect()
}

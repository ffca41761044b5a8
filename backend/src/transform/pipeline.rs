//! High-level pipeline API: one call per dashboard interaction.
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌───────────┐   ┌────────┐   ┌───────────┐
//! │  Loader  │──▶│ Merger │──▶│Normalizer │──▶│ Filter │──▶│Aggregator │──▶ ViewBundle
//! └──────────┘   └────────┘   └───────────┘   └────────┘   └───────────┘
//! ```
//!
//! Nothing is cached between calls: [`render`] rereads both source files.
//!
//! # Example
//!
//! ```rust,ignore
//! use immo::{render, DataSources, Selectors, ViewOptions};
//!
//! let sources = DataSources::new("data/departements-france.csv", "data/ValeursFoncieres-2023.txt");
//! let selectors = Selectors::from_choices(Some("Bretagne"), None, Some("Maison"));
//! let bundle = render(&sources, &selectors, &ViewOptions::default())?;
//! println!("Mean price: {:?}", bundle.scalars.mean_value);
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::aggregate::{aggregate, scalars, AggregateView, Aggregates, Scalars, Statistic};
use super::filter::{apply, SelectorOptions, Selectors};
use super::merge::{index_departments, merge_indexed, without_departments, MergeStats};
use super::normalize::normalize;
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::error::{PipelineError, PipelineResult, SchemaError};
use crate::geo::{choropleth, ChoroplethPoint};
use crate::models::{DepartmentRecord, EnrichedTransaction, MergedTransaction, TransactionRecord, MERGED_COLUMNS};
use crate::parser::{load_departments, load_transactions, SourceInfo, Table};

/// Rows shown in the working-set preview by default.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Locations of the two source files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSources {
    pub departments: PathBuf,
    pub transactions: PathBuf,
}

impl DataSources {
    pub fn new(departments: impl Into<PathBuf>, transactions: impl Into<PathBuf>) -> Self {
        Self {
            departments: departments.into(),
            transactions: transactions.into(),
        }
    }
}

/// Presentation options that do not change the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub preview_rows: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// Both source tables, freshly read.
///
/// A department table that fails its schema check is kept as the error:
/// the department-dependent views degrade, everything else still renders.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub departments: Result<Table<DepartmentRecord>, SchemaError>,
    pub transactions: Table<TransactionRecord>,
}

impl Loaded {
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.departments
            .iter()
            .map(|t| t.info.clone())
            .chain(std::iter::once(self.transactions.info.clone()))
            .collect()
    }

    /// Merge and normalize, degrading when the department table is unusable.
    pub fn into_working_set(self) -> WorkingSet {
        match self.departments {
            Ok(departments) => prepare(&departments.rows, self.transactions.rows),
            Err(e) => prepare_without_departments(
                self.transactions.rows,
                format!("Department table unusable: {}", e),
            ),
        }
    }
}

/// The normalized, unfiltered working set.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    pub rows: Vec<EnrichedTransaction>,
    /// Transactions handed to the merger.
    pub loaded_rows: usize,
    /// `None` when the merge degraded.
    pub merge: Option<MergeStats>,
    pub dropped_rows: usize,
    pub undated_rows: usize,
    pub warnings: Vec<String>,
}

/// Row counts reported with every render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RowCounts {
    pub loaded: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub dropped: usize,
    pub undated: usize,
    pub working_set: usize,
    pub filtered: usize,
}

/// Everything the presentation layer needs for one render cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ViewBundle {
    pub run_id: String,
    pub selectors: Selectors,
    pub scalars: Scalars,
    pub views: Aggregates,
    pub choropleth: Vec<ChoroplethPoint>,
    pub preview: Vec<EnrichedTransaction>,
    pub counts: RowCounts,
    pub columns: Vec<String>,
    pub sources: Vec<SourceInfo>,
    pub warnings: Vec<String>,
}

/// Read both source files.
pub fn load(sources: &DataSources) -> PipelineResult<Loaded> {
    log_info("📖 Reading source files...");

    // Only a schema mismatch is tolerated here; a missing or unreadable file is fatal.
    let departments = match load_departments(&sources.departments) {
        Ok(table) => {
            report_source("departments", &table.info);
            Ok(table)
        }
        Err(PipelineError::Schema(e)) => Err(e),
        Err(e) => return Err(e),
    };

    let transactions = load_transactions(&sources.transactions)?;
    report_source("transactions", &transactions.info);

    Ok(Loaded {
        departments,
        transactions,
    })
}

fn report_source(label: &str, info: &SourceInfo) {
    log_success(format!(
        "{}: {} rows from {} ({}, '{}')",
        label,
        info.row_count,
        display_path(&info.path),
        info.encoding,
        info.delimiter
    ));
    log_info_indent(format!("Columns: {}", info.headers.join(", ")), 1);
    if info.skipped_rows > 0 {
        log_warning_indent(format!("{} malformed rows skipped", info.skipped_rows), 1);
    }
}

fn display_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Merge and normalize: the selector-independent part of the pipeline.
///
/// A department table with duplicate codes does not abort the run: the
/// transactions are carried without department data and a warning is
/// recorded, so only the department and region views come out empty.
pub fn prepare(departments: &[DepartmentRecord], transactions: Vec<TransactionRecord>) -> WorkingSet {
    log_info("🔗 Joining transactions with departments...");
    match index_departments(departments) {
        Ok(index) => {
            let loaded_rows = transactions.len();
            let (merged, stats) = merge_indexed(transactions, &index);
            log_success(format!("{} matched, {} without department", stats.matched, stats.unmatched));
            normalize_merged(merged, loaded_rows, Some(stats), Vec::new())
        }
        Err(e) => prepare_without_departments(transactions, format!("Department join skipped: {}", e)),
    }
}

/// Carry transactions through with no department data, recording `reason`
/// as a warning. Department, region and map views come out empty.
pub fn prepare_without_departments(transactions: Vec<TransactionRecord>, reason: String) -> WorkingSet {
    log_warning(&reason);
    let loaded_rows = transactions.len();
    normalize_merged(without_departments(transactions), loaded_rows, None, vec![reason])
}

fn normalize_merged(
    merged: Vec<MergedTransaction>,
    loaded_rows: usize,
    merge_stats: Option<MergeStats>,
    warnings: Vec<String>,
) -> WorkingSet {
    log_info("🧹 Normalizing dates and values...");
    let normalized = normalize(merged);
    log_success(format!("{} rows in working set", normalized.rows.len()));
    if normalized.dropped_rows > 0 {
        log_warning_indent(format!("{} rows dropped (unparseable value)", normalized.dropped_rows), 1);
    }
    if normalized.undated_rows > 0 {
        log_warning_indent(format!("{} rows without a valid date", normalized.undated_rows), 1);
    }

    WorkingSet {
        rows: normalized.rows,
        loaded_rows,
        merge: merge_stats,
        dropped_rows: normalized.dropped_rows,
        undated_rows: normalized.undated_rows,
        warnings,
    }
}

/// Filter and aggregate a working set.
pub fn build_views(working_set: &WorkingSet, selectors: &Selectors, options: &ViewOptions) -> ViewBundle {
    let filtered = apply(&working_set.rows, selectors);
    log_info(format!(
        "🔎 Filters region={} department={} type={}: {} rows",
        selectors.region,
        selectors.department,
        selectors.property_type,
        filtered.len()
    ));

    let mut views = aggregate(&filtered);
    if working_set.merge.is_none() {
        views.mean_by_department = AggregateView::empty("mean_by_department", Statistic::Mean);
        views.mean_by_region = AggregateView::empty("mean_by_region", Statistic::Mean);
    }

    let merge = working_set.merge.unwrap_or_default();
    let counts = RowCounts {
        loaded: working_set.loaded_rows,
        matched: merge.matched,
        unmatched: merge.unmatched,
        dropped: working_set.dropped_rows,
        undated: working_set.undated_rows,
        working_set: working_set.rows.len(),
        filtered: filtered.len(),
    };

    ViewBundle {
        run_id: Uuid::new_v4().to_string(),
        selectors: selectors.clone(),
        scalars: scalars(&filtered),
        views,
        choropleth: choropleth(&filtered),
        preview: filtered.iter().take(options.preview_rows).cloned().collect(),
        counts,
        columns: MERGED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        sources: Vec::new(),
        warnings: working_set.warnings.clone(),
    }
}

/// Run the whole pipeline for one set of selectors.
pub fn render(sources: &DataSources, selectors: &Selectors, options: &ViewOptions) -> PipelineResult<ViewBundle> {
    let loaded = load(sources)?;
    let source_info = loaded.sources();

    let working_set = loaded.into_working_set();
    let mut bundle = build_views(&working_set, selectors, options);
    bundle.sources = source_info;

    log_success(format!("📊 Views ready (run {})", bundle.run_id));
    Ok(bundle)
}

/// Choice lists for the three selectors, derived from the unfiltered data.
pub fn selector_options(sources: &DataSources) -> PipelineResult<SelectorOptions> {
    let working_set = load(sources)?.into_working_set();
    Ok(SelectorOptions::from_rows(&working_set.rows))
}

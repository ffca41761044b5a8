//! # Immo - French real-estate transaction dashboard
//!
//! Immo reads the DVF property-transaction extract and the French department
//! reference table, joins them, and computes the statistics behind an
//! interactive dashboard (price by property type, monthly volume, quarterly
//! trend, department and region comparisons, choropleth map).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  DVF + dept │────▶│   Parser    │────▶│  Transform  │────▶│ ViewBundle  │
//! │ (ISO/UTF8)  │     │  (auto-enc) │     │ (join, agg) │     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use immo::{render, DataSources, Selectors, ViewOptions};
//!
//! let sources = DataSources::new("data/departements-france.csv", "data/ValeursFoncieres-2023.txt");
//! let bundle = render(&sources, &Selectors::default(), &ViewOptions::default())?;
//! println!("{} transactions, mean {:?}", bundle.scalars.row_count, bundle.scalars.mean_value);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Source records and the enriched row
//! - [`parser`] - CSV loading with encoding detection
//! - [`transform`] - Merge, normalize, filter, aggregate, pipeline
//! - [`catalog`] - Department / region reference statistics
//! - [`geo`] - Choropleth values and boundary GeoJSON
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Reference data
pub mod catalog;

// Map
pub mod geo;

pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    GeoError,
    LoadError,
    ParseError,
    PipelineError,
    PipelineResult,
    SchemaError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    DepartmentRecord,
    TransactionRecord,
    MergedTransaction,
    EnrichedTransaction,
    Month,
    Quarter,
    normalize_department_code,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    load_departments,
    load_transactions,
    detect_encoding,
    decode_content,
    SourceInfo,
    Table,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    render,
    selector_options,
    DataSources,
    ViewBundle,
    ViewOptions,
    RowCounts,
};

pub use transform::filter::{Selector, SelectorOptions, Selectors};
pub use transform::aggregate::{Aggregates, Scalars};

// =============================================================================
// Re-exports - Reference data and map
// =============================================================================

pub use catalog::{CatalogSummary, DepartmentCatalog};
pub use geo::{BoundaryClient, ChoroplethPoint};
pub use config::DashboardConfig;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}

//! Error types for the dashboard pipeline.
//!
//! - [`LoadError`] - a source file is missing, unreadable or has no header (fatal)
//! - [`SchemaError`] - expected column absent or join key not unique
//! - [`ParseError`] - a single field could not be coerced (recovered locally)
//! - [`GeoError`] - boundary geometry could not be fetched (non-fatal)
//! - [`ConfigError`] - invalid environment configuration
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while reading a source file into rows.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("Data file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to read the file.
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delimited-text reader gave up on the header.
    #[error("Invalid delimited file '{}': {message}", path.display())]
    Csv { path: PathBuf, message: String },

    /// Empty file.
    #[error("Data file '{}' is empty", .0.display())]
    EmptyFile(PathBuf),

    /// No header row.
    #[error("No header found in '{}'", .0.display())]
    NoHeaders(PathBuf),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// A table does not have the shape the pipeline expects.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    /// Required columns are absent from the header.
    #[error("Missing column(s) in {file}: {}", columns.join(", "))]
    MissingColumns { file: String, columns: Vec<String> },

    /// A key that must be unique appears more than once.
    #[error("Duplicate value '{key}' in key column '{column}'")]
    DuplicateKey { column: String, key: String },
}

// =============================================================================
// Field Parse Errors
// =============================================================================

/// A single field could not be coerced to its typed form.
///
/// Never shown to the user: the normalizer nulls the field or drops the row.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Invalid property value '{0}'")]
    InvalidValue(String),

    #[error("Missing property value")]
    MissingValue,
}

// =============================================================================
// Geography Errors
// =============================================================================

/// Errors from the department boundary service.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Boundary request failed: {0}")]
    Request(String),

    #[error("Boundary service answered HTTP {0}")]
    Status(u16),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while resolving configuration from the environment.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidVar { name: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error returned by [`crate::transform::pipeline::render`].
/// Anything that reaches this type aborts the render cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source file could not be loaded.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// A source file does not match its schema.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema checks.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for field parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for geography operations.
pub type GeoResult<T> = Result<T, GeoError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> PipelineError
        let load_err = LoadError::EmptyFile(PathBuf::from("data/deps.csv"));
        let pipeline_err: PipelineError = load_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // SchemaError -> PipelineError -> ServerError
        let schema_err = SchemaError::MissingColumns {
            file: "transactions".into(),
            columns: vec!["Valeur fonciere".into()],
        };
        let pipeline_err: PipelineError = schema_err.into();
        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("Valeur fonciere"));
    }

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = SchemaError::MissingColumns {
            file: "departments".into(),
            columns: vec!["code_region".into(), "nom_region".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("departments"));
        assert!(msg.contains("code_region, nom_region"));
    }

    #[test]
    fn test_duplicate_key_format() {
        let err = SchemaError::DuplicateKey {
            column: "code_departement".into(),
            key: "75".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'75'"));
        assert!(msg.contains("code_departement"));
    }
}

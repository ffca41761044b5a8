//! Dataset loader: delimited text files to typed tables.
//!
//! Each source file is read whole, decoded (encoding detected with chardet on
//! a leading sample), its header checked against the record's
//! [`TableSchema`], then deserialized row by row with the `csv` crate. Rows
//! that fail to deserialize are skipped and counted, a bad header is fatal.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{LoadError, PipelineResult, SchemaError, SchemaResult};
use crate::models::{DepartmentRecord, TableSchema, TransactionRecord};

/// Bytes inspected by the encoding detector.
const ENCODING_SAMPLE_BYTES: usize = 64 * 1024;

const UTF8_BOM: &str = "\u{feff}";

/// Metadata about a loaded source file.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub skipped_rows: usize,
}

/// A loaded table with its source metadata.
#[derive(Debug, Clone)]
pub struct Table<T> {
    pub rows: Vec<T>,
    pub info: SourceInfo,
}

/// Detect the encoding of raw bytes using chardet.
///
/// Only the first 64 KiB are inspected; DVF extracts run to hundreds of MB.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    let charset = chardet::detect(sample).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding.
///
/// Returns the text and the encoding actually used: content announced as
/// UTF-8 that turns out not to be (the sample was plain ASCII) is decoded as
/// Windows-1252 instead. A leading BOM is removed.
pub fn decode_content(bytes: Vec<u8>, encoding: &str) -> (String, String) {
    let (mut content, used) = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => (
            encoding_rs::ISO_8859_15.decode(&bytes).0.into_owned(),
            "iso-8859-1",
        ),
        "windows-1252" | "cp1252" => (
            encoding_rs::WINDOWS_1252.decode(&bytes).0.into_owned(),
            "windows-1252",
        ),
        _ => match String::from_utf8(bytes) {
            Ok(s) => (s, "utf-8"),
            Err(e) => (
                encoding_rs::WINDOWS_1252.decode(e.as_bytes()).0.into_owned(),
                "windows-1252",
            ),
        },
    };

    if content.starts_with(UTF8_BOM) {
        content.drain(..UTF8_BOM.len());
    }
    (content, used.to_string())
}

/// Check a header row against a schema.
///
/// Every missing column is reported at once.
pub fn validate_headers<T: TableSchema>(headers: &[String]) -> SchemaResult<()> {
    let missing: Vec<String> = T::COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns {
            file: T::NAME.to_string(),
            columns: missing,
        })
    }
}

/// Parse already-read bytes into a typed table.
///
/// `path` is only used for error messages and metadata.
pub fn parse_table<T>(bytes: Vec<u8>, path: &Path) -> PipelineResult<Table<T>>
where
    T: TableSchema + DeserializeOwned,
{
    let encoding = detect_encoding(&bytes);
    let (content, encoding) = decode_content(bytes, &encoding);

    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile(path.to_path_buf()).into());
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(T::DELIMITER)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders(path.to_path_buf()).into());
    }

    validate_headers::<T>(&headers)?;

    let mut rows = Vec::new();
    let mut skipped_rows = 0;
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(_) => skipped_rows += 1,
        }
    }

    let info = SourceInfo {
        path: path.to_path_buf(),
        encoding,
        delimiter: T::DELIMITER as char,
        headers,
        row_count: rows.len(),
        skipped_rows,
    };

    Ok(Table { rows, info })
}

/// Read a file from disk and parse it into a typed table.
pub fn load_table<T>(path: &Path) -> PipelineResult<Table<T>>
where
    T: TableSchema + DeserializeOwned,
{
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()).into());
    }

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_table(bytes, path)
}

/// Load the comma-delimited department reference table.
pub fn load_departments(path: &Path) -> PipelineResult<Table<DepartmentRecord>> {
    load_table(path)
}

/// Load the pipe-delimited DVF transactions table.
pub fn load_transactions(path: &Path) -> PipelineResult<Table<TransactionRecord>> {
    load_table(path)
}

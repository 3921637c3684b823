//! Common error types for the burden pipeline
//!
//! Integrity and mapping errors abort a run. Legitimately missing values are
//! never errors; they travel as `None` through the tables.

use thiserror::Error;

/// Common result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the pipeline crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input or output file could not be opened or created
    #[error("Cannot open {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV read/write error (wraps csv::Error)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Report serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required column is absent from an input table header
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// A cell could not be parsed into its expected type
    #[error("Invalid value '{value}' in {table} column '{column}' (row {row})")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    /// The same tract identifier appears more than once in a keyed table
    #[error("Duplicate tract identifier(s) in {table}: {}", tracts.join(", "))]
    DuplicateTract { table: String, tracts: Vec<String> },

    /// A join produced rows that cannot be explained away
    #[error("Join integrity violated in {join}: {report}")]
    JoinIntegrity { join: String, report: String },

    /// Indicator value outside its expected scale
    #[error(
        "Scale mismatch in column '{column}': {offending_rows} row(s) outside {expected}"
    )]
    ScaleMismatch {
        column: String,
        expected: String,
        offending_rows: usize,
    },

    /// Designation text with no entry in the categorical mapping
    #[error("Unmapped designation value '{value}' ({rows} row(s))")]
    UnmappedDesignation { value: String, rows: usize },

    /// Fewer usable rows than requested clusters
    #[error("Cannot form {k} clusters from {usable_rows} usable tract(s)")]
    ClusteringPrecondition { usable_rows: usize, k: usize },
}

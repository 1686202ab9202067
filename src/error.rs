//! Errors raised while sharing, profiling or padding a table.

/// An error that is local to a single field of a single record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The fixed-point encoded value does not fit into the 64-bit field.
    #[error("'{value}' does not fit into the 64-bit field after fixed-point encoding")]
    EncodingOverflow {
        /// The textual value that was being encoded.
        value: String,
    },
    /// The value does not have the shape its column classification requires.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Why the value was rejected.
        reason: String,
    },
    /// The text contains a character that has no single-byte (Latin-1) representation.
    #[error("character {ch:?} at position {position} is outside of the single-byte range")]
    CharacterRange {
        /// The offending character.
        ch: char,
        /// The character position within the text.
        position: usize,
    },
    /// The value is neither text nor a nested record and its column is not numeric or
    /// passthrough, so no encoding strategy applies.
    #[error("no encoding strategy for a value of type {kind}")]
    UnsupportedValue {
        /// The JSON type of the value.
        kind: &'static str,
    },
    /// A per-party value is not a well-formed `"<hex> <hex>"` share.
    #[error("invalid party share: {reason}")]
    InvalidShare {
        /// Why the share could not be parsed.
        reason: String,
    },
    /// A value is wider than the block width profiled for its column.
    #[error("value of {bytes} bytes does not fit into {blocks} blocks")]
    WidthExceeded {
        /// The byte length of the value.
        bytes: usize,
        /// The number of 16-byte blocks available.
        blocks: usize,
    },
}

/// The error type of this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A single field could not be processed.
    #[error("record {record}, column '{column}': {source}")]
    Field {
        /// The index of the record within its table.
        record: usize,
        /// The column name, as a dotted path for sub-columns of nested records.
        column: String,
        /// What went wrong.
        source: FieldError,
    },
    /// The length profiler was asked to profile a table without records.
    #[error("cannot profile column widths of an empty table")]
    EmptyTable,
    /// The column widths were computed under a different configuration.
    #[error("column widths were computed for schema {expected}, but the configuration is {actual}")]
    SchemaFingerprintMismatch {
        /// The fingerprint stored with the column widths.
        expected: String,
        /// The fingerprint of the active configuration.
        actual: String,
    },
    /// No width is known for a column that needs padding.
    #[error("no column width known for '{column}'")]
    MissingWidth {
        /// The column without a width.
        column: String,
    },
    /// The sharing configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A sharing worker did not complete.
    #[error("sharing worker failed: {0}")]
    Worker(String),
}

impl Error {
    pub(crate) fn field(record: usize, column: impl Into<String>, source: FieldError) -> Self {
        Error::Field {
            record,
            column: column.into(),
            source,
        }
    }
}

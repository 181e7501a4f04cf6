//! Colstripe error types

use thiserror::Error;

/// Result type for [`ColstripeError`]
pub type Result<T, E = ColstripeError> = std::result::Result<T, E>;

/// Errors raised while building a schema catalog. These are always fatal and
/// are never produced at read or write time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A column or node path does not exist in the schema.
    #[error("Path not found in schema: {path}")]
    PathNotFound { path: String },

    /// A node is malformed: missing repetition, a leaf without a physical
    /// type, a group without children, a root which is not a required group,
    /// or a child count which runs past the end of the node list.
    #[error("Invalid schema node '{name}': {reason}")]
    InvalidNode { name: String, reason: String },

    /// A physical type, logical annotation and encoding do not fit together.
    #[error("Unsupported type combination for '{name}': {reason}")]
    UnsupportedTypeCombination { name: String, reason: String },
}

/// Errors raised when a record does not conform to the schema it is shredded
/// against.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShredError {
    /// A required field contained a null value.
    #[error("Required field is null at path: {path}")]
    RequiredFieldIsNull { path: String },

    /// The type of value did not match the expected field type defined in the
    /// schema.
    #[error("Value datatype does not match expected type: {expected} at path: {path}, found: {found}")]
    ValueTypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// A property name found in the struct is not defined in the schema.
    #[error("Struct contains undefined property: {name} at path: {path}")]
    UnknownField { path: String, name: String },

    /// A struct value contained a duplicate property name.
    #[error("Struct contains duplicate property: {name} at path: {path}")]
    DuplicateField { path: String, name: String },

    /// The top-level record was not a struct.
    #[error("Record is not a struct value")]
    InputValueMustBeAStruct,

    /// A numeric value does not fit the physical width of its column.
    #[error("Value {value} is out of range for column at path: {path}")]
    OutOfRange { path: String, value: String },
}

/// Errors raised while decoding a page. A page is the atomic decode unit, so
/// none of these are recoverable locally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// A varint ran past ten bytes or past the end of the buffer.
    #[error("Corrupt varint at byte offset {offset}")]
    CorruptVarint { offset: usize },

    /// The buffer ended before the declared number of values was read.
    #[error("Truncated buffer: needed {needed} more bytes at offset {offset}")]
    TruncatedBuffer { offset: usize, needed: usize },

    /// The encoding is not valid for the physical type, or not implemented.
    #[error("Unsupported encoding {encoding} for {physical_type}")]
    UnsupportedEncoding {
        encoding: String,
        physical_type: String,
    },

    /// Structural inconsistency within an otherwise readable buffer.
    #[error("Invalid encoded data: {0}")]
    InvalidData(String),
}

/// Raised when repetition or definition levels do not agree with the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// A level fell outside `[0, max_level]` for its column, or the column
    /// streams disagree about record boundaries.
    #[error("Corrupt levels in column {path}: {reason}")]
    CorruptLevels { path: String, reason: String },
}

/// Errors from the compression collaborator.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The codec identifier has no registered implementation.
    #[error("Unsupported compression codec: {0}")]
    UnsupportedCodec(String),

    /// The codec failed to compress or decompress a buffer.
    #[error("{codec} failed: {reason}")]
    Failed { codec: String, reason: String },
}

/// Crate level error.
#[derive(Debug, Error)]
pub enum ColstripeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Shred(#[from] ShredError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Storage backend failure, surfaced immediately.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file footer or a page header is not a readable parquet structure.
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// A worker pool could not be created.
    #[error("Worker pool error: {0}")]
    Pool(String),
}

//! Error types for the sbec-core library.
//!
//! Structural IR defects are fatal for the definition being compiled: they are
//! reported through [`Error`] and never degrade into code with wrong offsets.

use crate::ir::Signal;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sbec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all sbec operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read an IR file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a generated artifact
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A generated artifact already exists and overwriting was not requested
    #[error("refusing to overwrite existing file '{path}'")]
    FileExists {
        /// Path of the existing file
        path: PathBuf,
    },

    /// A unit name would escape the output directory
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// The IR document could not be deserialized
    #[error("failed to parse IR: {0}")]
    IrParse(#[from] serde_json::Error),

    /// A token range did not begin with the signal its category requires
    #[error("expected {expected} at token {index} but found {found:?} ('{name}')")]
    UnexpectedSignal {
        /// Human readable description of the expected signal(s)
        expected: &'static str,
        /// Signal that was found instead
        found: Signal,
        /// Name carried by the offending token
        name: String,
        /// Index of the token within the classified range
        index: usize,
    },

    /// A token range is inconsistent with its component counts or offsets
    #[error("malformed token range for '{name}': {details}")]
    MalformedRange {
        /// Name of the construct being classified
        name: String,
        /// Detailed description of the issue
        details: String,
    },

    /// A group header does not have the fixed dimension shape
    #[error("group '{group}' header spans {found} tokens, expected 4 with blockLength and numInGroup")]
    GroupHeader {
        /// Name of the group
        group: String,
        /// Number of tokens spanned by the header
        found: usize,
    },

    /// An enum declares no values
    #[error("no valid values provided for enum '{name}'")]
    EmptyEnum {
        /// Name of the enum
        name: String,
    },

    /// Composite types reference each other in a cycle
    #[error("composite '{name}' is part of a reference cycle")]
    TypeCycle {
        /// Name of a composite on the cycle
        name: String,
    },

    /// A field references a named type that is not known
    #[error("type '{name}' is referenced but never defined")]
    MissingType {
        /// Name of the missing type
        name: String,
    },

    /// A textual constant or var-data member uses an encoding that cannot be expressed
    #[error("unsupported character encoding '{encoding}' on '{name}'")]
    UnsupportedCharacterEncoding {
        /// Name of the member
        name: String,
        /// The declared character encoding
        encoding: String,
    },

    /// A literal value cannot be represented in its primitive type
    #[error("invalid literal '{value}' for {primitive}")]
    InvalidLiteral {
        /// Primitive type name
        primitive: String,
        /// Raw value from the IR
        value: String,
    },

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new malformed range error
    pub fn malformed(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedRange {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Creates a new unsupported character encoding error
    pub fn unsupported_encoding(name: impl Into<String>, encoding: impl Into<String>) -> Self {
        Self::UnsupportedCharacterEncoding {
            name: name.into(),
            encoding: encoding.into(),
        }
    }

    /// Creates a new invalid literal error
    pub fn invalid_literal(primitive: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            primitive: primitive.into(),
            value: value.into(),
        }
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if the error points at a defect in the IR producer
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedSignal { .. }
                | Self::MalformedRange { .. }
                | Self::GroupHeader { .. }
                | Self::EmptyEnum { .. }
                | Self::TypeCycle { .. }
                | Self::MissingType { .. }
        )
    }
}

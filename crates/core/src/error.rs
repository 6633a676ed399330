//! Error types for obia

use thiserror::Error;

/// Main error type for label-map operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Label {label} not found in label map")]
    LabelNotFound { label: String },

    #[error("Could not find attribute named {name} on object {label}")]
    AttributeNotFound { name: String, label: String },

    #[error("Unknown attribute name: {0}")]
    UnknownAttribute(String),

    #[error("Label {0} is the background label and cannot own pixels")]
    BackgroundLabel(String),

    #[error("Pixel ({row}, {col}) is owned by objects {first} and {second}")]
    OverlappingObjects {
        row: usize,
        col: usize,
        first: String,
        second: String,
    },

    #[error("No free label left in the label type range")]
    LabelsExhausted,

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a missing attribute on the object with the given label
    pub fn attribute_not_found(name: &str, label: impl std::fmt::Display) -> Self {
        Error::AttributeNotFound {
            name: name.to_string(),
            label: label.to_string(),
        }
    }

    /// Shorthand for a missing label
    pub fn label_not_found(label: impl std::fmt::Display) -> Self {
        Error::LabelNotFound {
            label: label.to_string(),
        }
    }
}

/// Result type alias for obia operations
pub type Result<T> = std::result::Result<T, Error>;

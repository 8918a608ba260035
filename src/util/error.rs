//! Error types for the material processor.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for material processing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSON document was expected to hold an object at top level
    #[error("Expected a JSON object at top level, found {0}")]
    NotAnObject(String),

    /// Material builder type could not be recognised
    #[error("Couldn't determine material type of '{0}', supported: Arnold, MTLX, Redshift and Principled Shader")]
    UnknownMaterialType(String),

    /// Renderer key is not one of the known renderers
    #[error("Unsupported renderer: {0}")]
    UnsupportedRenderer(String),

    /// Source type is neither VOP nodes nor USD prims
    #[error("Unsupported source type: {0}, supported types are hou_vop_nodes, usd_prims")]
    UnsupportedSourceType(String),

    /// Renderer cannot be produced by the requested recreator
    #[error("Unsupported target renderer: {0}")]
    UnsupportedTarget(String),

    /// No output node was found in the material network
    #[error("No output node detected for {0} material")]
    NoOutputNode(String),

    /// Node not found by name or path
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Prim not found on the stage
    #[error("Prim not found: {0}")]
    PrimNotFound(String),

    /// Invalid prim path
    #[error("Invalid prim path: {0}")]
    InvalidPath(String),

    /// The network contains a connection cycle through the given node
    #[error("Connection cycle detected at node: {0}")]
    Cycle(String),

    /// USDA text could not be parsed
    #[error("USDA parse error at {line}:{column}: {message}")]
    UsdaParse {
        line: usize,
        column: usize,
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid path error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }
}

/// Result type alias for material processing operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NoOutputNode("arnold".into());
        assert!(e.to_string().contains("arnold"));

        let e = Error::UsdaParse { line: 5, column: 3, message: "expected '{'".into() };
        assert!(e.to_string().contains("5:3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}

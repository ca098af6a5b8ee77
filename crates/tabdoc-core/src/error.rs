//! Error types for the tabdoc engine
//!
//! All fallible operations return `Result<T, Error>`.
//! Errors raised while a document line is being handled are wrapped in
//! [`Error::AtLine`] so diagnostics always carry the 1-based line number.

use thiserror::Error;

/// Tabdoc error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Identifier does not match `[A-Za-z0-9_]+` or is reserved
    #[error("Naming rule violated: '{0}' is not a valid name")]
    NamingRule(String),

    /// Datatype token is not recognized
    #[error("Invalid or unsupported datatype '{0}'")]
    InvalidDataType(String),

    /// Inherited datatype token is not recognized
    #[error("Datatype '{0}' does not exist")]
    DataTypeNotFound(String),

    /// Raw token does not fit the requested kind
    #[error("Cannot convert {value} to {kind}")]
    Conversion { kind: String, value: String },

    /// No candidate kind accepted the raw token
    #[error("Autotype conversion failed: no suitable datatype for {0}")]
    AutotypeConversion(String),

    /// Assignment with an empty right-hand side
    #[error("Assignment has an empty value")]
    InvalidValue,

    #[error("Invalid index '{0}'")]
    InvalidIndex(String),

    #[error("Index '{0}' is out of range")]
    IndexOutOfRange(String),

    #[error("Cannot index into a {0} value")]
    InvalidIndexingTarget(String),

    #[error("Multidimensional indexing is not allowed on strings")]
    MultidimensionalIndexingWithString,

    #[error("Interpolation path '{0}' does not exist")]
    InterpolationPathNotFound(String),

    #[error("Variable interpolation of '{0}' is not allowed due to variable visibility")]
    VariableInterpolation(String),

    /// Element limit of a scope is exhausted
    #[error("Adding a new item to '{0}' is not allowed")]
    NotAllowed(String),

    #[error("Path '{0}' does not exist")]
    SetPathNotFound(String),

    #[error("File '{0}' could not be located")]
    FileNotFound(String),

    /// Arithmetic expression could not be evaluated
    #[error("Expression error: {0}")]
    Expression(String),

    #[error("Path '{0}' is already defined")]
    DuplicatePath(String),

    #[error("Edit not applicable: {0}")]
    InvalidEdit(String),

    /// A path is both a leaf and a branch of the materialized tree
    #[error("Path '{0}' conflicts with another element when materializing")]
    MaterializeConflict(String),

    #[error("Import nesting exceeds the maximum depth of {0}")]
    ImportDepth(usize),

    /// Failure inside an imported source
    #[error("Import of '{target}' failed: {source}")]
    Import {
        target: String,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(String),

    /// Document-level failure (empty document, unterminated list)
    #[error("Parse failed: {0}")]
    Failed(String),

    #[error("Line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach a 1-based line number unless one is already attached
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Error::AtLine { .. } => self,
            other => Error::AtLine {
                line,
                source: Box::new(other),
            },
        }
    }

    /// Line number of the failing document line, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::AtLine { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The innermost error, with line and import wrappers removed
    pub fn root(&self) -> &Error {
        match self {
            Error::AtLine { source, .. } | Error::Import { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn conversion(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Error::Conversion {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for tabdoc operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_wraps_once() {
        let err = Error::InvalidValue.at_line(3).at_line(9);
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.root(), &Error::InvalidValue);
    }

    #[test]
    fn test_root_through_import() {
        let err = Error::Import {
            target: "a.tdoc".into(),
            source: Box::new(Error::NamingRule("x y".into()).at_line(2)),
        }
        .at_line(1);
        assert_eq!(err.line(), Some(1));
        assert_eq!(err.root(), &Error::NamingRule("x y".into()));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::NotAllowed("server".into()).to_string(),
            "Adding a new item to 'server' is not allowed"
        );
        assert_eq!(
            Error::InvalidValue.at_line(4).to_string(),
            "Line 4: Assignment has an empty value"
        );
    }
}

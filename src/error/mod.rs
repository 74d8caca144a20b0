use std::fmt;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Entity kinds whose names must be unique or resolvable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Dataset,
    DataIn,
    DataOut,
    Coordinator,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NameKind::Dataset => "dataset",
            NameKind::DataIn => "data-in",
            NameKind::DataOut => "data-out",
            NameKind::Coordinator => "coordinator",
        };
        f.write_str(label)
    }
}

/// The error taxonomy for resolving and submitting job definitions
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        key: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Definition read error: {message}")]
    DefinitionRead {
        code: u16,
        message: String,
        path: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Expression error: {message} [{expression}]")]
    Expression {
        code: u16,
        message: String,
        expression: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Duplicate {kind} name: {name}")]
    DuplicateName {
        code: u16,
        kind: NameKind,
        name: String,
    },

    #[error("[E{code:04}] undefined {kind}: {name}")]
    UndefinedReference {
        code: u16,
        kind: NameKind,
        name: String,
    },

    #[error("[E{code:04}] Persistence error: {message}")]
    Persistence {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Precondition failed: {message}")]
    Precondition { code: u16, message: String },
}

impl SubmitError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            key: None,
            source: None,
        }
    }

    /// A configuration carries a key it must not set
    pub fn disallowed_property(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::Config {
            code: ErrorCode::CONFIG_DISALLOWED_PROPERTY,
            message: format!("Disallowed property [{}]", key),
            key: Some(key),
            source: None,
        }
    }

    /// A required configuration key is absent or empty
    pub fn missing_property(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::Config {
            code: ErrorCode::CONFIG_MISSING_REQUIRED,
            message: format!("Missing required property [{}]", key),
            key: Some(key),
            source: None,
        }
    }

    /// Create a definition read error for a path
    pub fn definition_read(
        code: u16,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self::DefinitionRead {
            code,
            message: message.into(),
            path: Some(path.into()),
            source: None,
        }
    }

    /// Create a validation error with default code
    pub fn validation(message: impl Into<String>) -> Self {
        Self::validation_with_code(ErrorCode::VALIDATION_GENERIC, message, None)
    }

    /// Create a validation error with specific code and field
    pub fn validation_with_code(
        code: u16,
        message: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            field,
            source: None,
        }
    }

    /// An application attribute or tag holds an unacceptable value
    pub fn invalid_attribute(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::Validation {
            code: ErrorCode::VALIDATION_INVALID_ATTRIBUTE,
            message: format!("{}: {}", field, message.into()),
            field: Some(field),
            source: None,
        }
    }

    /// Create an expression error carrying the original expression text
    pub fn expression(code: u16, message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Expression {
            code,
            message: message.into(),
            expression: expression.into(),
            source: None,
        }
    }

    /// Two entities of the same kind share a name
    pub fn duplicate_name(kind: NameKind, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            code: ErrorCode::NAMING_DUPLICATE,
            kind,
            name: name.into(),
        }
    }

    /// A name is referenced but never declared
    pub fn undefined_reference(kind: NameKind, name: impl Into<String>) -> Self {
        Self::UndefinedReference {
            code: ErrorCode::NAMING_UNDEFINED_REFERENCE,
            kind,
            name: name.into(),
        }
    }

    /// Create a persistence error with specific code
    pub fn persistence(code: u16, message: impl Into<String>) -> Self {
        Self::Persistence {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a precondition error with default code
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            code: ErrorCode::PRECONDITION_GENERIC,
            message: message.into(),
        }
    }

    /// Add a source error to this error
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::DefinitionRead { source: src, .. }
            | Self::Validation { source: src, .. }
            | Self::Expression { source: src, .. }
            | Self::Persistence { source: src, .. } => {
                *src = Some(source.into());
            }
            Self::DuplicateName { .. }
            | Self::UndefinedReference { .. }
            | Self::Precondition { .. } => {}
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::DefinitionRead { message, .. }
            | Self::Validation { message, .. }
            | Self::Expression { message, .. }
            | Self::Persistence { message, .. }
            | Self::Precondition { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
            Self::DuplicateName { .. } | Self::UndefinedReference { .. } => {}
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::DefinitionRead { code, .. }
            | Self::Validation { code, .. }
            | Self::Expression { code, .. }
            | Self::DuplicateName { code, .. }
            | Self::UndefinedReference { code, .. }
            | Self::Persistence { code, .. }
            | Self::Precondition { code, .. } => *code,
        }
    }

    /// Short category label, stable across releases
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::DefinitionRead { .. } => "definition-read",
            Self::Validation { .. } => "validation",
            Self::Expression { .. } => "expression",
            Self::DuplicateName { .. } => "duplicate-name",
            Self::UndefinedReference { .. } => "undefined-reference",
            Self::Persistence { .. } => "persistence",
            Self::Precondition { .. } => "precondition",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, key, .. } => match key {
                Some(k) => format!("Configuration problem with '{}': {}", k, message),
                None => format!("Configuration problem: {}", message),
            },
            Self::DefinitionRead { message, path, .. } => match path {
                Some(p) => format!("Could not read definition {}: {}", p, message),
                None => format!("Could not read definition: {}", message),
            },
            Self::Validation { message, .. } => format!("Invalid definition: {}", message),
            Self::Expression {
                message,
                expression,
                ..
            } => format!("Could not evaluate '{}': {}", expression, message),
            Self::DuplicateName { kind, name, .. } => {
                format!("The {} name '{}' is declared more than once", kind, name)
            }
            Self::UndefinedReference { kind, name, .. } => {
                format!("undefined {}: {}", kind, name)
            }
            Self::Persistence { message, .. } => format!("Could not store job: {}", message),
            Self::Precondition { message, .. } => message.clone(),
        }
    }
}

/// Type alias for Results using SubmitError
pub type Result<T> = std::result::Result<T, SubmitError>;

impl From<std::io::Error> for SubmitError {
    fn from(err: std::io::Error) -> Self {
        SubmitError::DefinitionRead {
            code: ErrorCode::DEFINITION_READ_FAILED,
            message: err.to_string(),
            path: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<quick_xml::Error> for SubmitError {
    fn from(err: quick_xml::Error) -> Self {
        SubmitError::validation_with_code(
            ErrorCode::VALIDATION_MALFORMED_XML,
            format!("Malformed XML: {}", err),
            None,
        )
        .with_source(err)
    }
}

impl From<serde_json::Error> for SubmitError {
    fn from(err: serde_json::Error) -> Self {
        SubmitError::persistence(
            ErrorCode::PERSISTENCE_SERIALIZATION,
            "Job record serialization failed",
        )
        .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction_and_codes() {
        let err = SubmitError::config("bad");
        assert_eq!(err.code(), ErrorCode::CONFIG_GENERIC);
        assert_eq!(err.category(), "config");

        let err = SubmitError::disallowed_property("YEAR");
        assert_eq!(err.code(), ErrorCode::CONFIG_DISALLOWED_PROPERTY);
        assert!(err.to_string().contains("[E1002]"));
        assert!(err.to_string().contains("YEAR"));

        let err = SubmitError::duplicate_name(NameKind::DataIn, "X");
        assert_eq!(err.to_string(), "[E5001] Duplicate data-in name: X");

        let err = SubmitError::undefined_reference(NameKind::Dataset, "missing");
        assert_eq!(err.to_string(), "[E5002] undefined dataset: missing");
    }

    #[test]
    fn test_expression_error_keeps_expression_text() {
        let err = SubmitError::expression(
            ErrorCode::EXPRESSION_UNDEFINED_VARIABLE,
            "variable [foo] cannot be resolved",
            "${foo}",
        );
        match &err {
            SubmitError::Expression { expression, .. } => assert_eq!(expression, "${foo}"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.user_message().contains("${foo}"));
    }

    #[test]
    fn test_with_context_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = SubmitError::persistence(ErrorCode::PERSISTENCE_INSERT_FAILED, "insert")
            .with_source(io)
            .with_context("job 42");
        assert!(err.to_string().contains("insert: job 42"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_maps_to_definition_read() {
        let err: SubmitError = std::io::Error::new(std::io::ErrorKind::NotFound, "nope").into();
        assert_eq!(err.code(), ErrorCode::DEFINITION_READ_FAILED);
        assert_eq!(err.category(), "definition-read");
    }

    #[test]
    fn test_describe_error_code() {
        assert_eq!(describe_error_code(5002), "Reference to an undefined name");
        assert_eq!(describe_error_code(9999), "Unknown error code");
    }
}

//! Error types for the conjure CLI.
//!
//! A single enum covers every failure the tool can surface: template
//! lookup and parsing, argument resolution, conversion, context collection,
//! assistant dispatch, plus the ambient configuration and I/O errors.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the conjure CLI.
///
/// All fallible functions return `Result<T, AppError>`. None of these are
/// recovered locally: an error ends the current invocation.
#[derive(Error, Debug)]
pub enum AppError {
    /// No `<command>.xml` in the prompts directory
    #[error("Command definition file not found: {}", path.display())]
    TemplateNotFound { command: String, path: PathBuf },

    /// XML could not be parsed or failed structural validation
    #[error("Malformed template {}: {reason}", path.display())]
    MalformedTemplate { path: PathBuf, reason: String },

    /// A template references a converter outside the registry
    #[error("Unknown converter: {0}")]
    UnknownConverter(String),

    /// A required argument was not supplied and nobody could be asked
    #[error("Missing required argument --{alias} ({question})")]
    MissingArgument { alias: String, question: String },

    /// The command line did not match the template's arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A converter could not compute a value
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// A context path does not exist and the policy forbids skipping it
    #[error("Context file not found: {}", .0.display())]
    MissingContextFile(PathBuf),

    /// The external assistant could not be started or reported failure
    #[error("Assistant error: {0}")]
    Dispatch(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_message() {
        let err = AppError::TemplateNotFound {
            command: "missing".to_string(),
            path: PathBuf::from("prompts/missing.xml"),
        };
        assert_eq!(
            err.to_string(),
            "Command definition file not found: prompts/missing.xml"
        );
    }

    #[test]
    fn test_missing_argument_message() {
        let err = AppError::MissingArgument {
            alias: "class".to_string(),
            question: "Which class?".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required argument --class (Which class?)"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Serialization(_)));
    }
}

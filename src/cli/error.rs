//! CLI-level errors (wraps infrastructure errors)

use std::io::ErrorKind;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { source, .. } if source.kind() == ErrorKind::NotFound => {
                    exitcode::NOINPUT
                }
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Json { .. } => exitcode::DATAERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Config { .. } | ApplicationError::ConfigNotFound(_) => {
                        exitcode::CONFIG
                    }
                    ApplicationError::Domain(_) => exitcode::DATAERR,
                    ApplicationError::UnknownRoot { .. } => exitcode::USAGE,
                    ApplicationError::OperationFailed { .. } => exitcode::SOFTWARE,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_missing_file_when_mapping_exit_code_then_noinput() {
        let err = CliError::from(InfraError::io(
            "read document",
            std::io::Error::new(ErrorKind::NotFound, "gone"),
        ));
        assert_eq!(err.exit_code(), exitcode::NOINPUT);
    }

    #[test]
    fn given_domain_error_when_mapping_exit_code_then_dataerr() {
        let err = CliError::from(InfraError::from(DomainError::EmptyDocument));
        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }
}

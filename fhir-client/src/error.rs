use crate::outcome::OperationOutcome;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FhirError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote error: HTTP {status}{}", outcome_suffix(.outcome))]
    Remote {
        status: u16,
        outcome: Option<OperationOutcome>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn outcome_suffix(outcome: &Option<OperationOutcome>) -> String {
    match outcome {
        Some(outcome) => format!(" ({})", outcome.summary()),
        None => String::new(),
    }
}

impl FhirError {
    /// HTTP status, for remote errors
    pub fn status(&self) -> Option<u16> {
        match self {
            FhirError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FhirError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FhirError::Timeout(err.to_string())
        } else if err.is_decode() {
            FhirError::InvalidResponse(err.to_string())
        } else {
            FhirError::Transport(err.to_string())
        }
    }
}

pub type FhirResult<T> = Result<T, FhirError>;

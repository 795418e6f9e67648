use data_quality::RubricError;
use fhir_client::FhirError;
use thiserror::Error;

/// Start-up failures. Any of these stops the process.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("FHIR configuration error: {0}")]
    Fhir(#[from] FhirError),

    #[error("Rubric error: {0}")]
    Rubric(#[from] RubricError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

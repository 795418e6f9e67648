use thiserror::Error;

#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Invalid rubric: {0}")]
    Invalid(String),

    #[error("Failed to read rubric file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rubric: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub type RubricResult<T> = Result<T, RubricError>;

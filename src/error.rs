use thiserror::Error;

/// Main error type for Stackmark operations
#[derive(Error, Debug)]
pub enum StackmarkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid symbol manifest {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid type name: {0}")]
    TypeName(String),

    #[error("Malformed exception message record: {0:?}")]
    MalformedExceptionMessage(String),
}

pub type Result<T> = std::result::Result<T, StackmarkError>;

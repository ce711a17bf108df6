/// Domain-level errors shared by every crate in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// User-supplied input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operator-supplied configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("invalid precheck request: {0}")]
    Validation(String),

    #[error("{capability} capability failed: {message}")]
    Capability {
        capability: &'static str,
        message: String,
    },

    #[error("precheck processing failed: {0}")]
    Processing(String),
}

impl PrecheckError {
    pub fn capability(capability: &'static str, err: anyhow::Error) -> Self {
        Self::Capability {
            capability,
            message: format!("{err:#}"),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("state error: {0}")]
    State(#[from] state::StateError),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

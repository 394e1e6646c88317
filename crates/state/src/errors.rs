use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// Startup-time misconfiguration, e.g. a duplicate key registration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A required scope id was missing or unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The backing store rejected a read or write. Not retried here.
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// Persisted JSON did not match the expected shape. Absence of a value
    /// is not an error; it decodes to the key's declared default.
    #[error("deserialization failure: {0}")]
    Deserialization(String),
    /// The underlying channel is gone; no further values will arrive.
    #[error("state channel closed: {0}")]
    Closed(String),
}

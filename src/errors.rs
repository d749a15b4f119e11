/// Errors raised while constructing an adapter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The value handed to the factory cannot be called
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AdapterError {
    pub(crate) fn not_a_function() -> Self {
        AdapterError::InvalidArgument("Parameter must be a function.".to_string())
    }
}

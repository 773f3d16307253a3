use thiserror::Error;

/// Errors raised while constructing a point set or one of the spatial indices. All of them are raised
/// synchronously at construction time, so a failed constructor never leaves a partially built structure behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Zero points were supplied
    #[error("point set must contain at least one point")]
    EmptyInput,

    /// A configuration value is out of its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A coordinate of the point at `index` is NaN or infinite
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
}

impl Error {
    /// Shorthand for building an `InvalidConfig` error from a message
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for gridtree operations
pub type Result<T> = std::result::Result<T, Error>;

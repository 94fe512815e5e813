use thiserror::Error;

/// Failures raised by the training engine. None of them are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    Shape {
        context: &'static str,
        expected: String,
        found: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl NetworkError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl std::fmt::Debug,
        found: impl std::fmt::Debug,
    ) -> Self {
        NetworkError::Shape {
            context,
            expected: format!("{:?}", expected),
            found: format!("{:?}", found),
        }
    }

    /// Same as [`NetworkError::shape`] for an expectation written out in words.
    pub(crate) fn shape_expecting(
        context: &'static str,
        expected: &str,
        found: impl std::fmt::Debug,
    ) -> Self {
        NetworkError::Shape {
            context,
            expected: expected.to_string(),
            found: format!("{:?}", found),
        }
    }

    pub fn is_shape(&self) -> bool {
        matches!(self, NetworkError::Shape { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, NetworkError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;

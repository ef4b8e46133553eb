use thiserror::Error;

pub type Result<T, E = MealError> = std::result::Result<T, E>;

/// Failures surfaced by the store and service layers.
///
/// Callers map `Validation` to a bad request, `NotFound` to a missing
/// resource, and everything else to an internal failure.
#[derive(Debug, Error)]
pub enum MealError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("failed to access storage unit '{unit}'")]
    Storage {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data in storage unit '{unit}'")]
    Malformed {
        unit: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MealError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

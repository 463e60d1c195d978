use thiserror::Error;

/// Errors surfaced by the taxonomy core.
///
/// Store lookups that find nothing are not errors; they come back as `None` or an
/// empty list. `NotFound` is reserved for operations that need a record to exist.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{op} failed: {source:#}")]
    Persistence {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl TaxonomyError {
    pub fn persistence(op: &'static str, source: anyhow::Error) -> Self {
        TaxonomyError::Persistence { op, source }
    }

    /// `map_err` adapter wrapping a store failure with the operation name
    pub fn wrap(op: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| TaxonomyError::Persistence { op, source }
    }
}

pub type TaxonomyResult<T> = std::result::Result<T, TaxonomyError>;

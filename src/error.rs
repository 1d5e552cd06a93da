use thiserror::Error;

/// Everything that can go wrong while mapping or persisting an entity.
#[derive(Debug, Error)]
pub enum Error {
    /// The entity declaration is missing or has an invalid table binding, identity field or
    /// column binding. This is a programming mistake, not a transient condition.
    #[error("invalid entity configuration: {0}")]
    Configuration(String),

    /// A column-bound field has a type without a relational counterpart.
    #[error("unsupported column type `{type_name}`")]
    UnsupportedType { type_name: String },

    /// A single-row lookup matched nothing.
    #[error("no row in `{table}` matched {criteria}")]
    NotFound { table: String, criteria: String },

    /// A returned row could not be turned back into the requested entity.
    #[error("failed to reconstruct entity: {0}")]
    Reconstruction(String),

    /// Errors surfaced unchanged from the database driver.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

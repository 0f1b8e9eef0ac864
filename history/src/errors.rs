use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or the statement failed. Retried next cycle.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Insert hit the unique constraint on `url`.
    #[error("product already exists: {url}")]
    Duplicate { url: String },

    /// A persisted row could not be mapped back into a product.
    #[error("corrupt product record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Unavailable errors are expected to clear on their own; anything else
    /// points at a bug or bad data.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                url: db.message().to_string(),
            },
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => StoreError::Corrupt(e.to_string()),
            _ => StoreError::Unavailable(e.to_string()),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not apply database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Database query error: {0}")]
    QueryError(String),
    #[error("Cannot store duplicate order {0}")]
    DuplicateOrder(String),
    #[error("Cannot store duplicate payment for transaction {0}")]
    DuplicatePayment(String),
}

impl SqliteDatabaseError {
    /// Maps unique-constraint violations onto `duplicate`, and everything else onto a driver error.
    pub(crate) fn or_duplicate(e: sqlx::Error, duplicate: impl FnOnce() -> Self) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => duplicate(),
            _ => Self::DriverError(e),
        }
    }
}

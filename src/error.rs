//! Error types of the reservation core.

/// Failure of the storage layer underneath the ledger.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An event lock could not be taken within the lock timeout, or the
    /// database aborted the transaction as a serialization failure or
    /// deadlock. Transient; the whole validate-then-commit unit is retried.
    #[error("inventory lock contention")]
    Contention,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

// SQLSTATE: lock_not_available, serialization_failure, deadlock_detected
const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(code) = db.code() {
                if matches!(
                    code.as_ref(),
                    LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED
                ) {
                    return StoreError::Contention;
                }
            }
        }
        StoreError::Database(err)
    }
}

/// Error returned by reservation operations.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    /// Malformed input, e.g. a non-positive ticket count.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The named entity (`"event"`, `"customer"` or `"order"`) does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(&'static str),

    /// Admission control rejected the order, or contention outlasted the
    /// retry budget.
    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ReservationError {
    pub fn is_contention(&self) -> bool {
        matches!(self, ReservationError::Storage(StoreError::Contention))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::InvalidArgument(_) => "invalid_argument",
            ReservationError::NotFound(_) => "not_found",
            ReservationError::InvalidState(_) => "invalid_state",
            ReservationError::Conflict(_) => "conflict",
            ReservationError::Storage(_) => "storage",
        }
    }
}

impl From<validator::ValidationErrors> for ReservationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ReservationError::InvalidArgument(errors.to_string())
    }
}

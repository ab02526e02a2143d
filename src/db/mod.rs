pub mod initialize;
pub mod ledger;
pub mod log;
pub mod migrate;
pub mod pool;
pub mod roster;

pub use ledger::SqliteLedger;
pub use roster::SqliteRoster;

use crate::errors::AppError;
use rusqlite::ErrorCode;

/// Lift a SQLite error into the application taxonomy: lock contention
/// becomes a retryable `TransientFailure`.
pub fn classify(err: rusqlite::Error) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            AppError::TransientFailure(err.to_string())
        }
        _ => AppError::Db(err),
    }
}

/// Wrap a parse failure inside a row mapper.
pub(crate) fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

use thiserror::Error;

/// Errors surfaced by the persistence layer, one level below
/// [`crate::common::EngineError`].
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrent writer beat us")]
    Conflict,

    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound(what.into())
    }
}

/// Postgres reports a retryable write conflict (spec §7 `Conflict`) via
/// SQLSTATE `40001` (serialization_failure) or `40P01`
/// (deadlock_detected); every other database error is terminal.
fn is_retryable(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().and_then(|e| e.code()).as_deref(),
        Some("40001") | Some("40P01")
    )
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_retryable(&err) {
            StoreError::Conflict
        } else {
            StoreError::Database(err)
        }
    }
}

/// Maps a `fetch_one`/`fetch_optional`-style [`sqlx::Error`] into a
/// [`StoreError`], treating "no rows" as [`StoreError::NotFound`].
pub fn map_fetch_error(what: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |err| match err {
        sqlx::Error::RowNotFound => StoreError::not_found(what),
        other => StoreError::Database(other),
    }
}

use core::fmt::{self, Display};
use tokio_postgres::error::SqlState;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The input violates a table constraint.
    BadInput,
    /// No record matches the given ID.
    NotFound,
    /// Unrecoverable error.
    Fatal,
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db) = err.as_db_error() {
            if *db.code() == SqlState::CHECK_VIOLATION && db.constraint() == Some("questions_content_check") {
                return Self::BadInput;
            }
        }
        log::error!("database failure: {err}");
        Self::Fatal
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BadInput => "Unacceptable input.",
            Self::NotFound => "Question not found.",
            Self::Fatal => "We encountered an unexpected database error on our end.",
        })
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

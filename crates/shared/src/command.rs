use strum::{AsRefStr, Display};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden")]
    Forbidden,

    #[error("rule {0} not found")]
    RuleNotFound(String),

    #[error("rule {0} is not active for this member")]
    RuleInactive(String),

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("a reason is required")]
    MissingReason,

    #[error("debit of {amount} would leave balance {balance} below zero")]
    ResultingBalanceNegative { balance: i64, amount: i64 },

    #[error("entry of {amount} would leave balance {balance} below zero")]
    NegativeBalance { balance: i64, amount: i64 },

    #[error("concurrent update, retries exhausted")]
    Conflict,

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{0}")]
    Server(String),

    #[error("{0}")]
    Unknown(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable error classification exposed to callers as `errorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Forbidden,
    RuleViolation,
    InsufficientPoints,
    OutOfStock,
    Conflict,
    NegativeBalance,
    StoreUnavailable,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validate(_)
            | Error::Validation(_)
            | Error::InvalidAmount
            | Error::MissingReason => ErrorKind::ValidationError,
            Error::NotFound(_) | Error::RuleNotFound(_) => ErrorKind::NotFound,
            Error::Forbidden => ErrorKind::Forbidden,
            Error::RuleInactive(_) => ErrorKind::RuleViolation,
            Error::ResultingBalanceNegative { .. } => ErrorKind::InsufficientPoints,
            Error::NegativeBalance { .. } => ErrorKind::NegativeBalance,
            Error::Conflict => ErrorKind::Conflict,
            Error::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Error::Server(_) | Error::Unknown(_) => ErrorKind::Internal,
        }
    }

    /// Whether a transaction attempt that failed with this error may run again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict | Error::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::StoreUnavailable(value.to_string())
            }
            sqlx::Error::Database(db) if is_busy_code(db.code().as_deref()) => {
                Self::StoreUnavailable(value.to_string())
            }
            _ => Self::Unknown(value.into()),
        }
    }
}

// SQLITE_BUSY (5), SQLITE_LOCKED (6) and their extended codes.
fn is_busy_code(code: Option<&str>) -> bool {
    let Some(code) = code.and_then(|c| c.parse::<i32>().ok()) else {
        return false;
    };

    matches!(code & 0xff, 5 | 6)
}

impl From<time::error::ComponentRange> for Error {
    fn from(value: time::error::ComponentRange) -> Self {
        Self::Unknown(value.into())
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(value: std::time::SystemTimeError) -> Self {
        Self::Unknown(value.into())
    }
}

#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::Error::Server(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::Error::Server(format!($err)))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::Server(format!($fmt, $($arg)*)))
    };
}

#[macro_export]
macro_rules! not_found {
    ($what:literal $(,)?) => {
        return Err($crate::Error::NotFound($what.to_owned()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::NotFound(format!($fmt, $($arg)*)))
    };
}

#[macro_export]
macro_rules! invalid {
    ($msg:literal $(,)?) => {
        return Err($crate::Error::Validation($msg.to_owned()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::Error::Validation(format!($fmt, $($arg)*)))
    };
}

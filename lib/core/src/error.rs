use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of status codes shared by the engine and the C ABI.
///
/// The numeric values are part of the wire contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    Ok = 0,
    NotFound = 1,
    AlreadyExists = 2,
    InvalidArgument = 3,
    NotSupported = 4,
    InternalError = 5,
    PermissionDenied = 6,
    FailedPrecondition = 7,
    Unknown = 8,
}

impl StatusCode {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            0 => StatusCode::Ok,
            1 => StatusCode::NotFound,
            2 => StatusCode::AlreadyExists,
            3 => StatusCode::InvalidArgument,
            4 => StatusCode::NotSupported,
            5 => StatusCode::InternalError,
            6 => StatusCode::PermissionDenied,
            7 => StatusCode::FailedPrecondition,
            8 => StatusCode::Unknown,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::NotSupported => "NOT_SUPPORTED",
            StatusCode::InternalError => "INTERNAL_ERROR",
            StatusCode::PermissionDenied => "PERMISSION_DENIED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
            StatusCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine error. Each variant maps to exactly one non-OK [`StatusCode`] and
/// carries the human readable message that crosses the boundary unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotSupported(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("{0}")]
    Unknown(String),
}

impl Error {
    pub fn code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NotFound,
            Error::AlreadyExists(_) => StatusCode::AlreadyExists,
            Error::InvalidArgument(_) => StatusCode::InvalidArgument,
            Error::NotSupported(_) => StatusCode::NotSupported,
            Error::Internal(_) => StatusCode::InternalError,
            Error::PermissionDenied(_) => StatusCode::PermissionDenied,
            Error::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            Error::Unknown(_) => StatusCode::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::NotFound(m)
            | Error::AlreadyExists(m)
            | Error::InvalidArgument(m)
            | Error::NotSupported(m)
            | Error::Internal(m)
            | Error::PermissionDenied(m)
            | Error::FailedPrecondition(m)
            | Error::Unknown(m) => m,
        }
    }

    /// Build an error from a raw code. `Ok` has no error form and maps to `Unknown`.
    pub fn from_code(code: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            StatusCode::NotFound => Error::NotFound(message),
            StatusCode::AlreadyExists => Error::AlreadyExists(message),
            StatusCode::InvalidArgument => Error::InvalidArgument(message),
            StatusCode::NotSupported => Error::NotSupported(message),
            StatusCode::InternalError => Error::Internal(message),
            StatusCode::PermissionDenied => Error::PermissionDenied(message),
            StatusCode::FailedPrecondition => Error::FailedPrecondition(message),
            StatusCode::Ok | StatusCode::Unknown => Error::Unknown(message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => Error::AlreadyExists(err.to_string()),
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(err.to_string()),
            _ => Error::Internal(format!("IO error: {}", err)),
        }
    }
}

use thiserror::Error;

use crate::schedule::ValidationError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{message}")]
    Read {
        message: String,
        exception_code: Option<u8>,
    },
    #[error("{message}")]
    Write {
        message: String,
        exception_code: Option<u8>,
    },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("slave busy")]
    SlaveBusy,
    #[error("slave failure")]
    SlaveFailure,
    #[error(transparent)]
    ScheduleValidation(#[from] ValidationError),
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
            exception_code: None,
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
            exception_code: None,
        }
    }

    /// True for the faults a device reports while it is temporarily unable to serve a request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SlaveBusy | Self::SlaveFailure)
    }
}

/// Creates an anyhow error prefixed with the current file and line number
#[macro_export]
macro_rules! file_error {
    ($($arg:tt)*) => {
        anyhow::anyhow!(
            "[{}:{}] {}",
            std::path::Path::new(file!())
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            line!(),
            format!($($arg)*)
        )
    };
}

/// Errors surfaced by the HAL core.
///
/// The camera framework speaks negative errno, so every variant maps onto
/// one via [`Error::errno`]. Internal layers (metadata registry, V4L2
/// wrapper) never recover on their own; they report and let the pipeline
/// decide.
///
/// # Example
/// ```rust
/// use iris_core::prelude::Error;
///
/// let err = Error::Busy("camera 0 already open".into());
/// assert_eq!(err.errno(), -libc::EBUSY);
/// assert_eq!(err.code(), "busy");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("busy: {0}")]
    Busy(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no device: {0}")]
    NoDevice(String),
    #[error("i/o error: {0}")]
    Io(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Stable string code for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Busy(_) => "busy",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NoDevice(_) => "no_device",
            Error::Io(_) => "io_error",
            Error::Timeout(_) => "timeout",
            Error::NotSupported(_) => "not_supported",
        }
    }

    /// Negative errno understood by the framework boundary.
    pub fn errno(&self) -> i32 {
        match self {
            Error::Busy(_) => -libc::EBUSY,
            Error::InvalidArgument(_) => -libc::EINVAL,
            Error::NoDevice(_) => -libc::ENODEV,
            Error::Io(_) => -libc::EIO,
            Error::Timeout(_) => -libc::ETIME,
            Error::NotSupported(_) => -libc::ENOSYS,
        }
    }

    /// Whether this error condemns the whole device rather than one request.
    pub fn is_device_fatal(&self) -> bool {
        matches!(self, Error::NoDevice(_) | Error::Io(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping_is_negative() {
        let cases = [
            (Error::Busy("x".into()), -libc::EBUSY),
            (Error::InvalidArgument("x".into()), -libc::EINVAL),
            (Error::NoDevice("x".into()), -libc::ENODEV),
            (Error::Io("x".into()), -libc::EIO),
            (Error::Timeout("x".into()), -libc::ETIME),
            (Error::NotSupported("x".into()), -libc::ENOSYS),
        ];
        for (err, expected) in cases {
            assert_eq!(err.errno(), expected, "{}", err.code());
        }
    }

    #[test]
    fn device_fatal_classification() {
        assert!(Error::NoDevice("gone".into()).is_device_fatal());
        assert!(!Error::Timeout("fence".into()).is_device_fatal());
    }
}

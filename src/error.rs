//! Error types for raw socket I/O, distinguishing send-request validation,
//! per-request transmission failures, receive failures, and fatal socket
//! conditions.

use std::{error, fmt, io, result};

/// Creates an [`io::Error`] with a custom message prefixed to the current
/// `errno` value.
macro_rules! errno {
    ($($arg:tt)+) => {{
        let errno = ::std::io::Error::last_os_error();
        let prefix = format!($($arg)+);
        let msg = format!("{prefix}: {errno}");
        ::std::io::Error::new(errno.kind(), msg)
    }};
}
pub(crate) use errno;

/// A convenience wrapper around `Result` for [crate::Error].
pub type Result<T> = result::Result<T, Error>;

/// Represents errors that can occur during raw socket I/O.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// A send request was rejected before being queued.
    ///
    /// Delivered synchronously through the failing request's completion.
    /// Socket state is left untouched.
    Validation(ValidationError),
    /// The OS rejected the send of a dequeued request.
    ///
    /// Delivered through that request's completion only. The socket remains
    /// open and later requests are unaffected.
    Transmission(io::Error),
    /// The OS receive failed.
    ///
    /// Reported as a socket-level event. The socket remains open.
    Receive(io::Error),
    /// The readiness layer reported an error condition on the socket.
    ///
    /// Reported as a socket-level event, after which the socket is closed
    /// unconditionally.
    Fatal(io::Error),
    /// The socket was already closed when the operation was attempted.
    Closed,
    /// Any other I/O error (opening the socket, readiness subscription
    /// updates, socket option plumbing).
    Io(io::Error),
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Validation(ref e) => fmt::Display::fmt(e, f),
            Error::Transmission(ref e) => write!(f, "send failed: {e}"),
            Error::Receive(ref e) => write!(f, "receive failed: {e}"),
            Error::Fatal(ref e) => write!(f, "socket error: {e}"),
            Error::Closed => write!(f, "socket is closed"),
            Error::Io(ref e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Represents errors detected while validating a send request.
#[derive(Debug)]
pub enum ValidationError {
    /// The requested send range does not fit within the provided buffer.
    BufferBounds {
        /// The length of the buffer provided.
        buffer_len: usize,
        /// The offset into the buffer at which the payload starts.
        offset: usize,
        /// The number of payload bytes requested.
        length: usize,
    },
    /// The destination is not a valid IPv4 or IPv6 address literal.
    InvalidAddress(String),
}

impl error::Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ValidationError::BufferBounds {
                buffer_len,
                offset,
                length,
            } => {
                write!(
                    f,
                    "invalid send range: offset {offset} + length {length} (exceeds buffer length {buffer_len} bytes)"
                )
            }
            ValidationError::InvalidAddress(ref addr) => {
                write!(
                    f,
                    "invalid destination address: {addr} (not an IPv4 or IPv6 literal)"
                )
            }
        }
    }
}

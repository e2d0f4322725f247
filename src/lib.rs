//! Raw IP socket library in user-space, with queued sends, readiness-driven
//! flow control, and RFC 1071 checksums.
//!
//! [Socket] wraps a non-blocking OS raw socket: send requests queue up and
//! drain one per send-ready signal, each completing through its own
//! callback, while received packets and socket-level failures surface as
//! [Event]s. Both directions can be paused and resumed independently.
//!
//! Requires the `CAP_NET_RAW` capability to open a socket.

#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

#[cfg(not(target_os = "linux"))]
compile_error!(
    "This crate is only compatible with Linux systems that support raw sockets and the epoll interface."
);

pub mod log;

pub mod checksum;
pub mod consts;
pub mod socket;
pub mod sys;

mod queue;

pub mod error;
pub use error::{Error, Result, ValidationError};

pub use consts::{AddressFamily, Protocol, SocketLevel, SocketOption};
pub use socket::{AfterSend, BeforeSend, Event, Options, Socket};

//! OS raw socket capability layer.
//!
//! The scheduler consumes the OS through the narrow [RawSocket] interface;
//! [SysSocket] is the `libc`-backed implementation over `epoll` readiness.
//! Tests drive the scheduler with a scripted implementation instead, so
//! they require no `CAP_NET_RAW` privilege.

mod socket;

pub use socket::SysSocket;

use std::io;
use std::net::IpAddr;
use std::time::Duration;

/// One readiness report from the OS layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    /// The socket has data to receive.
    pub readable: bool,
    /// The socket can accept a send.
    pub writable: bool,
    /// The OS reported an error condition on the socket.
    pub error: bool,
}

/// Narrow capability interface over a non-blocking OS raw socket.
///
/// Everything the scheduler needs from the OS: one-shot sends and receives,
/// socket option pass-through, a combined readiness subscription, and a way
/// to wait for the next readiness report. All methods are expected to be
/// called from a single logical control thread.
pub trait RawSocket {
    /// Sends `buf` to `dst`, returning the number of bytes accepted by the
    /// OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the packet.
    fn send_to(&mut self, buf: &[u8], dst: IpAddr) -> io::Result<usize>;

    /// Receives a single packet into `buf`, returning the byte count and the
    /// source address.
    ///
    /// # Errors
    ///
    /// Returns an error if the receive fails.
    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)>;

    /// Sets a socket option, passing `value` through unmodified.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the option.
    fn set_option(
        &mut self,
        level: libc::c_int,
        option: libc::c_int,
        value: &[u8],
    ) -> io::Result<()>;

    /// Reads a socket option into `value`, returning the number of bytes the
    /// OS wrote.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the option.
    fn get_option(
        &mut self,
        level: libc::c_int,
        option: libc::c_int,
        value: &mut [u8],
    ) -> io::Result<usize>;

    /// Replaces the readiness subscription with the given combined pair.
    ///
    /// # Notes
    ///
    /// Always called with both axes at once; the subscription is never
    /// updated incrementally.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription could not be updated.
    fn set_interest(&mut self, want_recv: bool, want_send: bool) -> io::Result<()>;

    /// Waits for the next readiness report.
    ///
    /// A timeout of `None` blocks until a report arrives. An empty report
    /// may be returned when the wait times out or is interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait itself fails.
    fn poll_ready(&mut self, timeout: Option<Duration>) -> io::Result<Readiness>;

    /// Returns the pending OS error after a readiness report with the
    /// `error` flag set.
    fn take_error(&mut self) -> io::Error;

    /// Releases the OS socket. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the underlying resources failed.
    fn close(&mut self) -> io::Result<()>;
}

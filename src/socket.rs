//! Raw socket I/O scheduler.
//!
//! [Socket] owns an OS raw socket capability and schedules all I/O over it:
//! outbound sends wait in a FIFO queue and drain one per send-ready signal,
//! inbound packets are received one per recv-ready signal into a reusable
//! buffer, and flow control on both axes is driven by pausing and resuming
//! the readiness subscription.

use std::collections::VecDeque;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::consts::{AddressFamily, Protocol, SocketLevel, SocketOption};
use crate::queue::{SendQueue, SendRequest};
use crate::sys::{RawSocket, SysSocket};
use crate::{Error, Result, ValidationError};
use crate::{debug, error, warn};

/// Hook run synchronously right before a request's OS send.
///
/// Receives the socket so it can apply last-moment per-packet configuration,
/// such as setting the TTL for the one packet about to go out.
pub type BeforeSend<T> = Box<dyn FnOnce(&mut Socket<T>)>;

/// Completion invoked synchronously with the outcome of a request's OS
/// send: the number of bytes the OS accepted, or the error that ended the
/// attempt.
pub type AfterSend<T> = Box<dyn FnOnce(&mut Socket<T>, Result<usize>)>;

/// Construction options for a [Socket].
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Size in bytes of the reusable receive buffer. Defaults to 4096.
    pub buffer_size: usize,
    /// Address family of the underlying socket. Defaults to IPv4.
    pub address_family: AddressFamily,
    /// Protocol number passed through to the OS socket. Defaults to
    /// [Protocol::None].
    pub protocol: Protocol,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            address_family: AddressFamily::Ipv4,
            protocol: Protocol::None,
        }
    }
}

/// Notification queued for the caller.
///
/// The scheduler pushes events while handling readiness signals; the caller
/// drains them with [Socket::next_event] and dispatches as it sees fit.
#[derive(Debug)]
pub enum Event {
    /// A packet arrived.
    Message {
        /// The received bytes, trimmed to the actual byte count. A copy;
        /// never aliases the socket's reusable receive buffer.
        buffer: Vec<u8>,
        /// Source address of the packet.
        source: IpAddr,
    },
    /// A receive failure ([Error::Receive], socket stays open) or an OS
    /// error condition ([Error::Fatal], socket is closed right after).
    Error(Error),
    /// The socket was closed. Terminal: pushed exactly once, nothing
    /// follows it.
    Closed,
}

/// Raw socket I/O scheduler.
///
/// All state transitions happen either in a caller-invoked method or while
/// handling a readiness report inside [poll]; the type is single-threaded
/// and performs no locking.
///
/// A new socket starts with receiving unpaused and sending paused. The
/// first queued send resumes the send axis, and the scheduler pauses it
/// again once a send-ready signal finds the queue empty.
///
/// [poll]: Socket::poll
pub struct Socket<T = SysSocket> {
    sys: T,
    queue: SendQueue<T>,
    recv_buf: Vec<u8>,
    recv_paused: bool,
    send_paused: bool,
    closed: bool,
    events: VecDeque<Event>,
}

impl Socket<SysSocket> {
    /// Opens an OS raw socket and wires a scheduler around it.
    ///
    /// # Notes
    ///
    /// Requires the `CAP_NET_RAW` capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS socket could not be opened or the initial
    /// readiness subscription could not be set.
    pub fn open(options: Options) -> Result<Self> {
        let sys = SysSocket::open(options.address_family, options.protocol)?;

        Self::with_sys(sys, options)
    }
}

impl<T: RawSocket> Socket<T> {
    /// Wires a scheduler around an already-open capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial readiness subscription could not be
    /// set.
    pub fn with_sys(sys: T, options: Options) -> Result<Self> {
        let mut socket = Self {
            sys,
            queue: SendQueue::new(),
            recv_buf: vec![0u8; options.buffer_size],
            recv_paused: false,
            send_paused: true,
            closed: false,
            events: VecDeque::new(),
        };

        // Receiving starts unpaused; sending stays paused until the first
        // request is queued.
        socket.update_interest()?;

        Ok(socket)
    }

    /// Queues a packet for sending to `destination`, an IPv4 or IPv6
    /// address literal.
    ///
    /// The payload is `buffer[offset..offset + length]`. Requests drain in
    /// FIFO order, one OS send per send-ready signal, and each request's
    /// `after` completion runs with the outcome of its own send. If a
    /// `before` hook is supplied it runs right before this request's OS
    /// send.
    ///
    /// Validation failures (send range out of bounds, malformed
    /// destination) complete `after` synchronously with
    /// [Error::Validation] and leave the queue untouched; this is the only
    /// path on which the completion runs before `send` returns. A send on a
    /// closed socket completes synchronously with [Error::Closed].
    ///
    /// # Errors
    ///
    /// Returns an error only if resuming the send readiness subscription
    /// fails.
    pub fn send(
        &mut self,
        buffer: Vec<u8>,
        offset: usize,
        length: usize,
        destination: &str,
        before: Option<BeforeSend<T>>,
        after: AfterSend<T>,
    ) -> Result<&mut Self> {
        if self.closed {
            after(self, Err(Error::Closed));
            return Ok(self);
        }

        let in_bounds = offset
            .checked_add(length)
            .is_some_and(|end| end <= buffer.len());

        if !in_bounds {
            after(
                self,
                Err(Error::Validation(ValidationError::BufferBounds {
                    buffer_len: buffer.len(),
                    offset,
                    length,
                })),
            );
            return Ok(self);
        }

        let destination: IpAddr = match destination.parse() {
            Ok(addr) => addr,
            Err(_) => {
                after(
                    self,
                    Err(Error::Validation(ValidationError::InvalidAddress(
                        destination.to_string(),
                    ))),
                );
                return Ok(self);
            }
        };

        self.queue.push(SendRequest {
            buffer,
            offset,
            length,
            destination,
            before,
            after,
        });

        if self.send_paused {
            debug!("send request queued, resuming send readiness");
            self.resume_send()?;
        }

        Ok(self)
    }

    /// Pauses send-ready signals.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the subscription
    /// update failure.
    pub fn pause_send(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(Error::Closed);
        }

        self.send_paused = true;
        self.update_interest()?;

        Ok(self)
    }

    /// Resumes send-ready signals.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the subscription
    /// update failure.
    pub fn resume_send(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(Error::Closed);
        }

        self.send_paused = false;
        self.update_interest()?;

        Ok(self)
    }

    /// Pauses recv-ready signals. Inbound packets queue up in the OS until
    /// receiving is resumed.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the subscription
    /// update failure.
    pub fn pause_recv(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(Error::Closed);
        }

        self.recv_paused = true;
        self.update_interest()?;

        Ok(self)
    }

    /// Resumes recv-ready signals.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the subscription
    /// update failure.
    pub fn resume_recv(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(Error::Closed);
        }

        self.recv_paused = false;
        self.update_interest()?;

        Ok(self)
    }

    /// Sets a socket option, passing `value` through to the OS unmodified.
    ///
    /// No semantic validation of option values is applied at this layer.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the OS failure.
    pub fn set_option(
        &mut self,
        level: SocketLevel,
        option: SocketOption,
        value: &[u8],
    ) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }

        Ok(self.sys.set_option(level.as_raw(), option.as_raw(), value)?)
    }

    /// Reads a socket option into `value`, returning the number of bytes
    /// the OS wrote.
    ///
    /// # Errors
    ///
    /// Returns [Error::Closed] on a closed socket, or the OS failure.
    pub fn get_option(
        &mut self,
        level: SocketLevel,
        option: SocketOption,
        value: &mut [u8],
    ) -> Result<usize> {
        if self.closed {
            return Err(Error::Closed);
        }

        Ok(self.sys.get_option(level.as_raw(), option.as_raw(), value)?)
    }

    /// Waits for the next readiness report and runs one scheduler step:
    /// at most one receive dispatch followed by at most one send dispatch.
    ///
    /// An OS error condition is reported as [Event::Error] with
    /// [Error::Fatal] and closes the socket. A `timeout` of `None` blocks
    /// until the socket is ready.
    ///
    /// Calling `poll` on a closed socket is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the readiness wait itself fails or a
    /// subscription update fails; per-packet failures surface through
    /// completions and [Event::Error] instead.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let readiness = self.sys.poll_ready(timeout)?;

        if readiness.error {
            self.on_error();
            return Ok(());
        }

        if readiness.readable {
            self.on_recv_ready();
        }

        if readiness.writable {
            self.on_send_ready()?;
        }

        Ok(())
    }

    /// Returns the next queued notification, if any.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// Closes the socket, releasing the OS capability.
    ///
    /// Queued send requests are abandoned without running their
    /// completions, and [Event::Closed] is pushed exactly once. Closing an
    /// already-closed socket does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let abandoned = self.queue.clear();
        if abandoned > 0 {
            warn!("closing socket with {abandoned} queued send requests abandoned");
        }

        if let Err(err) = self.sys.close() {
            error!("failed to release raw socket: {err}");
        }

        self.events.push_back(Event::Closed);
    }

    /// Returns the number of send requests waiting in the queue.
    pub fn pending_sends(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if send-ready signals are paused.
    pub fn is_send_paused(&self) -> bool {
        self.send_paused
    }

    /// Returns `true` if recv-ready signals are paused.
    pub fn is_recv_paused(&self) -> bool {
        self.recv_paused
    }

    /// Returns `true` once the socket has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Pushes the readiness subscription derived from the combined pause
    /// state. Never updated incrementally, so the two axes cannot drift.
    fn update_interest(&mut self) -> Result<()> {
        Ok(self
            .sys
            .set_interest(!self.recv_paused, !self.send_paused)?)
    }

    /// Handles one send-ready signal: drains exactly one request, or
    /// pauses the send axis if the queue is empty.
    fn on_send_ready(&mut self) -> Result<()> {
        match self.queue.pop() {
            Some(req) => {
                let SendRequest {
                    buffer,
                    offset,
                    length,
                    destination,
                    before,
                    after,
                } = req;

                if let Some(before) = before {
                    before(self);
                }

                let outcome = self
                    .sys
                    .send_to(&buffer[offset..offset + length], destination)
                    .map_err(Error::Transmission);

                after(self, outcome);
            }
            None => {
                // Nothing left to send; drop the send subscription so the
                // OS stops announcing readiness we cannot use.
                if !self.send_paused {
                    debug!("send queue drained, pausing send readiness");
                    self.pause_send()?;
                }
            }
        }

        Ok(())
    }

    /// Handles one recv-ready signal: exactly one receive into the
    /// reusable buffer, delivered to the caller as a trimmed copy.
    fn on_recv_ready(&mut self) {
        match self.sys.recv_from(&mut self.recv_buf) {
            Ok((nbytes, source)) => {
                // Copy out before the next receive reuses the buffer.
                let buffer = self.recv_buf[..nbytes].to_vec();

                self.events.push_back(Event::Message { buffer, source });
            }
            Err(err) => {
                // Receive failures do not close the socket.
                self.events.push_back(Event::Error(Error::Receive(err)));
            }
        }
    }

    /// Handles an OS error condition: fatal to the socket.
    fn on_error(&mut self) {
        let err = self.sys.take_error();

        error!("fatal error condition on raw socket: {err}");

        self.events.push_back(Event::Error(Error::Fatal(err)));
        self.close();
    }
}

impl<T: fmt::Debug> fmt::Debug for Socket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("sys", &self.sys)
            .field("pending_sends", &self.queue.len())
            .field("recv_paused", &self.recv_paused)
            .field("send_paused", &self.send_paused)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use crate::sys::Readiness;

    /// Scripted capability standing in for the OS layer.
    #[derive(Debug, Default)]
    struct MockState {
        /// Order of capability calls, by name.
        ops: Vec<&'static str>,
        /// Payload and destination of every send attempt.
        sent: Vec<(Vec<u8>, IpAddr)>,
        /// Scripted send outcomes; `Ok(payload length)` once exhausted.
        send_results: VecDeque<io::Result<usize>>,
        /// Scripted receive outcomes.
        recv_results: VecDeque<io::Result<(Vec<u8>, IpAddr)>>,
        /// Scripted readiness reports; empty report once exhausted.
        readiness: VecDeque<Readiness>,
        /// Every combined subscription pushed to the OS.
        interest: Vec<(bool, bool)>,
        /// Options set through the pass-through.
        options_set: Vec<(libc::c_int, libc::c_int, Vec<u8>)>,
        /// Error handed out by `take_error`.
        pending_error: Option<io::Error>,
        /// Number of `close` calls.
        close_calls: usize,
    }

    #[derive(Debug)]
    struct MockSocket {
        state: Rc<RefCell<MockState>>,
    }

    impl RawSocket for MockSocket {
        fn send_to(&mut self, buf: &[u8], dst: IpAddr) -> io::Result<usize> {
            let mut state = self.state.borrow_mut();

            state.ops.push("send");
            state.sent.push((buf.to_vec(), dst));

            let fallback = buf.len();
            state.send_results.pop_front().unwrap_or(Ok(fallback))
        }

        fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)> {
            let mut state = self.state.borrow_mut();

            state.ops.push("recv");

            match state.recv_results.pop_front() {
                Some(Ok((payload, source))) => {
                    let nbytes = payload.len().min(buf.len());
                    buf[..nbytes].copy_from_slice(&payload[..nbytes]);

                    Ok((nbytes, source))
                }
                Some(Err(err)) => Err(err),
                None => Err(io::ErrorKind::WouldBlock.into()),
            }
        }

        fn set_option(
            &mut self,
            level: libc::c_int,
            option: libc::c_int,
            value: &[u8],
        ) -> io::Result<()> {
            let mut state = self.state.borrow_mut();

            state.ops.push("set_option");
            state.options_set.push((level, option, value.to_vec()));

            Ok(())
        }

        fn get_option(
            &mut self,
            _level: libc::c_int,
            _option: libc::c_int,
            value: &mut [u8],
        ) -> io::Result<usize> {
            // Reads back the most recently set option value.
            let state = self.state.borrow();

            match state.options_set.last() {
                Some((_, _, data)) => {
                    let nbytes = data.len().min(value.len());
                    value[..nbytes].copy_from_slice(&data[..nbytes]);

                    Ok(nbytes)
                }
                None => Ok(0),
            }
        }

        fn set_interest(&mut self, want_recv: bool, want_send: bool) -> io::Result<()> {
            self.state
                .borrow_mut()
                .interest
                .push((want_recv, want_send));

            Ok(())
        }

        fn poll_ready(&mut self, _timeout: Option<Duration>) -> io::Result<Readiness> {
            Ok(self
                .state
                .borrow_mut()
                .readiness
                .pop_front()
                .unwrap_or_default())
        }

        fn take_error(&mut self) -> io::Error {
            self.state
                .borrow_mut()
                .pending_error
                .take()
                .unwrap_or_else(|| io::Error::other("scripted error"))
        }

        fn close(&mut self) -> io::Result<()> {
            let mut state = self.state.borrow_mut();

            state.ops.push("close");
            state.close_calls += 1;

            Ok(())
        }
    }

    type Completions = Rc<RefCell<Vec<(usize, Result<usize>)>>>;

    fn scheduler() -> (Socket<MockSocket>, Rc<RefCell<MockState>>) {
        let state = Rc::new(RefCell::new(MockState::default()));
        let mock = MockSocket {
            state: Rc::clone(&state),
        };

        let socket = Socket::with_sys(mock, Options::default()).unwrap();

        (socket, state)
    }

    fn recorded_after(tag: usize, log: &Completions) -> AfterSend<MockSocket> {
        let log = Rc::clone(log);

        Box::new(move |_, outcome| log.borrow_mut().push((tag, outcome)))
    }

    #[test]
    fn send_bounds_validation_sync_invalid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        socket
            .send(
                vec![0; 4],
                2,
                3,
                "127.0.0.1",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        let completions = completions.borrow();
        assert_eq!(completions.len(), 1);
        assert!(matches!(
            completions[0].1,
            Err(Error::Validation(ValidationError::BufferBounds {
                buffer_len: 4,
                offset: 2,
                length: 3,
            }))
        ));

        assert_eq!(socket.pending_sends(), 0);
        assert!(socket.is_send_paused());
        // Only the constructor's subscription; validation must not touch it.
        assert_eq!(state.borrow().interest.as_slice(), &[(true, false)]);
    }

    #[test]
    fn send_bounds_validation_overflow_invalid() {
        let (mut socket, _state) = scheduler();
        let completions: Completions = Rc::default();

        socket
            .send(
                vec![0; 4],
                usize::MAX,
                2,
                "127.0.0.1",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        assert!(matches!(
            completions.borrow()[0].1,
            Err(Error::Validation(ValidationError::BufferBounds { .. }))
        ));
        assert_eq!(socket.pending_sends(), 0);
    }

    #[test]
    fn send_address_validation_sync_invalid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        socket
            .send(
                vec![0; 4],
                0,
                4,
                "not-an-address",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        assert!(matches!(
            completions.borrow()[0].1,
            Err(Error::Validation(ValidationError::InvalidAddress(_)))
        ));
        assert_eq!(socket.pending_sends(), 0);
        assert_eq!(state.borrow().interest.as_slice(), &[(true, false)]);
    }

    #[test]
    fn send_resumes_send_readiness_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        assert!(socket.is_send_paused());

        socket
            .send(
                vec![1, 2, 3],
                0,
                3,
                "10.0.0.1",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        assert!(!socket.is_send_paused());
        assert_eq!(socket.pending_sends(), 1);
        assert_eq!(state.borrow().interest.last(), Some(&(true, true)));

        // A second send while already active must not re-subscribe.
        socket
            .send(
                vec![4, 5],
                0,
                2,
                "10.0.0.1",
                None,
                recorded_after(1, &completions),
            )
            .unwrap();

        assert_eq!(state.borrow().interest.len(), 2);
        assert_eq!(socket.pending_sends(), 2);
    }

    #[test]
    fn send_ready_fifo_completions_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        let payloads: [&[u8]; 3] = [&[1], &[2, 2], &[3, 3, 3]];

        for (tag, payload) in payloads.iter().enumerate() {
            socket
                .send(
                    payload.to_vec(),
                    0,
                    payload.len(),
                    "10.0.0.1",
                    None,
                    recorded_after(tag, &completions),
                )
                .unwrap();
        }

        for _ in 0..payloads.len() {
            socket.on_send_ready().unwrap();
        }

        let completions = completions.borrow();
        assert_eq!(completions.len(), 3);

        for (tag, payload) in payloads.iter().enumerate() {
            assert_eq!(completions[tag].0, tag);
            assert!(matches!(completions[tag].1, Ok(n) if n == payload.len()));
        }

        let state = state.borrow();
        assert_eq!(state.sent.len(), 3);

        for (tag, payload) in payloads.iter().enumerate() {
            assert_eq!(state.sent[tag].0.as_slice(), *payload);
        }
    }

    #[test]
    fn send_ready_one_send_per_signal_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        for tag in 0..2 {
            socket
                .send(
                    vec![tag as u8],
                    0,
                    1,
                    "10.0.0.1",
                    None,
                    recorded_after(tag, &completions),
                )
                .unwrap();
        }

        socket.on_send_ready().unwrap();

        assert_eq!(state.borrow().sent.len(), 1);
        assert_eq!(socket.pending_sends(), 1);
        assert_eq!(completions.borrow().len(), 1);
    }

    #[test]
    fn send_ready_window_slicing_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        socket
            .send(
                vec![0xAA, 0xBB, 0xCC, 0xDD],
                1,
                2,
                "10.0.0.1",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        socket.on_send_ready().unwrap();

        let state = state.borrow();
        assert_eq!(state.sent[0].0.as_slice(), &[0xBB, 0xCC]);
        assert!(matches!(completions.borrow()[0].1, Ok(2)));
    }

    #[test]
    fn send_ready_empty_queue_pauses_valid() {
        let (mut socket, state) = scheduler();

        socket.resume_send().unwrap();
        assert!(!socket.is_send_paused());

        socket.on_send_ready().unwrap();

        assert!(socket.is_send_paused());
        assert_eq!(state.borrow().interest.last(), Some(&(true, false)));

        // Already paused: a stray signal must not re-push the subscription.
        let interest_calls = state.borrow().interest.len();
        socket.on_send_ready().unwrap();
        assert_eq!(state.borrow().interest.len(), interest_calls);
    }

    #[test]
    fn send_ready_failure_completes_in_order_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        state
            .borrow_mut()
            .send_results
            .push_back(Err(io::Error::from_raw_os_error(libc::ENETUNREACH)));

        for tag in 0..2 {
            socket
                .send(
                    vec![tag as u8],
                    0,
                    1,
                    "10.0.0.1",
                    None,
                    recorded_after(tag, &completions),
                )
                .unwrap();
        }

        socket.on_send_ready().unwrap();
        socket.on_send_ready().unwrap();

        let completions = completions.borrow();
        assert_eq!(completions[0].0, 0);
        assert!(matches!(completions[0].1, Err(Error::Transmission(_))));
        assert_eq!(completions[1].0, 1);
        assert!(matches!(completions[1].1, Ok(1)));

        // Per-request failure: no socket-level event, socket stays open.
        assert!(!socket.is_closed());
        assert!(socket.next_event().is_none());
    }

    #[test]
    fn before_hook_runs_before_send_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        let before: BeforeSend<MockSocket> = Box::new(|socket| {
            socket
                .set_option(SocketLevel::IPPROTO_IP, SocketOption::IP_TTL, &[1])
                .unwrap();
        });

        socket
            .send(
                vec![9],
                0,
                1,
                "10.0.0.1",
                Some(before),
                recorded_after(0, &completions),
            )
            .unwrap();

        socket.on_send_ready().unwrap();

        let state = state.borrow();
        assert_eq!(state.ops.as_slice(), &["set_option", "send"]);
        assert_eq!(
            state.options_set[0],
            (libc::IPPROTO_IP, libc::IP_TTL, vec![1])
        );
    }

    #[test]
    fn recv_ready_delivers_trimmed_copy_valid() {
        let (mut socket, state) = scheduler();
        let source: IpAddr = "192.0.2.7".parse().unwrap();

        state
            .borrow_mut()
            .recv_results
            .push_back(Ok((vec![1, 2, 3], source)));

        socket.on_recv_ready();

        match socket.next_event() {
            Some(Event::Message { buffer, source: from }) => {
                assert_eq!(buffer, vec![1, 2, 3]);
                assert_eq!(from, source);
            }
            other => panic!("expected message event, got {other:?}"),
        }

        assert!(socket.next_event().is_none());
    }

    #[test]
    fn recv_buffer_not_aliased_valid() {
        let (mut socket, state) = scheduler();
        let source: IpAddr = "192.0.2.7".parse().unwrap();

        {
            let mut state = state.borrow_mut();
            state.recv_results.push_back(Ok((vec![0xAA; 4], source)));
            state.recv_results.push_back(Ok((vec![0x55; 2], source)));
        }

        socket.on_recv_ready();
        socket.on_recv_ready();

        // The second receive reused the internal buffer; the first delivery
        // must be unaffected.
        match (socket.next_event(), socket.next_event()) {
            (
                Some(Event::Message { buffer: first, .. }),
                Some(Event::Message { buffer: second, .. }),
            ) => {
                assert_eq!(first, vec![0xAA; 4]);
                assert_eq!(second, vec![0x55; 2]);
            }
            other => panic!("expected two message events, got {other:?}"),
        }
    }

    #[test]
    fn recv_error_keeps_socket_open_valid() {
        let (mut socket, state) = scheduler();
        let source: IpAddr = "192.0.2.7".parse().unwrap();

        {
            let mut state = state.borrow_mut();
            state
                .recv_results
                .push_back(Err(io::Error::from_raw_os_error(libc::ENOMEM)));
            state.recv_results.push_back(Ok((vec![7], source)));
        }

        socket.on_recv_ready();

        assert!(matches!(
            socket.next_event(),
            Some(Event::Error(Error::Receive(_)))
        ));
        assert!(!socket.is_closed());
        assert_eq!(state.borrow().close_calls, 0);

        // The socket keeps receiving.
        socket.on_recv_ready();
        assert!(matches!(socket.next_event(), Some(Event::Message { .. })));
    }

    #[test]
    fn fatal_error_closes_socket_valid() {
        let (mut socket, state) = scheduler();

        state.borrow_mut().pending_error =
            Some(io::Error::from_raw_os_error(libc::ECONNREFUSED));

        socket.on_error();

        assert!(socket.is_closed());
        assert!(matches!(
            socket.next_event(),
            Some(Event::Error(Error::Fatal(_)))
        ));
        assert!(matches!(socket.next_event(), Some(Event::Closed)));
        assert!(socket.next_event().is_none());
        assert_eq!(state.borrow().close_calls, 1);
    }

    #[test]
    fn close_abandons_pending_sends_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        for tag in 0..2 {
            socket
                .send(
                    vec![tag as u8],
                    0,
                    1,
                    "10.0.0.1",
                    None,
                    recorded_after(tag, &completions),
                )
                .unwrap();
        }

        socket.close();

        // Abandoned requests never complete.
        assert!(completions.borrow().is_empty());
        assert_eq!(socket.pending_sends(), 0);
        assert_eq!(state.borrow().close_calls, 1);
        assert!(matches!(socket.next_event(), Some(Event::Closed)));
        assert!(socket.next_event().is_none());

        // Second close is a no-op: no second event, no second release.
        socket.close();
        assert!(socket.next_event().is_none());
        assert_eq!(state.borrow().close_calls, 1);
    }

    #[test]
    fn closed_socket_rejects_operations_invalid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();

        socket.close();
        assert!(matches!(socket.next_event(), Some(Event::Closed)));

        socket
            .send(
                vec![1],
                0,
                1,
                "10.0.0.1",
                None,
                recorded_after(0, &completions),
            )
            .unwrap();

        assert!(matches!(completions.borrow()[0].1, Err(Error::Closed)));
        assert_eq!(socket.pending_sends(), 0);

        assert!(matches!(socket.pause_send(), Err(Error::Closed)));
        assert!(matches!(socket.resume_recv(), Err(Error::Closed)));
        assert!(matches!(
            socket.set_option(SocketLevel::IPPROTO_IP, SocketOption::IP_TTL, &[1]),
            Err(Error::Closed)
        ));

        // Polling a closed socket is a no-op.
        socket.poll(Some(Duration::from_millis(1))).unwrap();
        assert!(socket.next_event().is_none());

        // The constructor's subscription is the only one ever pushed.
        assert_eq!(state.borrow().interest.as_slice(), &[(true, false)]);
    }

    #[test]
    fn pause_axes_independent_valid() {
        let (mut socket, state) = scheduler();

        socket.pause_recv().unwrap();
        assert!(socket.is_recv_paused());
        assert!(socket.is_send_paused());
        assert_eq!(state.borrow().interest.last(), Some(&(false, false)));

        socket.resume_send().unwrap();
        assert!(socket.is_recv_paused());
        assert_eq!(state.borrow().interest.last(), Some(&(false, true)));

        socket.resume_recv().unwrap();
        assert!(!socket.is_recv_paused());
        assert_eq!(state.borrow().interest.last(), Some(&(true, true)));

        // Chained pause of both axes.
        socket.pause_recv().unwrap().pause_send().unwrap();
        assert_eq!(state.borrow().interest.last(), Some(&(false, false)));
    }

    #[test]
    fn poll_dispatches_recv_before_send_valid() {
        let (mut socket, state) = scheduler();
        let completions: Completions = Rc::default();
        let source: IpAddr = "192.0.2.1".parse().unwrap();

        {
            let mut state = state.borrow_mut();
            state.recv_results.push_back(Ok((vec![5], source)));
            state.readiness.push_back(Readiness {
                readable: true,
                writable: true,
                error: false,
            });
        }

        socket
            .send(vec![6], 0, 1, "10.0.0.1", None, recorded_after(0, &completions))
            .unwrap();

        socket.poll(Some(Duration::from_millis(10))).unwrap();

        assert_eq!(state.borrow().ops.as_slice(), &["recv", "send"]);
        assert!(matches!(socket.next_event(), Some(Event::Message { .. })));
        assert_eq!(completions.borrow().len(), 1);
    }

    #[test]
    fn poll_error_signal_fatal_valid() {
        let (mut socket, state) = scheduler();

        {
            let mut state = state.borrow_mut();
            state.pending_error = Some(io::Error::from_raw_os_error(libc::ENETDOWN));
            state.readiness.push_back(Readiness {
                readable: false,
                writable: false,
                error: true,
            });
        }

        socket.poll(None).unwrap();

        assert!(socket.is_closed());
        assert!(matches!(
            socket.next_event(),
            Some(Event::Error(Error::Fatal(_)))
        ));
        assert!(matches!(socket.next_event(), Some(Event::Closed)));
        assert_eq!(state.borrow().close_calls, 1);
    }

    #[test]
    fn poll_empty_readiness_no_dispatch_valid() {
        let (mut socket, state) = scheduler();

        // No scripted readiness: the wait reports nothing.
        socket.poll(Some(Duration::from_millis(1))).unwrap();

        assert!(socket.next_event().is_none());
        assert!(state.borrow().ops.is_empty());
    }
}

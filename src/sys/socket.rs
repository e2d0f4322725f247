use std::io;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use crate::consts::{AddressFamily, Protocol};
use crate::error::errno;

use super::{RawSocket, Readiness};

/// A non-blocking OS raw socket with its own `epoll` instance for readiness
/// notification.
///
/// Raw sockets operate below the transport layer: sends and receives carry
/// whole IP payloads (or whole IP packets, with `IP_HDRINCL`) and no port
/// demultiplexing is applied by the kernel.
#[derive(Debug)]
pub struct SysSocket {
    fd: RawFd,
    epoll_fd: RawFd,
    closed: bool,
}

impl SysSocket {
    /// Opens a non-blocking raw socket for the given address family and
    /// protocol and registers it with a fresh `epoll` instance.
    ///
    /// The socket starts with no readiness subscription; the scheduler
    /// pushes the combined pair before the first wait.
    ///
    /// # Notes
    ///
    /// Creating a raw socket requires the `CAP_NET_RAW` capability.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket could not be created or configured,
    /// or if the `epoll` instance could not be set up.
    pub fn open(family: AddressFamily, protocol: Protocol) -> io::Result<Self> {
        unsafe {
            let fd = libc::socket(family.as_raw(), libc::SOCK_RAW, protocol.as_raw());
            if fd == -1 {
                return Err(errno!("failed to create raw socket"));
            }

            // Readiness-driven scheduling only works over a non-blocking
            // socket.
            //
            // Get current flags so they can be combined with `O_NONBLOCK`.
            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags == -1 {
                let err = errno!("failed to get raw socket flags");
                let _ = libc::close(fd);
                return Err(err);
            }

            if libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) == -1 {
                let err = errno!("failed to set raw socket to non-blocking");
                let _ = libc::close(fd);
                return Err(err);
            }

            let epoll_fd = libc::epoll_create1(0);
            if epoll_fd == -1 {
                let err = errno!("failed to create epoll_fd");
                let _ = libc::close(fd);
                return Err(err);
            }

            let mut ev = libc::epoll_event {
                events: 0,
                u64: fd as u64,
            };

            // Add the file descriptor to the epoll interest list to be
            // notified on ready events.
            if libc::epoll_ctl(epoll_fd, libc::EPOLL_CTL_ADD, fd, &raw mut ev) == -1 {
                let err = errno!("failed to add to epoll interest list");
                let _ = libc::close(epoll_fd);
                let _ = libc::close(fd);
                return Err(err);
            }

            Ok(Self {
                fd,
                epoll_fd,
                closed: false,
            })
        }
    }
}

impl RawSocket for SysSocket {
    fn send_to(&mut self, buf: &[u8], dst: IpAddr) -> io::Result<usize> {
        let (storage, addr_len) = encode_sockaddr(dst);

        let nbytes = unsafe {
            libc::sendto(
                self.fd,
                buf.as_ptr() as *const libc::c_void,
                buf.len(),
                0,
                &raw const storage as *const libc::sockaddr,
                addr_len,
            )
        };

        if nbytes == -1 {
            return Err(errno!("failed to send packet to {dst}"));
        }

        Ok(nbytes as usize)
    }

    fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, IpAddr)> {
        // SAFETY: an all-zero byte pattern is a valid `sockaddr_storage`.
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        let mut addr_len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let nbytes = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &raw mut storage as *mut libc::sockaddr,
                &raw mut addr_len,
            )
        };

        if nbytes == -1 {
            return Err(errno!("failed to receive packet"));
        }

        let source = decode_sockaddr(&storage).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "received packet with unknown address family",
            )
        })?;

        Ok((nbytes as usize, source))
    }

    fn set_option(
        &mut self,
        level: libc::c_int,
        option: libc::c_int,
        value: &[u8],
    ) -> io::Result<()> {
        let nbytes = value.len() as libc::socklen_t;

        if unsafe {
            libc::setsockopt(
                self.fd,
                level,
                option,
                value.as_ptr() as *const libc::c_void,
                nbytes,
            )
        } == -1
        {
            return Err(errno!("failed to set socket option {option} at level {level}"));
        }

        Ok(())
    }

    fn get_option(
        &mut self,
        level: libc::c_int,
        option: libc::c_int,
        value: &mut [u8],
    ) -> io::Result<usize> {
        let mut nbytes = value.len() as libc::socklen_t;

        if unsafe {
            libc::getsockopt(
                self.fd,
                level,
                option,
                value.as_mut_ptr() as *mut libc::c_void,
                &raw mut nbytes,
            )
        } == -1
        {
            return Err(errno!("failed to get socket option {option} at level {level}"));
        }

        Ok(nbytes as usize)
    }

    fn set_interest(&mut self, want_recv: bool, want_send: bool) -> io::Result<()> {
        let mut events = 0u32;

        if want_recv {
            events |= libc::EPOLLIN as u32;
        }
        if want_send {
            events |= libc::EPOLLOUT as u32;
        }

        let mut ev = libc::epoll_event {
            events,
            u64: self.fd as u64,
        };

        if unsafe { libc::epoll_ctl(self.epoll_fd, libc::EPOLL_CTL_MOD, self.fd, &raw mut ev) }
            == -1
        {
            return Err(errno!("failed to update epoll interest list"));
        }

        Ok(())
    }

    fn poll_ready(&mut self, timeout: Option<Duration>) -> io::Result<Readiness> {
        let timeout_ms = match timeout {
            Some(timeout) => i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX),
            // -1 will block indefinitely until an event occurs.
            None => -1,
        };

        let mut event = libc::epoll_event { events: 0, u64: 0 };

        let rdfs = unsafe { libc::epoll_wait(self.epoll_fd, &raw mut event, 1, timeout_ms) };

        if rdfs == -1 {
            let err = io::Error::last_os_error();

            // A caught signal interrupts the wait before any readiness is
            // reported.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }

            return Err(io::Error::new(
                err.kind(),
                format!("failed to wait on epoll: {err}"),
            ));
        }

        if rdfs == 0 {
            return Ok(Readiness::default());
        }

        Ok(Readiness {
            readable: event.events & libc::EPOLLIN as u32 != 0,
            writable: event.events & libc::EPOLLOUT as u32 != 0,
            // EPOLLERR and EPOLLHUP are always reported, even when not
            // subscribed.
            error: event.events & (libc::EPOLLERR | libc::EPOLLHUP) as u32 != 0,
        })
    }

    fn take_error(&mut self) -> io::Error {
        let mut err: libc::c_int = 0;
        let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;

        if unsafe {
            libc::getsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_ERROR,
                &raw mut err as *mut libc::c_void,
                &raw mut len,
            )
        } == -1
        {
            return io::Error::last_os_error();
        }

        if err == 0 {
            return io::Error::other("error condition signaled with no pending socket error");
        }

        io::Error::from_raw_os_error(err)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut result = Ok(());

        unsafe {
            if libc::close(self.epoll_fd) == -1 {
                result = Err(errno!("failed to close epoll_fd"));
            }
            if libc::close(self.fd) == -1 {
                result = Err(errno!("failed to close raw socket"));
            }
        }

        result
    }
}

impl AsRawFd for SysSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for SysSocket {
    fn drop(&mut self) {
        let _ = RawSocket::close(self);
    }
}

/// Builds the `sockaddr` the OS expects for the given destination address.
///
/// The port field is zero; raw sockets carry no transport-layer ports.
fn encode_sockaddr(addr: IpAddr) -> (libc::sockaddr_storage, libc::socklen_t) {
    // SAFETY: an all-zero byte pattern is a valid `sockaddr_storage`.
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };

    let len = match addr {
        IpAddr::V4(v4) => {
            let sin = (&raw mut storage) as *mut libc::sockaddr_in;

            // SAFETY: `sockaddr_storage` is sized and aligned to hold any
            // socket address type.
            unsafe {
                (*sin).sin_family = libc::AF_INET as libc::sa_family_t;
                (*sin).sin_port = 0;
                // `s_addr` holds the address bytes in network order.
                (*sin).sin_addr.s_addr = u32::from_ne_bytes(v4.octets());
            }

            mem::size_of::<libc::sockaddr_in>()
        }
        IpAddr::V6(v6) => {
            let sin6 = (&raw mut storage) as *mut libc::sockaddr_in6;

            // SAFETY: `sockaddr_storage` is sized and aligned to hold any
            // socket address type.
            unsafe {
                (*sin6).sin6_family = libc::AF_INET6 as libc::sa_family_t;
                (*sin6).sin6_port = 0;
                (*sin6).sin6_addr.s6_addr = v6.octets();
            }

            mem::size_of::<libc::sockaddr_in6>()
        }
    };

    (storage, len as libc::socklen_t)
}

/// Reads the source address out of a `sockaddr_storage` filled by the OS.
///
/// Returns `None` for address families other than `AF_INET`/`AF_INET6`.
fn decode_sockaddr(storage: &libc::sockaddr_storage) -> Option<IpAddr> {
    match storage.ss_family as libc::c_int {
        libc::AF_INET => {
            // SAFETY: `ss_family` identifies the storage as a `sockaddr_in`.
            let sin = unsafe { *(storage as *const _ as *const libc::sockaddr_in) };

            Some(IpAddr::V4(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes())))
        }
        libc::AF_INET6 => {
            // SAFETY: `ss_family` identifies the storage as a `sockaddr_in6`.
            let sin6 = unsafe { *(storage as *const _ as *const libc::sockaddr_in6) };

            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}

//! Address family, protocol, and socket option tables.
//!
//! Closed sets of symbolic names mapped to the numeric values the OS layer
//! expects. Option values pass through unmodified; no semantic checks are
//! applied here.

/// Address family of a raw socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// IPv4 (`AF_INET`).
    Ipv4,
    /// IPv6 (`AF_INET6`).
    Ipv6,
}

impl AddressFamily {
    /// Returns the raw communication domain value passed to `socket(2)`.
    pub fn as_raw(self) -> libc::c_int {
        match self {
            AddressFamily::Ipv4 => libc::AF_INET,
            AddressFamily::Ipv6 => libc::AF_INET6,
        }
    }
}

/// Assigned Internet Protocol Numbers (RFC 1700) accepted for raw sockets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Protocol {
    /// No specific protocol. The kernel default for raw sockets.
    None = 0,
    /// Internet Control Message
    ICMP = 1,
    /// Transmission Control
    TCP = 6,
    /// User Datagram
    UDP = 17,
    /// Internet Control Message for IPv6
    ICMPv6 = 58,
}

impl Protocol {
    /// Returns the raw protocol number passed to `socket(2)`.
    pub fn as_raw(self) -> libc::c_int {
        self as libc::c_int
    }
}

impl From<Protocol> for u8 {
    fn from(proto: Protocol) -> u8 {
        proto as u8
    }
}

/// Socket option levels accepted by [set_option] and [get_option].
///
/// [set_option]: crate::Socket::set_option
/// [get_option]: crate::Socket::get_option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum SocketLevel {
    /// IPv4 protocol level.
    IPPROTO_IP,
    /// IPv6 protocol level.
    IPPROTO_IPV6,
    /// Socket API level.
    SOL_SOCKET,
}

impl SocketLevel {
    /// Returns the raw level value passed to `setsockopt(2)`/`getsockopt(2)`.
    pub fn as_raw(self) -> libc::c_int {
        match self {
            SocketLevel::IPPROTO_IP => libc::IPPROTO_IP,
            SocketLevel::IPPROTO_IPV6 => libc::IPPROTO_IPV6,
            SocketLevel::SOL_SOCKET => libc::SOL_SOCKET,
        }
    }
}

/// Socket options accepted by [set_option] and [get_option].
///
/// [set_option]: crate::Socket::set_option
/// [get_option]: crate::Socket::get_option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum SocketOption {
    /// The caller provides the IP header (level `IPPROTO_IP`).
    IP_HDRINCL,
    /// IP options to be sent with every packet (level `IPPROTO_IP`).
    IP_OPTIONS,
    /// Type-of-service byte (level `IPPROTO_IP`).
    IP_TOS,
    /// Time-to-live of outgoing packets (level `IPPROTO_IP`).
    IP_TTL,
    /// Hop limit of outgoing packets (level `IPPROTO_IPV6`).
    IPV6_UNICAST_HOPS,
    /// Restrict the socket to IPv6 traffic only (level `IPPROTO_IPV6`).
    IPV6_V6ONLY,
    /// Permit sending to broadcast addresses (level `SOL_SOCKET`).
    SO_BROADCAST,
    /// Receive buffer size (level `SOL_SOCKET`).
    SO_RCVBUF,
    /// Receive timeout (level `SOL_SOCKET`).
    SO_RCVTIMEO,
    /// Send buffer size (level `SOL_SOCKET`).
    SO_SNDBUF,
    /// Send timeout (level `SOL_SOCKET`).
    SO_SNDTIMEO,
}

impl SocketOption {
    /// Returns the raw option value passed to `setsockopt(2)`/`getsockopt(2)`.
    pub fn as_raw(self) -> libc::c_int {
        match self {
            SocketOption::IP_HDRINCL => libc::IP_HDRINCL,
            SocketOption::IP_OPTIONS => libc::IP_OPTIONS,
            SocketOption::IP_TOS => libc::IP_TOS,
            SocketOption::IP_TTL => libc::IP_TTL,
            SocketOption::IPV6_UNICAST_HOPS => libc::IPV6_UNICAST_HOPS,
            SocketOption::IPV6_V6ONLY => libc::IPV6_V6ONLY,
            SocketOption::SO_BROADCAST => libc::SO_BROADCAST,
            SocketOption::SO_RCVBUF => libc::SO_RCVBUF,
            SocketOption::SO_RCVTIMEO => libc::SO_RCVTIMEO,
            SocketOption::SO_SNDBUF => libc::SO_SNDBUF,
            SocketOption::SO_SNDTIMEO => libc::SO_SNDTIMEO,
        }
    }
}

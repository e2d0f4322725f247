//! Reads a socket option off a freshly opened ICMP raw socket and prints
//! its raw value in hex.
//!
//! Usage: `get_option <level> <option>`, e.g. `get_option SOL_SOCKET SO_RCVBUF`
//!
//! Requires `CAP_NET_RAW`.

use std::env;
use std::process;

use rawsock::{Options, Protocol, Result, Socket, SocketLevel, SocketOption};

fn parse_level(name: &str) -> Option<SocketLevel> {
    match name {
        "IPPROTO_IP" => Some(SocketLevel::IPPROTO_IP),
        "IPPROTO_IPV6" => Some(SocketLevel::IPPROTO_IPV6),
        "SOL_SOCKET" => Some(SocketLevel::SOL_SOCKET),
        _ => None,
    }
}

fn parse_option(name: &str) -> Option<SocketOption> {
    match name {
        "IP_HDRINCL" => Some(SocketOption::IP_HDRINCL),
        "IP_OPTIONS" => Some(SocketOption::IP_OPTIONS),
        "IP_TOS" => Some(SocketOption::IP_TOS),
        "IP_TTL" => Some(SocketOption::IP_TTL),
        "IPV6_UNICAST_HOPS" => Some(SocketOption::IPV6_UNICAST_HOPS),
        "IPV6_V6ONLY" => Some(SocketOption::IPV6_V6ONLY),
        "SO_BROADCAST" => Some(SocketOption::SO_BROADCAST),
        "SO_RCVBUF" => Some(SocketOption::SO_RCVBUF),
        "SO_RCVTIMEO" => Some(SocketOption::SO_RCVTIMEO),
        "SO_SNDBUF" => Some(SocketOption::SO_SNDBUF),
        "SO_SNDTIMEO" => Some(SocketOption::SO_SNDTIMEO),
        _ => None,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("usage: get_option <level> <option>");
        process::exit(1);
    }

    let Some(level) = parse_level(&args[1]) else {
        eprintln!("unknown socket level: {}", args[1]);
        process::exit(1);
    };
    let Some(option) = parse_option(&args[2]) else {
        eprintln!("unknown socket option: {}", args[2]);
        process::exit(1);
    };

    let mut socket = Socket::open(Options {
        protocol: Protocol::ICMP,
        ..Options::default()
    })?;

    let mut value = vec![0u8; 4096];
    let len = socket.get_option(level, option, &mut value)?;

    socket.pause_send()?.pause_recv()?;

    println!("{}", hex(&value[..len]));

    Ok(())
}

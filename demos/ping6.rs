//! Sends ICMPv6 echo requests to a target and prints every ICMPv6 packet
//! that comes back.
//!
//! Usage: `ping6 <target> <count> <sleep-milliseconds>`
//!
//! Requires `CAP_NET_RAW`.

use std::env;
use std::process;
use std::time::{Duration, Instant};

use rawsock::{checksum, AddressFamily, Event, Options, Protocol, Result, Socket};

// ICMPv6 echo (ping) request, checksum field zeroed.
const ECHO_REQUEST: [u8; 40] = [
    0x80, 0x00, 0x00, 0x00, 0x00, 0x01, 0x0a, 0x09, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67,
    0x68, 0x69, 0x6a, 0x6b, 0x6c, 0x6d, 0x6e, 0x6f, 0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76,
    0x77, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
];

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn drain_events(socket: &mut Socket) {
    while let Some(event) = socket.next_event() {
        match event {
            Event::Message { buffer, source } => {
                println!("received {} bytes from {source}", buffer.len());
                println!("data: {}", hex(&buffer));
            }
            Event::Error(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
            Event::Closed => {
                println!("socket closed");
                process::exit(1);
            }
        }
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        eprintln!("usage: ping6 <target> <count> <sleep-milliseconds>");
        process::exit(1);
    }

    let target = args[1].clone();
    let count: usize = args[2].parse().expect("count must be an integer");
    let sleep: u64 = args[3].parse().expect("sleep must be in milliseconds");

    let mut socket = Socket::open(Options {
        address_family: AddressFamily::Ipv6,
        protocol: Protocol::ICMPv6,
        ..Options::default()
    })?;

    let mut packet = ECHO_REQUEST.to_vec();
    // The checksum field sits at offset 2. The kernel recomputes ICMPv6
    // checksums over the pseudo-header before transmission.
    let sum = checksum::compute(&packet);
    checksum::write(&mut packet, 2, sum);

    loop {
        for _ in 0..count {
            let target = target.clone();
            socket.send(
                packet.clone(),
                0,
                packet.len(),
                &args[1],
                None,
                Box::new(move |_, outcome| match outcome {
                    Ok(nbytes) => println!("sent {nbytes} bytes to {target}"),
                    Err(err) => println!("{err}"),
                }),
            )?;
        }

        let deadline = Instant::now() + Duration::from_millis(sleep);

        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if remaining.is_zero() {
                break;
            }

            socket.poll(Some(remaining))?;
            drain_events(&mut socket);
        }
    }
}

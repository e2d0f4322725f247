//! Internet checksum computation, based on [RFC 1071].
//!
//! The checksum is the 16 bit one's complement of the one's complement sum
//! of all 16 bit words in the covered data. Protocols place it in a header
//! field that is zeroed during computation, so a receiver summing the whole
//! message sees a result of `0xFFFF`.
//!
//! The sum can be built up across multiple buffer segments with
//! [accumulate] and closed out with [finalize], or taken over a single
//! buffer with [compute]. [write] stores a finished checksum into a packet
//! buffer in network byte order.
//!
//! [RFC 1071]: https://www.rfc-editor.org/rfc/rfc1071

/// Folds a buffer segment into a running one's complement sum.
///
/// The initial call passes `0`; later calls pass the sum returned by the
/// previous call. Bytes are consumed as big-endian 16 bit words, and an odd
/// trailing byte is treated as the high byte of a word whose low byte is
/// zero.
///
/// # Notes
///
/// Each segment pads its own odd trailing byte, so segments may be folded in
/// any order without changing the final checksum. For the sum to equal that
/// of the contiguous buffer, every segment except the last must have an even
/// length; splitting at an odd offset checksums a different word sequence.
pub fn accumulate(sum: u32, data: &[u8]) -> u32 {
    let mut bytes = data.iter();
    let mut sum = sum;

    loop {
        match (bytes.next(), bytes.next()) {
            (Some(h), Some(l)) => {
                let word = u16::from_be_bytes([*h, *l]);

                sum += word as u32;

                // Handle potential overflow with carry folding.
                if sum > 0xFFFF {
                    // Adds the higher 16-bits to the lower 16-bits.
                    sum = (sum & 0xFFFF) + (sum >> 16);
                }
            }
            (Some(h), None) => {
                // If a segment contains an odd number of octets to be
                // checksummed, the last octet is padded on the right with
                // zeros to form a 16 bit word for checksum purposes.
                let word = u16::from_be_bytes([*h, 0x00]);

                sum += word as u32;

                // Handle potential overflow with carry folding.
                if sum > 0xFFFF {
                    // Adds the higher 16-bits to the lower 16-bits.
                    sum = (sum & 0xFFFF) + (sum >> 16);
                }
            }
            _ => {
                break;
            }
        }
    }

    sum
}

/// Reduces a running sum to the final 16 bit checksum.
///
/// Any remaining carries are folded back into the lower 16 bits, and the
/// result is the one's complement of the folded sum.
pub fn finalize(sum: u32) -> u16 {
    let mut sum = sum;

    // Handle potential remaining overflow with carry folding.
    while sum > 0xFFFF {
        // Adds the higher 16-bits to the lower 16-bits.
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Computes the checksum of a single buffer.
///
/// Equivalent to `finalize(accumulate(0, data))`. The buffer's checksum
/// field, if any, must be zeroed before calling.
pub fn compute(data: &[u8]) -> u16 {
    finalize(accumulate(0, data))
}

/// Writes a finished checksum into `buf` in network byte order.
///
/// Writing the same checksum to the same offset any number of times leaves
/// the buffer unchanged.
///
/// # Panics
///
/// Panics if `offset + 2` exceeds the buffer length.
pub fn write(buf: &mut [u8], offset: usize, checksum: u16) {
    buf[offset..offset + 2].copy_from_slice(&checksum.to_be_bytes());
}

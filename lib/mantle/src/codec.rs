//! Deflate request body codec.
//!
//! [`deflate`] wraps a raw DEFLATE stream in the zlib container expected by
//! servers accepting `Content-Encoding: deflate`:
//!
//! ```text
//! +------+------+=====================+---------------------+
//! | 0x78 | 0x5E | raw deflate payload | Adler-32 (BE, 4 B)  |
//! +------+------+=====================+---------------------+
//! ```
//!
//! The trailer is the checksum of the *uncompressed* input.

use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::write::DeflateEncoder;

/// zlib header emitted before the payload.
pub const ZLIB_HEADER: [u8; 2] = [0x78, 0x5E];

const ADLER_MODULUS: u32 = 65_521;

/// Largest number of bytes that can be summed before `b` may overflow a `u32`.
const ADLER_NMAX: usize = 5_552;

/// Adler-32 checksum of `data`.
///
/// ```
/// assert_eq!(mantle::codec::adler32(b""), 1);
/// assert_eq!(mantle::codec::adler32(&[1, 2, 3, 4]), 0x0018_000B);
/// ```
#[must_use]
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    // Reducing once per chunk is equivalent to reducing after every byte.
    for chunk in data.chunks(ADLER_NMAX) {
        for &byte in chunk {
            a += u32::from(byte);
            b += a;
        }
        a %= ADLER_MODULUS;
        b %= ADLER_MODULUS;
    }

    (b << 16) | a
}

/// Compress `data` into the zlib container.
///
/// # Errors
///
/// Fails only if the underlying deflate encoder fails.
pub fn deflate(data: &[u8]) -> std::io::Result<Bytes> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::default(),
    );
    encoder.write_all(data)?;
    let payload = encoder.finish()?;

    let mut output = BytesMut::with_capacity(ZLIB_HEADER.len() + payload.len() + 4);
    output.put_slice(&ZLIB_HEADER);
    output.put_slice(&payload);
    output.put_u32(adler32(data));

    Ok(output.freeze())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::ZlibDecoder;

    use super::*;

    fn inflate(container: &[u8]) -> Vec<u8> {
        let mut decoder = ZlibDecoder::new(container);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).expect("valid zlib stream");
        out
    }

    /// Per-byte reference, reducing after every step.
    fn adler32_reference(data: &[u8]) -> u32 {
        let (mut a, mut b) = (1_u32, 0_u32);
        for &x in data {
            a = (a + u32::from(x)) % ADLER_MODULUS;
            b = (b + a) % ADLER_MODULUS;
        }
        (b << 16) | a
    }

    #[test]
    fn adler32_known_values() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(&[1, 2, 3, 4]), (24 << 16) | 11);
        assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn adler32_matches_reference_on_long_input() {
        let data = (0..20_000_u32)
            .map(|i| u8::try_from(i % 251).unwrap_or(0) ^ 0xA5)
            .collect::<Vec<_>>();
        assert_eq!(adler32(&data), adler32_reference(&data));

        let max = vec![0xFF_u8; ADLER_NMAX * 3 + 17];
        assert_eq!(adler32(&max), adler32_reference(&max));
    }

    #[test]
    fn deflate_frames_payload() {
        let input = b"hello hello hello hello";
        let output = deflate(input).expect("deflate");

        assert_eq!(output.get(..2), Some(ZLIB_HEADER.as_slice()));
        let trailer = output.get(output.len() - 4..).expect("trailer");
        assert_eq!(trailer, adler32(input).to_be_bytes().as_slice());
    }

    #[test]
    fn deflate_is_zlib_compatible() {
        let inputs: [&[u8]; 4] = [
            b"",
            b"a",
            br#"{"name":"Rex","tags":["good","boy"]}"#,
            &[0_u8; 100_000],
        ];

        for input in inputs {
            let output = deflate(input).expect("deflate");
            assert_eq!(inflate(&output), input);
        }
    }

    #[test]
    fn deflate_compresses_repetitive_input() {
        let input = "mantle ".repeat(1_000);
        let output = deflate(input.as_bytes()).expect("deflate");
        assert!(output.len() < input.len() / 10);
    }
}

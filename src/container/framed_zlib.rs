//! Framed zlib - a 16-byte "WESYS/ESYS" envelope around a raw zlib stream.
//!
//! ## Layout
//! ```text
//! [0x00] 00 10 01                 (3 bytes, constant)
//! [0x03] "WESYS"                  (5 bytes)
//! [0x08] CompressedSize           (u32 LE)
//! [0x0C] UncompressedSize         (u32 LE)
//! [0x10] zlib stream (CompressedSize bytes)
//! ```
//!
//! Detection only looks at bytes `4..8` (`"ESYS"`), which lets a frame be
//! recognized even if the leading `00 10 01` constant ever changes.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::utils::{le_u32, write_le_u32};
use crate::{Error, Result};

const HEADER_LEN: usize = 16;
const ESYS: &[u8; 4] = b"ESYS";

/// Whether `data` begins with a recognizable frame header.
pub fn is_framed(data: &[u8]) -> bool {
    data.len() >= HEADER_LEN && &data[4..8] == ESYS
}

/// Zlib-compress `data` and unconditionally wrap it in a frame header.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .expect("writing to an in-memory encoder cannot fail");
    let payload = encoder.finish().expect("in-memory zlib finish");

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&[0x00, 0x10, 0x01]);
    out.extend_from_slice(b"WESYS");
    write_le_u32(&mut out, payload.len() as u32).unwrap();
    write_le_u32(&mut out, data.len() as u32).unwrap();
    out.extend_from_slice(&payload);
    out
}

/// Like [`compress`], but only frames when doing so is smaller than `data`
/// itself; otherwise returns `data` unchanged.
pub fn try_compress(data: &[u8]) -> Vec<u8> {
    let framed = compress(data);
    if framed.len() < data.len() {
        framed
    } else {
        data.to_vec()
    }
}

/// Unwrap and zlib-decompress a framed buffer.
///
/// Returns [`Error::BadMagic`] if `data` is not recognized as a frame.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if !is_framed(data) {
        return Err(Error::BadMagic);
    }
    let mut cursor = std::io::Cursor::new(&data[8..]);
    let compressed_size = le_u32(&mut cursor)? as usize;
    let uncompressed_size = le_u32(&mut cursor)? as usize;

    let body_start = HEADER_LEN;
    let body_end = body_start
        .checked_add(compressed_size)
        .ok_or(Error::InvalidRange)?;
    let body = data.get(body_start..body_end).ok_or(Error::UnexpectedEof)?;

    let mut decoder = ZlibDecoder::new(body);
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::Decompress("zlib stream corrupt"))?;

    if out.len() != uncompressed_size {
        return Err(Error::Decompress("uncompressed_size mismatch"));
    }
    Ok(out)
}

/// Like [`decompress`], but passes `data` through unchanged when it is not
/// a recognized frame instead of failing.
pub fn try_decompress(data: &[u8]) -> Result<Vec<u8>> {
    if is_framed(data) {
        decompress(data)
    } else {
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fixed_scenario() {
        // Framed "ABCDE".
        let input = [
            0x00, 0x10, 0x01, 0x57, 0x45, 0x53, 0x59, 0x53, 0x0B, 0x00, 0x00, 0x00, 0x05, 0x00,
            0x00, 0x00, 0x78, 0x9C, 0x4B, 0x4C, 0x4A, 0x4E, 0x61, 0x00, 0x00, 0x00, 0xFE, 0x00,
            0xFF,
        ];
        let out = decompress(&input).unwrap();
        assert_eq!(out, b"ABCDE");
    }

    #[test]
    fn round_trips_arbitrary_buffers() {
        for data in [&b""[..], b"hello\n", &[0u8; 4096], b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"] {
            let framed = compress(data);
            assert!(is_framed(&framed));
            assert_eq!(decompress(&framed).unwrap(), data);
        }
    }

    #[test]
    fn try_round_trip_regardless_of_framing_decision() {
        for data in [&b""[..], b"x", &vec![0x41u8; 1 << 20][..]] {
            let framed = try_compress(data);
            assert_eq!(try_decompress(&framed).unwrap(), data);
        }
    }

    #[test]
    fn decompress_rejects_unframed_input() {
        assert!(decompress(b"not a frame at all!!").is_err());
    }

    #[test]
    fn try_decompress_passes_through_unframed_input() {
        let data = b"plain bytes";
        assert_eq!(try_decompress(data).unwrap(), data);
    }
}

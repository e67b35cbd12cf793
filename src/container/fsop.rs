//! FSOP - a stream of named, XOR-obfuscated vertex/pixel shader pairs.
//!
//! ## Record layout
//! ```text
//! name_length:u8 | name_utf8 | 0x00 | vertex_len:u32le | vertex_bytes
//!                | pixel_len:u32le | pixel_bytes
//! ```
//! `name_length` counts the trailing NUL, so the name itself is
//! `name_length - 1` bytes. Records run back-to-back until EOF. Both
//! shader bodies are stored XOR-masked with the constant `0x9C`, which is
//! its own inverse.

use std::collections::BTreeMap;
use std::io::Read;

use crate::utils::{le_u32, u8 as read_u8, write_le_u32};
use crate::Result;

const MASK: u8 = 0x9C;

/// One named pair of compiled shader blobs, stored plaintext (unmasked).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: Vec<u8>,
    pub pixel: Vec<u8>,
}

fn xor_mask(data: &[u8]) -> Vec<u8> {
    data.iter().map(|&b| b ^ MASK).collect()
}

/// Decode a stream of FSOP records into a name → shader-pair map.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, ShaderPair>> {
    let mut c = std::io::Cursor::new(bytes);
    let mut out = BTreeMap::new();
    loop {
        let name_length = match read_u8(&mut c) {
            Ok(b) => b,
            Err(_) => break,
        };
        // name_length counts the trailing NUL, so the name itself is one byte shorter.
        let name_span = (name_length as usize)
            .checked_sub(1)
            .ok_or(crate::Error::Parse("FSOP record name_length is zero"))?;
        let mut name_bytes = vec![0u8; name_span];
        c.read_exact(&mut name_bytes)?;
        let terminator = read_u8(&mut c)?;
        if terminator != 0 {
            return Err(crate::Error::Parse("FSOP record name is not NUL-terminated"));
        }
        let name = String::from_utf8_lossy(&name_bytes).into_owned();

        let vertex_len = le_u32(&mut c)? as usize;
        let mut vertex = vec![0u8; vertex_len];
        c.read_exact(&mut vertex)?;

        let pixel_len = le_u32(&mut c)? as usize;
        let mut pixel = vec![0u8; pixel_len];
        c.read_exact(&mut pixel)?;

        out.insert(
            name,
            ShaderPair {
                vertex: xor_mask(&vertex),
                pixel: xor_mask(&pixel),
            },
        );
    }
    Ok(out)
}

/// Encode a name → shader-pair map into an FSOP stream, in filename sort
/// order.
pub fn encode(entries: &BTreeMap<String, ShaderPair>) -> Result<Vec<u8>> {
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

    let mut out = Vec::new();
    for name in names {
        let pair = &entries[name];
        let name_bytes = name.as_bytes();
        out.push(name_bytes.len() as u8 + 1); // +1 for the trailing NUL
        out.extend_from_slice(name_bytes);
        out.push(0);

        let vertex = xor_mask(&pair.vertex);
        write_le_u32(&mut out, vertex.len() as u32)?;
        out.extend_from_slice(&vertex);

        let pixel = xor_mask(&pair.pixel);
        write_le_u32(&mut out, pixel.len() as u32)?;
        out.extend_from_slice(&pixel);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xor_mask_is_its_own_inverse() {
        let data = [0x01u8, 0x02, 0x03];
        assert_eq!(xor_mask(&xor_mask(&data)), data);
    }

    #[test]
    fn round_trips_multiple_pairs_sorted_by_name() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "tree.vsh".to_string(),
            ShaderPair {
                vertex: b"vertex code a".to_vec(),
                pixel: b"pixel code a".to_vec(),
            },
        );
        entries.insert(
            "ball.vsh".to_string(),
            ShaderPair {
                vertex: b"vertex code b".to_vec(),
                pixel: b"pixel code b".to_vec(),
            },
        );

        let encoded = encode(&entries).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn name_length_byte_counts_the_trailing_nul() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "ab".to_string(),
            ShaderPair {
                vertex: Vec::new(),
                pixel: Vec::new(),
            },
        );
        let encoded = encode(&entries).unwrap();
        assert_eq!(encoded[0], 3); // "ab" (2 bytes) + NUL
    }

    #[test]
    fn round_trips_when_vertex_length_low_byte_is_nonzero() {
        // A vertex body whose length's low byte isn't 0 would, under the
        // old off-by-one framing, get misread as the name's NUL terminator.
        let mut entries = BTreeMap::new();
        entries.insert(
            "big.vsh".to_string(),
            ShaderPair {
                vertex: vec![0x42u8; 300],
                pixel: vec![0x24u8; 10],
            },
        );
        let encoded = encode(&entries).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn on_disk_bodies_are_masked_not_plaintext() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "a".to_string(),
            ShaderPair {
                vertex: b"hello".to_vec(),
                pixel: Vec::new(),
            },
        );
        let encoded = encode(&entries).unwrap();
        assert!(!encoded.windows(5).any(|w| w == b"hello"));
    }

    #[test]
    fn handles_empty_stream() {
        assert!(decode(&[]).unwrap().is_empty());
    }
}

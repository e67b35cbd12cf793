//! UniformParameter - an indexed blob table with a NUL-terminated filename
//! pool.
//!
//! ## Layout
//! ```text
//! entry_count:u32le | entry_offset:u32le (=8)
//! entry[entry_count] (12 bytes each):
//!   content_offset:u32 | content_length:u32 | filename_offset:u32
//! filenames, NUL-terminated UTF-8, back-to-back
//! contents, each padded to 16 bytes
//! ```

use crate::utils::{le_u32, null_string, write_le_u32};
use crate::{Error, Result};
use std::collections::BTreeMap;

const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;
const ENTRY_OFFSET: u32 = 8;
const PAD: usize = 16;

/// Decode a UniformParameter table into a name → content map.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::UnexpectedEof);
    }
    let mut c = std::io::Cursor::new(bytes);
    let entry_count = le_u32(&mut c)? as usize;
    let entry_offset = le_u32(&mut c)? as usize;

    let mut result = BTreeMap::new();
    for i in 0..entry_count {
        let base = entry_offset + i * ENTRY_LEN;
        let entry_bytes = bytes.get(base..base + ENTRY_LEN).ok_or(Error::UnexpectedEof)?;
        let mut ec = std::io::Cursor::new(entry_bytes);
        let content_offset = le_u32(&mut ec)? as usize;
        let content_length = le_u32(&mut ec)? as usize;
        let filename_offset = le_u32(&mut ec)? as usize;

        let name = null_string(bytes, filename_offset)?;
        let content = bytes
            .get(content_offset..content_offset + content_length)
            .ok_or(Error::InvalidRange)?
            .to_vec();
        if result.insert(name, content).is_some() {
            return Err(Error::Parse("UniformParameter table has a duplicate filename"));
        }
    }
    Ok(result)
}

/// Encode a name → content map into a UniformParameter table, with
/// filenames sorted lexicographically.
pub fn encode(entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();

    let entry_count = names.len();
    let entry_table_len = entry_count * ENTRY_LEN;

    let mut filename_pool = Vec::new();
    let mut filename_offsets = Vec::with_capacity(entry_count);
    let pool_start = HEADER_LEN + entry_table_len;
    for name in &names {
        filename_offsets.push(pool_start + filename_pool.len());
        filename_pool.extend_from_slice(name.as_bytes());
        filename_pool.push(0);
    }

    let content_start = pool_start + filename_pool.len();
    let mut content_pool = Vec::new();
    let mut content_spans = Vec::with_capacity(entry_count);
    for name in &names {
        let data = &entries[*name];
        content_spans.push((content_start + content_pool.len(), data.len()));
        content_pool.extend_from_slice(data);
        crate::utils::pad_to(&mut content_pool, PAD);
    }

    let mut out = Vec::with_capacity(content_start + content_pool.len());
    write_le_u32(&mut out, entry_count as u32)?;
    write_le_u32(&mut out, ENTRY_OFFSET)?;
    for (i, _name) in names.iter().enumerate() {
        let (content_offset, content_length) = content_spans[i];
        write_le_u32(&mut out, content_offset as u32)?;
        write_le_u32(&mut out, content_length as u32)?;
        write_le_u32(&mut out, filename_offsets[i] as u32)?;
    }
    out.extend_from_slice(&filename_pool);
    out.extend_from_slice(&content_pool);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_multiple_entries_sorted_by_name() {
        let mut entries = BTreeMap::new();
        entries.insert("fresnel".to_string(), b"0.5".to_vec());
        entries.insert("ambient".to_string(), b"0.1 0.1 0.1".to_vec());
        let encoded = encode(&entries).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn entry_offset_field_is_eight() {
        let entries = BTreeMap::new();
        let encoded = encode(&entries).unwrap();
        let entry_offset = le_u32(&mut std::io::Cursor::new(&encoded[4..8])).unwrap();
        assert_eq!(entry_offset, 8);
    }

    #[test]
    fn handles_zero_entries() {
        let entries = BTreeMap::new();
        let encoded = encode(&entries).unwrap();
        assert!(decode(&encoded).unwrap().is_empty());
    }
}

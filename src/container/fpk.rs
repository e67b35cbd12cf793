//! FPK - a flat "fox package" archive keyed by the MD5 of each entry's
//! filename.
//!
//! ## Layout
//! ```text
//! "foxfpk" | kind:u8 | "win" | file_size:u32 | pad[18] | unk1:u32=2
//!          | file_count:u32 | reference_count:u32=0 | unk2:u32=0
//! entry[file_count] (48 bytes each):
//!   content_offset:u64 | content_length:u64 | filename_offset:u64
//!   | filename_length:u64 | md5:16
//! filenames, NUL-separated, the whole pool padded to 16 bytes
//! contents, each individually padded to 16 bytes
//! ```
//!
//! `kind` distinguishes the `.fpk`/`.fpkd` variants; it otherwise has no
//! effect on layout.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use md5::{Digest, Md5};

use crate::utils::{
    bytesa, bytesv, le_u32, le_u64, pad_to, u8 as read_u8, write_le_u32, write_le_u64,
};
use crate::{Error, Result};

const HEADER_LEN: usize = 48;
const ENTRY_LEN: usize = 48;
const PAD: usize = 16;

/// `kind` byte distinguishing `.fpk` from `.fpkd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpkKind {
    Fpk,
    Fpkd,
}

impl FpkKind {
    fn byte(self) -> u8 {
        match self {
            FpkKind::Fpk => 0x00,
            FpkKind::Fpkd => b'd',
        }
    }

    fn from_byte(b: u8) -> Self {
        if b == b'd' { FpkKind::Fpkd } else { FpkKind::Fpk }
    }
}

fn md5_of(filename: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(filename.as_bytes());
    hasher.finalize().into()
}

/// Decode an FPK archive into a name → content map.
pub fn decode(bytes: &[u8]) -> Result<(FpkKind, BTreeMap<String, Vec<u8>>)> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::UnexpectedEof);
    }
    let mut c = std::io::Cursor::new(bytes);
    let magic: [u8; 6] = bytesa(&mut c)?;
    if &magic != b"foxfpk" {
        return Err(Error::BadMagic);
    }
    let kind = FpkKind::from_byte(read_u8(&mut c)?);
    let os_tag: [u8; 3] = bytesa(&mut c)?;
    if &os_tag != b"win" {
        return Err(Error::BadMagic);
    }
    let file_size = le_u32(&mut c)?;
    if file_size as usize != bytes.len() {
        return Err(Error::Parse("FPK file_size does not match buffer length"));
    }
    let _pad: [u8; 18] = bytesa(&mut c)?;
    let _unk1 = le_u32(&mut c)?;
    let file_count = le_u32(&mut c)? as usize;
    let _reference_count = le_u32(&mut c)?;
    let _unk2 = le_u32(&mut c)?;

    let mut entries = Vec::with_capacity(file_count);
    for _ in 0..file_count {
        let content_offset = le_u64(&mut c)? as usize;
        let content_length = le_u64(&mut c)? as usize;
        let filename_offset = le_u64(&mut c)? as usize;
        let filename_length = le_u64(&mut c)? as usize;
        let md5: [u8; 16] = bytesa(&mut c)?;
        entries.push((content_offset, content_length, filename_offset, filename_length, md5));
    }

    let mut result = BTreeMap::new();
    let mut seen_names = std::collections::BTreeSet::new();
    for (content_offset, content_length, filename_offset, filename_length, md5) in entries {
        let name_bytes = bytes
            .get(filename_offset..filename_offset + filename_length)
            .ok_or(Error::InvalidRange)?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        if !seen_names.insert(name.clone()) {
            return Err(Error::Parse("FPK archive has a duplicate filename"));
        }
        if md5_of(&name) != md5 {
            return Err(Error::ChecksumMismatch);
        }
        let content = bytes
            .get(content_offset..content_offset + content_length)
            .ok_or(Error::InvalidRange)?
            .to_vec();
        result.insert(name, content);
    }

    Ok((kind, result))
}

/// Encode a name → content map into an FPK archive, sorted by filename
/// (byte-lexicographic).
pub fn encode(kind: FpkKind, entries: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

    let file_count = names.len();
    let entry_table_len = file_count * ENTRY_LEN;

    let mut filename_pool = Vec::new();
    let mut filename_spans = Vec::with_capacity(file_count);
    for (i, name) in names.iter().enumerate() {
        let offset = HEADER_LEN + entry_table_len + filename_pool.len();
        filename_pool.extend_from_slice(name.as_bytes());
        if i + 1 < file_count {
            filename_pool.push(0);
        }
        filename_spans.push((offset, name.len()));
    }
    pad_to(&mut filename_pool, PAD);

    let content_start = HEADER_LEN + entry_table_len + filename_pool.len();
    let mut content_pool = Vec::new();
    let mut content_spans = Vec::with_capacity(file_count);
    for name in &names {
        let data = &entries[*name];
        let offset = content_start + content_pool.len();
        content_pool.extend_from_slice(data);
        pad_to(&mut content_pool, PAD);
        content_spans.push((offset, data.len()));
    }

    let file_size = content_start + content_pool.len();

    let mut out = Vec::with_capacity(file_size);
    out.extend_from_slice(b"foxfpk");
    out.push(kind.byte());
    out.extend_from_slice(b"win");
    write_le_u32(&mut out, file_size as u32)?;
    out.extend_from_slice(&[0u8; 18]);
    write_le_u32(&mut out, 2)?; // unk1
    write_le_u32(&mut out, file_count as u32)?;
    write_le_u32(&mut out, 0)?; // reference_count
    write_le_u32(&mut out, 0)?; // unk2

    for (i, name) in names.iter().enumerate() {
        let (content_offset, content_length) = content_spans[i];
        let (filename_offset, filename_length) = filename_spans[i];
        write_le_u64(&mut out, content_offset as u64)?;
        write_le_u64(&mut out, content_length as u64)?;
        write_le_u64(&mut out, filename_offset as u64)?;
        write_le_u64(&mut out, filename_length as u64)?;
        out.extend_from_slice(&md5_of(name));
    }

    out.extend_from_slice(&filename_pool);
    out.extend_from_slice(&content_pool);
    Ok(out)
}

/// Streaming reader over an FPK archive's header and entry table, without
/// loading every content blob up front.
pub struct FpkReader<R> {
    inner: R,
    pub kind: FpkKind,
    pub names: Vec<String>,
    spans: BTreeMap<String, (usize, usize)>,
}

impl<R: Read + Seek> FpkReader<R> {
    /// Read and validate the header and entry table, but not the contents.
    pub fn new(mut inner: R) -> Result<Self> {
        inner.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 6];
        inner.read_exact(&mut magic)?;
        if &magic != b"foxfpk" {
            return Err(Error::BadMagic);
        }
        let kind = FpkKind::from_byte(read_u8(&mut inner)?);
        let mut os_tag = [0u8; 3];
        inner.read_exact(&mut os_tag)?;
        if &os_tag != b"win" {
            return Err(Error::BadMagic);
        }
        let _file_size = le_u32(&mut inner)?;
        let mut pad = [0u8; 18];
        inner.read_exact(&mut pad)?;
        let _unk1 = le_u32(&mut inner)?;
        let file_count = le_u32(&mut inner)? as usize;
        let _reference_count = le_u32(&mut inner)?;
        let _unk2 = le_u32(&mut inner)?;

        let mut raw_entries = Vec::with_capacity(file_count);
        for _ in 0..file_count {
            let content_offset = le_u64(&mut inner)? as usize;
            let content_length = le_u64(&mut inner)? as usize;
            let filename_offset = le_u64(&mut inner)? as usize;
            let filename_length = le_u64(&mut inner)? as usize;
            let md5: [u8; 16] = bytesa(&mut inner)?;
            raw_entries.push((content_offset, content_length, filename_offset, filename_length, md5));
        }

        let mut names = Vec::with_capacity(file_count);
        let mut spans = BTreeMap::new();
        for (content_offset, content_length, filename_offset, filename_length, md5) in raw_entries {
            inner.seek(SeekFrom::Start(filename_offset as u64))?;
            let name_bytes = bytesv(&mut inner, filename_length)?;
            let name = String::from_utf8_lossy(&name_bytes).into_owned();
            if md5_of(&name) != md5 {
                return Err(Error::ChecksumMismatch);
            }
            if spans.insert(name.clone(), (content_offset, content_length)).is_some() {
                return Err(Error::Parse("FPK archive has a duplicate filename"));
            }
            names.push(name);
        }

        Ok(Self { inner, kind, names, spans })
    }

    /// Read one entry's content by name.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let &(offset, length) = self
            .spans
            .get(name)
            .ok_or_else(|| Error::Parse("no such FPK entry"))?;
        self.inner.seek(SeekFrom::Start(offset as u64))?;
        bytesv(&mut self.inner, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_matches_fixed_scenario() {
        assert_eq!(hex(&md5_of("x")), "fbade9e36a3f36d3d676c1b808451dd7");
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn single_entry_content_offset_matches_fixed_scenario() {
        let mut entries = BTreeMap::new();
        entries.insert("x".to_string(), b"y".to_vec());
        let encoded = encode(FpkKind::Fpk, &entries).unwrap();

        // header(48) + entry(48) + filename pool ("x\0" padded to 16) = 112.
        let content_offset = le_u64(&mut std::io::Cursor::new(&encoded[48..56])).unwrap();
        assert_eq!(content_offset, 112);
        assert_eq!(&encoded[112..113], b"y");
        assert_eq!(
            hex(&md5_of("x")),
            "fbade9e36a3f36d3d676c1b808451dd7"
        );
    }

    #[test]
    fn round_trips_multiple_entries_sorted_by_name() {
        let mut entries = BTreeMap::new();
        entries.insert("b.txt".to_string(), b"second".to_vec());
        entries.insert("a.txt".to_string(), b"first file contents".to_vec());
        let encoded = encode(FpkKind::Fpkd, &entries).unwrap();
        let (kind, decoded) = decode(&encoded).unwrap();
        assert_eq!(kind, FpkKind::Fpkd);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn rejects_tampered_md5() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), b"1".to_vec());
        let mut encoded = encode(FpkKind::Fpk, &entries).unwrap();
        let md5_offset = 48 + 32; // entry's md5 field starts at byte 32 of the entry.
        encoded[md5_offset] ^= 0xFF;
        assert!(matches!(decode(&encoded), Err(Error::ChecksumMismatch)));
    }

    #[test]
    fn streaming_reader_matches_bulk_decode() {
        let mut entries = BTreeMap::new();
        entries.insert("shader.vsh".to_string(), vec![7u8; 40]);
        let encoded = encode(FpkKind::Fpk, &entries).unwrap();
        let mut reader = FpkReader::new(std::io::Cursor::new(encoded)).unwrap();
        assert_eq!(reader.names, vec!["shader.vsh".to_string()]);
        assert_eq!(reader.read("shader.vsh").unwrap(), vec![7u8; 40]);
    }
}

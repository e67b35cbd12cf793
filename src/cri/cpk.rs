//! CPK archive - a packed-file container described by three UTF tables
//! (header, table of contents, extended TOC) with file payloads between
//! a fixed 0x800-byte preamble and the TOC.
//!
//! ## Layout
//! ```text
//! [0x000] preamble (header table, 0x800 bytes)
//! [0x800] file payloads, each right-padded to `alignment`
//!         TOC table ("TOC ")
//!         padding to `alignment` (only if ETOC follows)
//!         ETOC table ("ETOC"), optional
//! ```
//! The header table is written last, over the already-reserved preamble,
//! once the TOC/ETOC positions are known.

use std::io::{Read, Seek, SeekFrom, Take};
use std::ops::Index;

use crate::cri::crilayla;
use crate::cri::utf::{DatumType, UtfTable, UtfValue};
use crate::utils::{bytesv, pad_to};
use crate::{Error, Result};

const CONTENT_ORIGIN: u64 = 0x800;
const DEFAULT_ALIGNMENT: u64 = 0x800;
const PREAMBLE_LEN: usize = 0x800;
const COPYRIGHT_TRAILER_OFFSET: usize = 0x7FA;

/// A CPK timestamp, bit-packed into a big-endian `I64` UTF cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpkTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl CpkTimestamp {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    fn to_packed(self) -> i64 {
        ((self.year as i64) << 48)
            | ((self.month as i64) << 40)
            | ((self.day as i64) << 32)
            | ((self.hour as i64) << 24)
            | ((self.minute as i64) << 16)
            | ((self.second as i64) << 8)
    }

    fn from_packed(v: i64) -> Self {
        let v = v as u64;
        Self {
            year: ((v >> 48) & 0xFFFF) as u16,
            month: ((v >> 40) & 0xFF) as u8,
            day: ((v >> 32) & 0xFF) as u8,
            hour: ((v >> 24) & 0xFF) as u8,
            minute: ((v >> 16) & 0xFF) as u8,
            second: ((v >> 8) & 0xFF) as u8,
        }
    }
}

/// A decoded CPK file entry.
#[derive(Debug, Clone)]
pub struct CpkFileEntry {
    pub name: String,
    pub uncompressed_size: u32,
    pub absolute_offset: u64,
    pub compressed_size: u32,
    pub modification_time: Option<CpkTimestamp>,
}

/// Parsed archive metadata. File contents are fetched through
/// [`CpkReader::read_file`].
#[derive(Debug)]
pub struct CpkArchive {
    pub entries: Vec<CpkFileEntry>,
}

impl CpkArchive {
    /// Parse a CPK archive's tables from `r`, positioned at its start.
    ///
    /// Does not read file payloads.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let base = r.stream_position()?;
        let end = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(base))?;

        let preamble = bytesv(r, PREAMBLE_LEN)?;
        let header = UtfTable::decode(&preamble, b"CPK ")?;

        // ContentOffset's value is ignored (readers hard-code 0x800) but its
        // presence is still mandatory.
        required_i64(&header, "ContentOffset")?;
        let toc_offset = required_i64(&header, "TocOffset")? as u64;

        let toc_abs = base + toc_offset;
        r.seek(SeekFrom::Start(toc_abs))?;
        let toc_bytes = bytesv(r, (end - toc_abs) as usize)?;
        let toc = UtfTable::decode(&toc_bytes, b"TOC ")?;

        let dir_idx = toc.column_index("DirName").ok_or(Error::Parse("TOC missing DirName"))?;
        let file_idx = toc
            .column_index("FileName")
            .ok_or(Error::Parse("TOC missing FileName"))?;
        let size_idx = toc.column_index("FileSize").ok_or(Error::Parse("TOC missing FileSize"))?;
        let extract_idx = toc
            .column_index("ExtractSize")
            .ok_or(Error::Parse("TOC missing ExtractSize"))?;
        let offset_idx = toc
            .column_index("FileOffset")
            .ok_or(Error::Parse("TOC missing FileOffset"))?;

        let etoc = match optional_i64(&header, "EtocOffset")? {
            Some(etoc_offset) => {
                let etoc_abs = base + etoc_offset as u64;
                r.seek(SeekFrom::Start(etoc_abs))?;
                let etoc_bytes = bytesv(r, (end - etoc_abs) as usize)?;
                let table = UtfTable::decode(&etoc_bytes, b"ETOC")?;
                if table.column_index("UpdateDateTime").is_some() {
                    Some(table)
                } else {
                    None
                }
            }
            None => None,
        };
        let etoc_timestamp_idx = etoc.as_ref().and_then(|t| t.column_index("UpdateDateTime"));

        let mut entries = Vec::with_capacity(toc.rows.len());
        for row in &toc.rows {
            let dir = row_str(row, dir_idx)?;
            let file = row_str(row, file_idx)?;
            let name = join_packed_path(&dir, &file);
            let compressed_size = row_i32(row, size_idx)? as u32;
            let uncompressed_size = row_i32(row, extract_idx)? as u32;
            let relative_offset = row_i64(row, offset_idx)?;
            let absolute_offset = CONTENT_ORIGIN + relative_offset as u64;

            let modification_time = match (&etoc, etoc_timestamp_idx) {
                (Some(table), Some(idx)) => match table.rows.get(entries.len()) {
                    Some(etoc_row) => match &etoc_row[idx] {
                        UtfValue::I64(v) if *v != 0 => Some(CpkTimestamp::from_packed(*v)),
                        _ => None,
                    },
                    None => None,
                },
                _ => None,
            };

            entries.push(CpkFileEntry {
                name,
                uncompressed_size,
                absolute_offset,
                compressed_size,
                modification_time,
            });
        }

        Ok(Self { entries })
    }
}

/// Streaming reader wrapper around a [`CpkArchive`].
pub struct CpkReader<R> {
    inner: R,
    pub archive: CpkArchive,
}

impl<R: Read + Seek> CpkReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let archive = CpkArchive::parse(&mut reader)?;
        Ok(Self {
            inner: reader,
            archive,
        })
    }

    /// Seek to `entry`'s payload and return a bounded, still-compressed view.
    pub fn open_raw(&mut self, entry: &CpkFileEntry) -> Result<Take<&mut R>> {
        self.inner.seek(SeekFrom::Start(entry.absolute_offset))?;
        Ok(self.inner.by_ref().take(entry.compressed_size as u64))
    }

    /// Read and, if necessary, CRILAYLA-decompress `entry`'s full contents.
    pub fn read_file(&mut self, entry: &CpkFileEntry) -> Result<Vec<u8>> {
        self.inner.seek(SeekFrom::Start(entry.absolute_offset))?;
        let raw = bytesv(&mut self.inner, entry.compressed_size as usize)?;
        if entry.uncompressed_size != entry.compressed_size
            && raw.len() >= 16
            && &raw[0..8] == b"CRILAYLA"
        {
            crilayla::decompress(&raw)
        } else {
            Ok(raw)
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &CpkFileEntry> {
        self.archive.entries.iter()
    }

    pub fn get_entry_by_name(&self, name: &str) -> Option<&CpkFileEntry> {
        self.archive.entries.iter().find(|e| e.name == name)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Index<&str> for CpkReader<R> {
    type Output = CpkFileEntry;

    /// Index by packed path. Panics if no entry has that name.
    fn index(&self, name: &str) -> &CpkFileEntry {
        self.get_entry_by_name(name)
            .unwrap_or_else(|| panic!("no CPK entry named {name:?}"))
    }
}

struct BuilderEntry {
    packed_path: String,
    data: Vec<u8>,
    modification_time: Option<CpkTimestamp>,
}

/// Incrementally assembles a CPK archive in memory.
#[derive(Default)]
pub struct CpkBuilder {
    entries: Vec<BuilderEntry>,
}

impl CpkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `packed_path` (e.g. `"chara/face.ftex"`).
    ///
    /// Returns [`Error::DuplicateEntry`] if `packed_path` was already
    /// added, leaving the builder unmodified.
    pub fn add_file(
        &mut self,
        packed_path: impl Into<String>,
        data: Vec<u8>,
        modification_time: Option<CpkTimestamp>,
    ) -> Result<()> {
        let packed_path = packed_path.into();
        if self.entries.iter().any(|e| e.packed_path == packed_path) {
            return Err(Error::DuplicateEntry);
        }
        self.entries.push(BuilderEntry {
            packed_path,
            data,
            modification_time,
        });
        Ok(())
    }

    /// Build the archive with the default 0x800-byte alignment.
    pub fn build(&self) -> Result<Vec<u8>> {
        self.build_with_alignment(DEFAULT_ALIGNMENT)
    }

    /// Build the archive, padding each payload and the ETOC boundary to
    /// `alignment` bytes.
    pub fn build_with_alignment(&self, alignment: u64) -> Result<Vec<u8>> {
        let mut sorted: Vec<&BuilderEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            a.packed_path
                .to_uppercase()
                .cmp(&b.packed_path.to_uppercase())
        });

        let mut out = vec![0u8; PREAMBLE_LEN];
        let mut relative_offsets = Vec::with_capacity(sorted.len());
        for entry in &sorted {
            let absolute_offset = out.len() as u64;
            relative_offsets.push(absolute_offset - CONTENT_ORIGIN);
            out.extend_from_slice(&entry.data);
            pad_to(&mut out, alignment as usize);
        }

        let toc_offset = out.len() as u64;
        let toc_columns = vec![
            ("DirName".to_string(), DatumType::Str),
            ("FileName".to_string(), DatumType::Str),
            ("FileSize".to_string(), DatumType::I32),
            ("ExtractSize".to_string(), DatumType::I32),
            ("FileOffset".to_string(), DatumType::I64),
            ("ID".to_string(), DatumType::I32),
            ("UserString".to_string(), DatumType::Str),
        ];
        let mut toc_rows = Vec::with_capacity(sorted.len());
        for (i, entry) in sorted.iter().enumerate() {
            let (dir, file) = split_packed_path(&entry.packed_path);
            toc_rows.push(vec![
                UtfValue::Str(dir),
                UtfValue::Str(file),
                UtfValue::I32(entry.data.len() as i32),
                UtfValue::I32(entry.data.len() as i32),
                UtfValue::I64(relative_offsets[i] as i64),
                UtfValue::I32(i as i32),
                UtfValue::Str(String::new()),
            ]);
        }
        let toc_bytes = UtfTable::build("CpkTocInfo", toc_columns, toc_rows).encode(b"TOC ")?;
        out.extend_from_slice(&toc_bytes);

        let all_timestamped = !sorted.is_empty() && sorted.iter().all(|e| e.modification_time.is_some());
        let mut etoc_offset = None;
        let mut etoc_size = None;
        if all_timestamped {
            pad_to(&mut out, alignment as usize);
            let pos = out.len() as u64;
            let mut rows: Vec<Vec<UtfValue>> = sorted
                .iter()
                .map(|e| {
                    vec![
                        UtfValue::I64(e.modification_time.unwrap().to_packed()),
                        UtfValue::Str(String::new()),
                    ]
                })
                .collect();
            rows.push(vec![UtfValue::I64(0), UtfValue::Str(String::new())]);
            let etoc_columns = vec![
                ("UpdateDateTime".to_string(), DatumType::I64),
                ("LocalDir".to_string(), DatumType::Str),
            ];
            let etoc_bytes = UtfTable::build("CpkEtocInfo", etoc_columns, rows).encode(b"ETOC")?;
            etoc_offset = Some(pos);
            etoc_size = Some(etoc_bytes.len() as u64);
            out.extend_from_slice(&etoc_bytes);
        }

        let total_uncompressed: i64 = sorted.iter().map(|e| e.data.len() as i64).sum();
        let header_bytes = build_header_table(
            toc_offset,
            toc_bytes.len() as u64,
            etoc_offset,
            etoc_size,
            sorted.len() as i32,
            alignment,
            total_uncompressed,
        )?
        .encode(b"CPK ")?;

        if header_bytes.len() > COPYRIGHT_TRAILER_OFFSET {
            return Err(Error::Parse("CPK header table does not fit in the preamble"));
        }
        out[..header_bytes.len()].copy_from_slice(&header_bytes);
        out[COPYRIGHT_TRAILER_OFFSET..PREAMBLE_LEN].copy_from_slice(b"(c)CRI");

        Ok(out)
    }
}

#[allow(clippy::too_many_arguments)]
fn build_header_table(
    toc_offset: u64,
    toc_size: u64,
    etoc_offset: Option<u64>,
    etoc_size: Option<u64>,
    file_count: i32,
    alignment: u64,
    total_uncompressed: i64,
) -> Result<UtfTable> {
    let i64_null = UtfValue::Null;
    let i32_null = UtfValue::Null;
    let i16_null = UtfValue::Null;

    let columns = vec![
        ("UpdateDateTime".to_string(), DatumType::I64),
        ("FileSize".to_string(), DatumType::I64),
        ("ContentOffset".to_string(), DatumType::I64),
        ("ContentSize".to_string(), DatumType::I64),
        ("TocOffset".to_string(), DatumType::I64),
        ("TocSize".to_string(), DatumType::I64),
        ("TocCrc".to_string(), DatumType::I32),
        ("HtocOffset".to_string(), DatumType::I64),
        ("HtocSize".to_string(), DatumType::I64),
        ("EtocOffset".to_string(), DatumType::I64),
        ("EtocSize".to_string(), DatumType::I64),
        ("ItocOffset".to_string(), DatumType::I64),
        ("ItocSize".to_string(), DatumType::I64),
        ("ItocCrc".to_string(), DatumType::I32),
        ("GtocOffset".to_string(), DatumType::I64),
        ("GtocSize".to_string(), DatumType::I64),
        ("GtocCrc".to_string(), DatumType::I32),
        ("HgtocOffset".to_string(), DatumType::I64),
        ("HgtocSize".to_string(), DatumType::I64),
        ("EnabledPackedSize".to_string(), DatumType::I64),
        ("EnabledDataSize".to_string(), DatumType::I64),
        ("TotalDataSize".to_string(), DatumType::I64),
        ("Tocs".to_string(), DatumType::I32),
        ("Files".to_string(), DatumType::I32),
        ("Groups".to_string(), DatumType::I32),
        ("Attrs".to_string(), DatumType::I32),
        ("TotalFiles".to_string(), DatumType::I32),
        ("Directories".to_string(), DatumType::I32),
        ("Updates".to_string(), DatumType::I32),
        ("Version".to_string(), DatumType::I16),
        ("Revision".to_string(), DatumType::I16),
        ("Align".to_string(), DatumType::I16),
        ("Sorted".to_string(), DatumType::I16),
        ("EnableFileName".to_string(), DatumType::I16),
        ("EID".to_string(), DatumType::I16),
        ("CpkMode".to_string(), DatumType::I32),
        ("Tvers".to_string(), DatumType::Str),
        ("Comment".to_string(), DatumType::Str),
        ("Codec".to_string(), DatumType::I32),
        ("DpkItoc".to_string(), DatumType::I32),
        ("EnableTocCrc".to_string(), DatumType::I16),
        ("EnableFileCrc".to_string(), DatumType::I16),
        ("CrcMode".to_string(), DatumType::I32),
        ("CrcTable".to_string(), DatumType::Bytes),
    ];

    let row = vec![
        UtfValue::I64(1),                                       // UpdateDateTime
        i64_null.clone(),                                       // FileSize
        UtfValue::I64(CONTENT_ORIGIN as i64),                    // ContentOffset
        UtfValue::I64(toc_offset as i64 - CONTENT_ORIGIN as i64), // ContentSize
        UtfValue::I64(toc_offset as i64),                        // TocOffset
        UtfValue::I64(toc_size as i64),                          // TocSize
        i32_null.clone(),                                        // TocCrc
        i64_null.clone(),                                        // HtocOffset
        i64_null.clone(),                                        // HtocSize
        etoc_offset.map(|v| UtfValue::I64(v as i64)).unwrap_or(UtfValue::Null), // EtocOffset
        etoc_size.map(|v| UtfValue::I64(v as i64)).unwrap_or(UtfValue::Null),   // EtocSize
        i64_null.clone(),                                        // ItocOffset
        i64_null.clone(),                                        // ItocSize
        i32_null.clone(),                                        // ItocCrc
        i64_null.clone(),                                        // GtocOffset
        i64_null.clone(),                                        // GtocSize
        i32_null.clone(),                                        // GtocCrc
        i64_null.clone(),                                        // HgtocOffset
        i64_null.clone(),                                        // HgtocSize
        UtfValue::I64(total_uncompressed),                       // EnabledPackedSize
        UtfValue::I64(total_uncompressed),                       // EnabledDataSize
        i64_null.clone(),                                        // TotalDataSize
        i32_null.clone(),                                        // Tocs
        UtfValue::I32(file_count),                               // Files
        UtfValue::I32(0),                                        // Groups
        UtfValue::I32(0),                                        // Attrs
        i32_null.clone(),                                        // TotalFiles
        i32_null.clone(),                                        // Directories
        i32_null.clone(),                                        // Updates
        UtfValue::I16(7),                                        // Version
        UtfValue::I16(14),                                       // Revision
        UtfValue::I16(alignment as i16),                         // Align
        UtfValue::I16(1),                                        // Sorted
        UtfValue::I16(1),                                        // EnableFileName
        i16_null.clone(),                                        // EID
        UtfValue::I32(1),                                        // CpkMode
        UtfValue::Str("pes-file-tools".to_string()),             // Tvers
        UtfValue::Str(String::new()),                            // Comment
        UtfValue::I32(0),                                        // Codec
        UtfValue::I32(0),                                        // DpkItoc
        UtfValue::I16(0),                                        // EnableTocCrc
        UtfValue::I16(0),                                        // EnableFileCrc
        UtfValue::I32(0),                                        // CrcMode
        UtfValue::Bytes(Vec::new()),                             // CrcTable
    ];

    Ok(UtfTable::build("CpkHeader", columns, vec![row]))
}

fn required_i64(table: &UtfTable, name: &str) -> Result<i64> {
    let idx = table
        .column_index(name)
        .ok_or(Error::Parse("CPK header missing a required column"))?;
    match table.rows.first().and_then(|r| r.get(idx)) {
        Some(UtfValue::I64(v)) => Ok(*v),
        _ => Err(Error::Parse("CPK header column missing or null")),
    }
}

fn optional_i64(table: &UtfTable, name: &str) -> Result<Option<i64>> {
    let Some(idx) = table.column_index(name) else {
        return Ok(None);
    };
    match table.rows.first().and_then(|r| r.get(idx)) {
        Some(UtfValue::I64(v)) => Ok(Some(*v)),
        _ => Ok(None),
    }
}

fn row_str(row: &[UtfValue], idx: usize) -> Result<String> {
    match &row[idx] {
        UtfValue::Str(s) => Ok(s.clone()),
        UtfValue::Null => Ok(String::new()),
        _ => Err(Error::Parse("expected a string TOC cell")),
    }
}

fn row_i32(row: &[UtfValue], idx: usize) -> Result<i32> {
    match row[idx] {
        UtfValue::I32(v) => Ok(v),
        _ => Err(Error::Parse("expected an i32 TOC cell")),
    }
}

fn row_i64(row: &[UtfValue], idx: usize) -> Result<i64> {
    match row[idx] {
        UtfValue::I64(v) => Ok(v),
        _ => Err(Error::Parse("expected an i64 TOC cell")),
    }
}

/// `DirName.replace('\\','/').rstrip('/') + '/' + FileName.replace('\\','/').lstrip('/')`
fn join_packed_path(dir_name: &str, file_name: &str) -> String {
    let dir = dir_name.replace('\\', "/");
    let dir = dir.trim_end_matches('/');
    let file = file_name.replace('\\', "/");
    let file = file.trim_start_matches('/');
    format!("{dir}/{file}")
}

/// Split on the last `/` in a packed path.
fn split_packed_path(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(pos) => (path[..pos].to_string(), path[pos + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn packs_single_file_with_timestamp() {
        let mut builder = CpkBuilder::new();
        builder
            .add_file(
                "a/b.txt",
                b"hello\n".to_vec(),
                Some(CpkTimestamp::new(2024, 1, 2, 3, 4, 5)),
            )
            .unwrap();
        let archive = builder.build().unwrap();

        let mut reader = CpkReader::new(Cursor::new(archive)).unwrap();
        assert_eq!(reader.archive.entries.len(), 1);
        let entry = reader.archive.entries[0].clone();
        assert_eq!(entry.name, "a/b.txt");
        assert_eq!(entry.uncompressed_size, 6);
        assert_eq!(entry.absolute_offset, CONTENT_ORIGIN);
        assert_eq!(
            entry.modification_time,
            Some(CpkTimestamp::new(2024, 1, 2, 3, 4, 5))
        );

        let data = reader.read_file(&entry).unwrap();
        assert_eq!(data, b"hello\n");
    }

    #[test]
    fn toc_file_offset_is_relative_to_content_origin() {
        let mut builder = CpkBuilder::new();
        builder.add_file("a/b.txt", b"hello\n".to_vec(), None).unwrap();
        let archive = builder.build().unwrap();
        let reader = CpkReader::new(Cursor::new(archive)).unwrap();
        assert_eq!(
            reader.archive.entries[0].absolute_offset - CONTENT_ORIGIN,
            0
        );
    }

    #[test]
    fn rejects_duplicate_packed_path() {
        let mut builder = CpkBuilder::new();
        builder.add_file("a/b.txt", vec![1], None).unwrap();
        assert!(matches!(
            builder.add_file("a/b.txt", vec![2], None),
            Err(Error::DuplicateEntry)
        ));
    }

    #[test]
    fn sorts_by_uppercase_name() {
        let mut builder = CpkBuilder::new();
        builder.add_file("b.txt", vec![1], None).unwrap();
        builder.add_file("A.txt", vec![2], None).unwrap();
        let archive = builder.build().unwrap();
        let reader = CpkReader::new(Cursor::new(archive)).unwrap();
        let names: Vec<&str> = reader.archive.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A.txt", "b.txt"]);
    }

    #[test]
    fn etoc_omitted_unless_every_file_is_timestamped() {
        let mut builder = CpkBuilder::new();
        builder.add_file("a.txt", vec![1], Some(CpkTimestamp::new(2024, 1, 1, 0, 0, 0))).unwrap();
        builder.add_file("b.txt", vec![2], None).unwrap();
        let archive = builder.build().unwrap();
        let reader = CpkReader::new(Cursor::new(archive)).unwrap();
        assert!(reader.archive.entries.iter().all(|e| e.modification_time.is_none()));
    }

    #[test]
    fn reader_ignores_stored_content_offset() {
        // Hand-craft a header whose ContentOffset lies about the content
        // origin; readers must still use the hard-coded 0x800.
        let data = b"payload!".to_vec();
        let mut out = vec![0u8; PREAMBLE_LEN];
        out.extend_from_slice(&data);
        pad_to(&mut out, DEFAULT_ALIGNMENT as usize);
        let toc_offset = out.len() as u64;

        let toc = UtfTable::build(
            "CpkTocInfo",
            vec![
                ("DirName".to_string(), DatumType::Str),
                ("FileName".to_string(), DatumType::Str),
                ("FileSize".to_string(), DatumType::I32),
                ("ExtractSize".to_string(), DatumType::I32),
                ("FileOffset".to_string(), DatumType::I64),
            ],
            vec![vec![
                UtfValue::Str(String::new()),
                UtfValue::Str("f.bin".to_string()),
                UtfValue::I32(data.len() as i32),
                UtfValue::I32(data.len() as i32),
                UtfValue::I64(0),
            ]],
        )
        .encode(b"TOC ")
        .unwrap();
        out.extend_from_slice(&toc);

        let header = UtfTable::build(
            "CpkHeader",
            vec![
                ("ContentOffset".to_string(), DatumType::I64),
                ("TocOffset".to_string(), DatumType::I64),
                ("TocSize".to_string(), DatumType::I64),
            ],
            vec![vec![
                UtfValue::I64(0xDEAD_BEEF),
                UtfValue::I64(toc_offset as i64),
                UtfValue::I64(toc.len() as i64),
            ]],
        )
        .encode(b"CPK ")
        .unwrap();
        out[..header.len()].copy_from_slice(&header);

        let mut reader = CpkReader::new(Cursor::new(out)).unwrap();
        let entry = reader.archive.entries[0].clone();
        assert_eq!(entry.absolute_offset, CONTENT_ORIGIN);
        assert_eq!(reader.read_file(&entry).unwrap(), data);
    }
}

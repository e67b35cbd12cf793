//! UTF table - the column-oriented, XOR-obfuscated tabular subformat CPK
//! and its sibling tables (header/TOC/ETOC) are built from.
//!
//! Unrelated to Unicode Transformation Format; "UTF" is CRI Middleware's
//! own name for this container.
//!
//! ## Outer layout
//! ```text
//! magic:4s | 0:u32le | inner_length:u64le | encrypted_body
//! ```
//! `magic` is whichever kind of table this is (`"@UTF"`, `"CPK "`, `"TOC "`,
//! `"ETOC"`). The body is XOR-obfuscated with the keystream `m_0 = 0x5F`,
//! `m_{i+1} = (m_i * 0x15) & 0xFF`; a body that already starts with `"@UTF"`
//! is accepted verbatim instead (this tolerates re-embedding an
//! already-decoded table without re-obfuscating it).
//!
//! ## Inner layout (big-endian)
//! ```text
//! "@UTF" | body_length:u32 | rows_off:u32 | strings_off:u32 | data_off:u32
//!       | table_name_str_id:u32 | column_count:u16 | row_length:u16 | row_count:u32
//!       | column_descriptors[column_count]
//!       | rows[row_count] of row_length bytes
//!       | string_pool (NUL-terminated, UTF-8, deduplicated)
//!       | zero padding to 8-byte alignment
//!       | data_pool (each blob padded to 8 bytes)
//! ```
//! Offsets are relative to the byte immediately after `body_length` (i.e.
//! position 8 of the inner buffer).

use std::collections::HashMap;

use crate::utils::{
    be_u16, be_u32, be_u64, le_u64, null_string, pad_to, u8 as read_u8, write_be_u16,
    write_be_u32,
};
use crate::{Error, Result};

/// The scalar type a UTF column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumType {
    I8,
    I16,
    I32,
    I64,
    F32,
    Str,
    Bytes,
}

impl DatumType {
    fn code(self) -> u8 {
        match self {
            DatumType::I8 => 0x0,
            DatumType::I16 => 0x1,
            DatumType::I32 => 0x2,
            DatumType::I64 => 0x3,
            DatumType::F32 => 0x4,
            DatumType::Str => 0x5,
            DatumType::Bytes => 0x6,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0x0 => DatumType::I8,
            0x1 => DatumType::I16,
            0x2 => DatumType::I32,
            0x3 => DatumType::I64,
            0x4 => DatumType::F32,
            0x5 => DatumType::Str,
            0x6 => DatumType::Bytes,
            _ => return Err(Error::Parse("unknown UTF datum type")),
        })
    }

    /// Size in bytes a value of this type occupies on the row wire.
    fn wire_size(self) -> u16 {
        match self {
            DatumType::I8 => 1,
            DatumType::I16 => 2,
            DatumType::I32 => 4,
            DatumType::I64 => 8,
            DatumType::F32 => 4,
            DatumType::Str => 4,
            DatumType::Bytes => 8,
        }
    }
}

/// How a column's values are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// No value stored anywhere; every row reads as [`UtfValue::Null`].
    Null,
    /// One value stored in the column descriptor, shared by every row.
    Constant,
    /// A value stored per row on the row wire.
    Variable,
}

impl Storage {
    fn code(self) -> u8 {
        match self {
            Storage::Null => 0x0,
            Storage::Constant => 0x1,
            Storage::Variable => 0x3,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0x0 => Storage::Null,
            0x1 => Storage::Constant,
            0x3 => Storage::Variable,
            _ => return Err(Error::Parse("unknown UTF storage mode")),
        })
    }
}

/// A single cell value. `Null` is only valid for [`Storage::Null`] columns.
#[derive(Debug, Clone, PartialEq)]
pub enum UtfValue {
    Null,
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    Str(String),
    Bytes(Vec<u8>),
}

impl UtfValue {
    fn matches(&self, dt: DatumType) -> bool {
        matches!(
            (self, dt),
            (UtfValue::I8(_), DatumType::I8)
                | (UtfValue::I16(_), DatumType::I16)
                | (UtfValue::I32(_), DatumType::I32)
                | (UtfValue::I64(_), DatumType::I64)
                | (UtfValue::F32(_), DatumType::F32)
                | (UtfValue::Str(_), DatumType::Str)
                | (UtfValue::Bytes(_), DatumType::Bytes)
        )
    }
}

/// A decoded column descriptor.
///
/// On [`UtfTable::encode`], `storage` and `constant` are ignored - storage
/// is always recomputed from the row data per the write-time policy
/// described in the module docs (CONSTANT is never synthesized).
#[derive(Debug, Clone)]
pub struct UtfColumn {
    pub name: String,
    pub datum_type: DatumType,
    pub storage: Storage,
    pub constant: Option<UtfValue>,
}

/// A fully decoded (or about-to-be-encoded) UTF table.
///
/// `rows[r][c]` is the materialized value of row `r`, column `c` -
/// `UtfValue::Null` for NULL-storage columns, the shared value for
/// CONSTANT-storage columns, the per-row value for VARIABLE-storage
/// columns.
#[derive(Debug, Clone)]
pub struct UtfTable {
    pub name: String,
    pub columns: Vec<UtfColumn>,
    pub rows: Vec<Vec<UtfValue>>,
}

impl UtfTable {
    /// Build a table from plain `(name, type)` column declarations and
    /// materialized rows. Storage mode is derived later, at [`encode`]
    /// time, from the row data.
    ///
    /// [`encode`]: UtfTable::encode
    pub fn build(
        name: impl Into<String>,
        columns: Vec<(String, DatumType)>,
        rows: Vec<Vec<UtfValue>>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(name, datum_type)| UtfColumn {
                name,
                datum_type,
                storage: Storage::Variable,
                constant: None,
            })
            .collect();
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Find a column's row-major index by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Decode a UTF table wrapped in the given outer `magic` (`"@UTF"`,
    /// `"CPK "`, `"TOC "`, or `"ETOC"`).
    pub fn decode(raw: &[u8], outer_magic: &[u8; 4]) -> Result<Self> {
        if raw.len() < 16 {
            return Err(Error::UnexpectedEof);
        }
        if &raw[0..4] != outer_magic {
            return Err(Error::BadMagic);
        }
        let mut cursor = std::io::Cursor::new(&raw[4..8]);
        let _reserved = be_u32(&mut cursor)?;
        let mut cursor = std::io::Cursor::new(&raw[8..16]);
        let inner_length = le_u64(&mut cursor)? as usize;

        let body = raw
            .get(16..16usize.checked_add(inner_length).ok_or(Error::InvalidRange)?)
            .ok_or(Error::UnexpectedEof)?;

        let inner = if body.starts_with(b"@UTF") {
            body.to_vec()
        } else {
            xor_stream(body)
        };

        decode_inner(&inner)
    }

    /// Encode this table under the given outer `magic`.
    ///
    /// Fails if any row's value does not match its column's declared
    /// [`DatumType`], or is `Null` for a column that is not the sole row
    /// of a single-row table.
    pub fn encode(&self, outer_magic: &[u8; 4]) -> Result<Vec<u8>> {
        let inner = encode_inner(self)?;
        let obfuscated = xor_stream(&inner);

        let mut out = Vec::with_capacity(16 + obfuscated.len());
        out.extend_from_slice(outer_magic);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(inner.len() as u64).to_le_bytes());
        out.extend_from_slice(&obfuscated);
        Ok(out)
    }
}

/// XOR a buffer with the UTF keystream. The keystream is a pure function
/// of byte index, so applying this twice returns the original buffer.
fn xor_stream(body: &[u8]) -> Vec<u8> {
    let mut m: u8 = 0x5F;
    body.iter()
        .map(|&b| {
            let out = b ^ m;
            m = m.wrapping_mul(0x15);
            out
        })
        .collect()
}

fn decode_inner(inner: &[u8]) -> Result<UtfTable> {
    const HEADER_LEN: usize = 32;
    if inner.len() < HEADER_LEN {
        return Err(Error::UnexpectedEof);
    }
    if &inner[0..4] != b"@UTF" {
        return Err(Error::Parse("inner magic is not @UTF"));
    }

    let mut c = std::io::Cursor::new(&inner[4..]);
    let body_length = be_u32(&mut c)?;
    if body_length as usize != inner.len() - 8 {
        return Err(Error::Parse("UTF body_length inconsistent with table size"));
    }
    let rows_off = be_u32(&mut c)? as usize;
    let strings_off = be_u32(&mut c)? as usize;
    let data_off = be_u32(&mut c)? as usize;
    let table_name_str_id = be_u32(&mut c)? as usize;
    let column_count = be_u16(&mut c)?;
    let row_length = be_u16(&mut c)? as usize;
    let row_count = be_u32(&mut c)?;

    let rows_start = 8 + rows_off;
    let strings_start = 8 + strings_off;
    let data_start = 8 + data_off;

    let mut columns = Vec::with_capacity(column_count as usize);
    let mut cursor = HEADER_LEN;
    for _ in 0..column_count {
        let flags = *inner.get(cursor).ok_or(Error::UnexpectedEof)?;
        cursor += 1;
        let datum_type = DatumType::from_code(flags & 0x0F)?;
        let storage = Storage::from_code((flags >> 4) & 0x0F)?;

        let name_off = read_be_u32_at(inner, cursor)? as usize;
        cursor += 4;

        let constant = if storage == Storage::Constant {
            let (value, width) = read_value_at(inner, cursor, datum_type, strings_start, data_start)?;
            cursor += width;
            Some(value)
        } else {
            None
        };

        let name = null_string(inner, strings_start + name_off)?;
        columns.push(UtfColumn {
            name,
            datum_type,
            storage,
            constant,
        });
    }

    let mut rows = Vec::with_capacity(row_count as usize);
    for r in 0..row_count as usize {
        let row_base = rows_start + r * row_length;
        let mut row_cursor = row_base;
        let mut values = Vec::with_capacity(columns.len());
        for col in &columns {
            let value = match col.storage {
                Storage::Null => UtfValue::Null,
                Storage::Constant => col.constant.clone().unwrap(),
                Storage::Variable => {
                    let (value, width) =
                        read_value_at(inner, row_cursor, col.datum_type, strings_start, data_start)?;
                    row_cursor += width;
                    value
                }
            };
            values.push(value);
        }
        rows.push(values);
    }

    let table_name = null_string(inner, strings_start + table_name_str_id)?;

    Ok(UtfTable {
        name: table_name,
        columns,
        rows,
    })
}

fn read_be_u32_at(buf: &[u8], offset: usize) -> Result<u32> {
    let slice = buf.get(offset..offset + 4).ok_or(Error::UnexpectedEof)?;
    let mut c = std::io::Cursor::new(slice);
    be_u32(&mut c)
}

fn read_value_at(
    buf: &[u8],
    offset: usize,
    dt: DatumType,
    strings_start: usize,
    data_start: usize,
) -> Result<(UtfValue, usize)> {
    let width = dt.wire_size() as usize;
    let slice = buf.get(offset..offset + width).ok_or(Error::UnexpectedEof)?;
    let mut c = std::io::Cursor::new(slice);
    let value = match dt {
        DatumType::I8 => UtfValue::I8(read_u8(&mut c)? as i8),
        DatumType::I16 => UtfValue::I16(be_u16(&mut c)? as i16),
        DatumType::I32 => UtfValue::I32(be_u32(&mut c)? as i32),
        DatumType::I64 => UtfValue::I64(be_u64(&mut c)? as i64),
        DatumType::F32 => UtfValue::F32(f32::from_be_bytes(slice.try_into().unwrap())),
        DatumType::Str => {
            let local_off = be_u32(&mut c)? as usize;
            UtfValue::Str(null_string(buf, strings_start + local_off)?)
        }
        DatumType::Bytes => {
            let local_off = be_u32(&mut c)? as usize;
            let len = be_u32(&mut c)? as usize;
            let abs = data_start + local_off;
            let blob = buf.get(abs..abs + len).ok_or(Error::UnexpectedEof)?;
            UtfValue::Bytes(blob.to_vec())
        }
    };
    Ok((value, width))
}

/// Appends strings to a deduplicated pool, the table's own name added
/// first per the on-disk convention.
struct StringPoolBuilder {
    bytes: Vec<u8>,
    seen: HashMap<String, u32>,
}

impl StringPoolBuilder {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            seen: HashMap::new(),
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&off) = self.seen.get(s) {
            return off;
        }
        let off = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.seen.insert(s.to_string(), off);
        off
    }
}

/// Appends blobs to the data pool, each padded to 8 bytes. No dedup.
struct DataPoolBuilder {
    bytes: Vec<u8>,
}

impl DataPoolBuilder {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn append(&mut self, blob: &[u8]) -> (u32, u32) {
        let off = self.bytes.len() as u32;
        self.bytes.extend_from_slice(blob);
        pad_to(&mut self.bytes, 8);
        (off, blob.len() as u32)
    }
}

fn encode_inner(table: &UtfTable) -> Result<Vec<u8>> {
    let column_count = table.columns.len();

    // Write-time storage policy (spec.md 4.D): a single-row table whose
    // value for a column is null writes that column as NULL; everything
    // else is VARIABLE. CONSTANT is never synthesized.
    let mut storages = Vec::with_capacity(column_count);
    for (i, col) in table.columns.iter().enumerate() {
        let is_sole_null_row = table.rows.len() == 1 && table.rows[0][i] == UtfValue::Null;
        if is_sole_null_row {
            storages.push(Storage::Null);
            continue;
        }
        for row in &table.rows {
            let v = &row[i];
            if matches!(v, UtfValue::Null) {
                return Err(Error::Parse("null value in a VARIABLE-storage UTF column"));
            }
            if !v.matches(col.datum_type) {
                return Err(Error::Parse("row value does not match column datum type"));
            }
        }
        storages.push(Storage::Variable);
    }

    let mut strings = StringPoolBuilder::new();
    let table_name_str_id = strings.intern(&table.name);
    let col_name_offs: Vec<u32> = table
        .columns
        .iter()
        .map(|c| strings.intern(&c.name))
        .collect();

    let mut data_pool = DataPoolBuilder::new();
    let mut rows_bytes = Vec::new();
    let mut row_length: u16 = 0;
    for (i, col) in table.columns.iter().enumerate() {
        if storages[i] == Storage::Variable {
            row_length += col.datum_type.wire_size();
        }
    }

    for row in &table.rows {
        for i in 0..column_count {
            if storages[i] != Storage::Variable {
                continue;
            }
            match &row[i] {
                UtfValue::I8(v) => rows_bytes.push(*v as u8),
                UtfValue::I16(v) => rows_bytes.extend_from_slice(&v.to_be_bytes()),
                UtfValue::I32(v) => rows_bytes.extend_from_slice(&v.to_be_bytes()),
                UtfValue::I64(v) => rows_bytes.extend_from_slice(&v.to_be_bytes()),
                UtfValue::F32(v) => rows_bytes.extend_from_slice(&v.to_be_bytes()),
                UtfValue::Str(s) => {
                    let off = strings.intern(s);
                    write_be_u32(&mut rows_bytes, off)?;
                }
                UtfValue::Bytes(b) => {
                    let (off, len) = data_pool.append(b);
                    write_be_u32(&mut rows_bytes, off)?;
                    write_be_u32(&mut rows_bytes, len)?;
                }
                UtfValue::Null => unreachable!("validated above"),
            }
        }
    }

    let mut col_descs = Vec::new();
    for (i, col) in table.columns.iter().enumerate() {
        let flags = (storages[i].code() << 4) | col.datum_type.code();
        col_descs.push(flags);
        write_be_u32(&mut col_descs, col_name_offs[i])?;
    }

    const HEADER_LEN: usize = 32;
    let rows_section_start = HEADER_LEN + col_descs.len();
    let strings_section_start = rows_section_start + rows_bytes.len();
    let mut padded_strings = strings.bytes;
    pad_to(&mut padded_strings, 8);
    let data_section_start = strings_section_start + padded_strings.len();
    let data_bytes = data_pool.bytes;

    let rows_off = (rows_section_start - 8) as u32;
    let strings_off = (strings_section_start - 8) as u32;
    let data_off = (data_section_start - 8) as u32;

    let mut inner = Vec::new();
    inner.extend_from_slice(b"@UTF");
    inner.extend_from_slice(&[0u8; 4]); // body_length, patched below
    write_be_u32(&mut inner, rows_off)?;
    write_be_u32(&mut inner, strings_off)?;
    write_be_u32(&mut inner, data_off)?;
    write_be_u32(&mut inner, table_name_str_id)?;
    write_be_u16(&mut inner, column_count as u16)?;
    write_be_u16(&mut inner, row_length)?;
    write_be_u32(&mut inner, table.rows.len() as u32)?;
    inner.extend_from_slice(&col_descs);
    inner.extend_from_slice(&rows_bytes);
    inner.extend_from_slice(&padded_strings);
    inner.extend_from_slice(&data_bytes);

    let body_length = (inner.len() - 8) as u32;
    inner[4..8].copy_from_slice(&body_length.to_be_bytes());

    Ok(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_three_row_i32_column() {
        let table = UtfTable::build(
            "t",
            vec![("n".to_string(), DatumType::I32)],
            vec![
                vec![UtfValue::I32(1)],
                vec![UtfValue::I32(2)],
                vec![UtfValue::I32(3)],
            ],
        );
        let encoded = table.encode(b"@UTF").unwrap();
        let decoded = UtfTable::decode(&encoded, b"@UTF").unwrap();
        assert_eq!(decoded.rows, table.rows);
        assert_eq!(decoded.columns[0].storage, Storage::Variable);
    }

    #[test]
    fn fixed_scenario_row_bytes_are_big_endian() {
        let table = UtfTable::build(
            "t",
            vec![("n".to_string(), DatumType::I32)],
            vec![
                vec![UtfValue::I32(1)],
                vec![UtfValue::I32(2)],
                vec![UtfValue::I32(3)],
            ],
        );
        let inner = encode_inner(&table).unwrap();
        let row_length = u16::from_be_bytes(inner[26..28].try_into().unwrap());
        let row_count = u32::from_be_bytes(inner[28..32].try_into().unwrap());
        assert_eq!(row_length, 4);
        assert_eq!(row_count, 3);
        let rows_start = 32 + 1 + 4; // header + one column descriptor (flags+name off)
        assert_eq!(
            &inner[rows_start..rows_start + 12],
            &[0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3]
        );
    }

    #[test]
    fn single_row_null_column_is_zero_width() {
        let table = UtfTable::build(
            "t",
            vec![("x".to_string(), DatumType::I32)],
            vec![vec![UtfValue::Null]],
        );
        let inner = encode_inner(&table).unwrap();
        let row_length = u16::from_be_bytes(inner[26..28].try_into().unwrap());
        assert_eq!(row_length, 0);

        let encoded = table.encode(b"@UTF").unwrap();
        let decoded = UtfTable::decode(&encoded, b"@UTF").unwrap();
        assert_eq!(decoded.columns[0].storage, Storage::Null);
        assert_eq!(decoded.rows, vec![vec![UtfValue::Null]]);
    }

    #[test]
    fn body_length_equals_encoded_length_minus_eight() {
        let table = UtfTable::build("t", vec![], vec![]);
        let encoded = table.encode(b"@UTF").unwrap();
        let inner_length = u64::from_le_bytes(encoded[8..16].try_into().unwrap()) as usize;
        assert_eq!(inner_length, encoded.len() - 16);
    }

    #[test]
    fn string_values_are_deduplicated() {
        let table = UtfTable::build(
            "dup",
            vec![("s".to_string(), DatumType::Str)],
            vec![
                vec![UtfValue::Str("same".to_string())],
                vec![UtfValue::Str("same".to_string())],
            ],
        );
        let inner = encode_inner(&table).unwrap();
        let decoded = decode_inner(&inner).unwrap();
        assert_eq!(
            decoded.rows[0][0],
            UtfValue::Str("same".to_string())
        );
        assert_eq!(decoded.rows[0][0], decoded.rows[1][0]);
    }

    #[test]
    fn bytes_column_round_trips() {
        let table = UtfTable::build(
            "b",
            vec![("blob".to_string(), DatumType::Bytes)],
            vec![vec![UtfValue::Bytes(vec![1, 2, 3, 4, 5])]],
        );
        let encoded = table.encode(b"@UTF").unwrap();
        let decoded = UtfTable::decode(&encoded, b"@UTF").unwrap();
        assert_eq!(decoded.rows[0][0], UtfValue::Bytes(vec![1, 2, 3, 4, 5]));
    }

    #[test]
    fn rejects_outer_magic_mismatch() {
        let table = UtfTable::build("t", vec![], vec![]);
        let encoded = table.encode(b"@UTF").unwrap();
        assert!(matches!(
            UtfTable::decode(&encoded, b"TOC "),
            Err(Error::BadMagic)
        ));
    }

    #[test]
    fn xor_stream_is_its_own_inverse() {
        for buf in [[0u8, 0, 0], [1, 2, 3], [0xFF, 0x00, 0x7F]] {
            assert_eq!(xor_stream(&xor_stream(&buf)), buf);
        }
    }

    #[test]
    fn already_plaintext_body_is_accepted_verbatim() {
        let table = UtfTable::build(
            "t",
            vec![("n".to_string(), DatumType::I32)],
            vec![vec![UtfValue::I32(42)]],
        );
        let inner = encode_inner(&table).unwrap();
        let mut raw = Vec::new();
        raw.extend_from_slice(b"@UTF");
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&(inner.len() as u64).to_le_bytes());
        raw.extend_from_slice(&inner); // NOT obfuscated
        let decoded = UtfTable::decode(&raw, b"@UTF").unwrap();
        assert_eq!(decoded.rows[0][0], UtfValue::I32(42));
    }
}

//! FTEX ⇄ DDS - transcodes the proprietary mipmapped, chunk-compressed
//! FTEX texture container to and from Microsoft's DDS container.
//!
//! ## FTEX header (64 bytes, little-endian)
//! ```text
//! "FTEX" | version:f32 | pixel_format:u16 | width:u16 | height:u16 | depth:u16
//!        | mipmaps:u8  | nrt:u8 | flags:u16 | unk1:u32 | unk2:u32
//!        | texture_type:u8 | ftexs_count:u8 | pad[14] | hash1:8s | hash2:8s
//! ```
//! Supported versions are `2.025..=2.045`. `ftexs_count > 0` (external
//! mipmap files) is unsupported. `mipmaps == 0` is rejected.
//!
//! Per-mipmap headers (16 bytes LE each) appear in image-major,
//! mipmap-minor order; each frame body is zero or more zlib-compressed
//! chunks, decoded and then truncated/zero-padded to the size
//! [`dds_mipmap_size`] dictates.
//!
//! This crate does not validate or interpret pixel data - block-compressed
//! bytes pass through unchanged in both directions.

use std::io::Write;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::Read as _;

use crate::utils::{
    bytesa, bytesv, le_f32, le_u16, le_u32, u8 as read_u8, write_le_u16, write_le_u32,
};
use crate::{Error, Result};

const FTEX_HEADER_LEN: usize = 64;
const MIP_HEADER_LEN: usize = 16;
const MAX_CHUNK_LEN: usize = 16 * 1024;
const VERSION_MIN: f32 = 2.025;
const VERSION_MAX: f32 = 2.045;

const TEXTURE_TYPE_CUBE: u8 = 0x4;

/// The intended interpretation of color channels, encoded in the low
/// nibble of `texture_type` on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Linear,
    Srgb,
    Normal,
}

impl ColorSpace {
    fn low_nibble(self) -> u8 {
        match self {
            ColorSpace::Linear => 0x1,
            ColorSpace::Srgb => 0x3,
            ColorSpace::Normal => 0x9,
        }
    }
}

/// Decoded FTEX header fields.
#[derive(Debug, Clone)]
pub struct FtexHeader {
    pub version: f32,
    pub pixel_format: u16,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub mipmaps: u8,
    pub nrt: u8,
    pub flags: u16,
    pub unk1: u32,
    pub unk2: u32,
    pub texture_type: u8,
    pub hash1: [u8; 8],
    pub hash2: [u8; 8],
}

impl FtexHeader {
    fn is_cube(&self) -> bool {
        self.texture_type & TEXTURE_TYPE_CUBE != 0
    }

    fn face_count(&self) -> usize {
        if self.is_cube() { 6 } else { 1 }
    }
}

/// A fully decoded FTEX texture: header plus one raw, size-corrected byte
/// buffer per frame (image-major, mipmap-minor order).
#[derive(Debug, Clone)]
pub struct FtexTexture {
    pub header: FtexHeader,
    pub frames: Vec<Vec<u8>>,
}

/// `(block_pixels, block_bytes)` for a supported FTEX pixel format code.
fn block_config(pixel_format: u16) -> Result<(u32, u32)> {
    Ok(match pixel_format {
        0 => (1, 4),
        1 => (1, 1),
        2 => (4, 8),
        3 => (4, 16),
        4 => (4, 16),
        8 => (4, 8),
        9 => (4, 16),
        10 => (4, 16),
        11 => (4, 16),
        12 => (1, 8),
        13 => (1, 16),
        14 => (1, 4),
        15 => (1, 4),
        _ => return Err(Error::Parse("unsupported FTEX pixel format")),
    })
}

/// The byte length of mip level `m` of a `(w, h, d)` base image in `fmt`.
pub fn dds_mipmap_size(fmt: u16, w: u32, h: u32, d: u32, m: u32) -> Result<usize> {
    let (block_px, block_bytes) = block_config(fmt)?;
    let s = 1u32 << m;
    let wm = w.div_ceil(s).max(1);
    let hm = h.div_ceil(s).max(1);
    let dm = d.div_ceil(s).max(1);
    let wb = wm.div_ceil(block_px);
    let hb = hm.div_ceil(block_px);
    Ok((wb as usize) * (hb as usize) * (dm as usize) * (block_bytes as usize))
}

fn parse_header(bytes: &[u8]) -> Result<FtexHeader> {
    if bytes.len() < FTEX_HEADER_LEN {
        return Err(Error::UnexpectedEof);
    }
    let mut c = std::io::Cursor::new(bytes);
    let mut magic = [0u8; 4];
    c.read_exact(&mut magic)?;
    if &magic != b"FTEX" {
        return Err(Error::BadMagic);
    }
    let version = le_f32(&mut c)?;
    if !(VERSION_MIN..=VERSION_MAX).contains(&version) {
        return Err(Error::UnsupportedVersion(format!("{version}")));
    }
    let pixel_format = le_u16(&mut c)?;
    let width = le_u16(&mut c)?;
    let height = le_u16(&mut c)?;
    let depth = le_u16(&mut c)?;
    let mipmaps = read_u8(&mut c)?;
    if mipmaps == 0 {
        return Err(Error::Parse("FTEX mipmaps field is zero"));
    }
    let nrt = read_u8(&mut c)?;
    let flags = le_u16(&mut c)?;
    let unk1 = le_u32(&mut c)?;
    let unk2 = le_u32(&mut c)?;
    let texture_type = read_u8(&mut c)?;
    let ftexs_count = read_u8(&mut c)?;
    if ftexs_count > 0 {
        return Err(Error::Parse("FTEX external mipmap files are unsupported"));
    }
    let _pad: [u8; 14] = bytesa(&mut c)?;
    let hash1: [u8; 8] = bytesa(&mut c)?;
    let hash2: [u8; 8] = bytesa(&mut c)?;

    Ok(FtexHeader {
        version,
        pixel_format,
        width,
        height,
        depth,
        mipmaps,
        nrt,
        flags,
        unk1,
        unk2,
        texture_type,
        hash1,
        hash2,
    })
}

fn write_header(h: &FtexHeader, out: &mut Vec<u8>) -> Result<()> {
    out.extend_from_slice(b"FTEX");
    out.extend_from_slice(&h.version.to_le_bytes());
    write_le_u16(out, h.pixel_format)?;
    write_le_u16(out, h.width)?;
    write_le_u16(out, h.height)?;
    write_le_u16(out, h.depth)?;
    out.push(h.mipmaps);
    out.push(h.nrt);
    write_le_u16(out, h.flags)?;
    write_le_u32(out, h.unk1)?;
    write_le_u32(out, h.unk2)?;
    out.push(h.texture_type);
    out.push(0); // ftexs_count
    out.extend_from_slice(&[0u8; 14]);
    out.extend_from_slice(&h.hash1);
    out.extend_from_slice(&h.hash2);
    Ok(())
}

struct MipHeader {
    offset: u32,
    uncompressed_size: u32,
    compressed_size: u32,
    index: u8,
    chunk_count: u16,
}

fn parse_mip_header(bytes: &[u8]) -> Result<MipHeader> {
    let mut c = std::io::Cursor::new(bytes);
    let offset = le_u32(&mut c)?;
    let uncompressed_size = le_u32(&mut c)?;
    let compressed_size = le_u32(&mut c)?;
    let index = read_u8(&mut c)?;
    let _ftexs_number = read_u8(&mut c)?;
    let chunk_count = le_u16(&mut c)?;
    Ok(MipHeader {
        offset,
        uncompressed_size,
        compressed_size,
        index,
        chunk_count,
    })
}

fn write_mip_header(out: &mut Vec<u8>, h: &MipHeader) -> Result<()> {
    write_le_u32(out, h.offset)?;
    write_le_u32(out, h.uncompressed_size)?;
    write_le_u32(out, h.compressed_size)?;
    out.push(h.index);
    out.push(0); // ftexs_number
    write_le_u16(out, h.chunk_count)?;
    Ok(())
}

fn zlib_decompress(body: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(body);
    let mut out = Vec::with_capacity(uncompressed_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::Decompress("FTEX frame zlib stream corrupt"))?;
    Ok(out)
}

fn zlib_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder
        .write_all(data)
        .expect("writing to an in-memory encoder cannot fail");
    encoder.finish().expect("in-memory zlib finish")
}

/// Decode one frame body starting at `body[mip.offset as usize..]`.
fn decode_frame(body: &[u8], mip: &MipHeader) -> Result<Vec<u8>> {
    let start = mip.offset as usize;
    if mip.chunk_count == 0 && mip.compressed_size == 0 {
        let end = start
            .checked_add(mip.uncompressed_size as usize)
            .ok_or(Error::InvalidRange)?;
        let raw = body.get(start..end).ok_or(Error::UnexpectedEof)?;
        return Ok(raw.to_vec());
    }
    if mip.chunk_count == 0 {
        let end = start
            .checked_add(mip.compressed_size as usize)
            .ok_or(Error::InvalidRange)?;
        let compressed = body.get(start..end).ok_or(Error::UnexpectedEof)?;
        return zlib_decompress(compressed, mip.uncompressed_size as usize);
    }

    let dir_len = mip.chunk_count as usize * 8;
    let dir_bytes = body
        .get(start..start + dir_len)
        .ok_or(Error::UnexpectedEof)?;
    let mut entries = Vec::with_capacity(mip.chunk_count as usize);
    let mut c = std::io::Cursor::new(dir_bytes);
    for _ in 0..mip.chunk_count {
        let compressed = le_u16(&mut c)?;
        let uncompressed = le_u16(&mut c)?;
        let offset = le_u32(&mut c)?;
        entries.push((compressed, uncompressed, offset));
    }

    let mut out = Vec::with_capacity(mip.uncompressed_size as usize);
    for (compressed, uncompressed, offset) in entries {
        let raw_flag = offset & 0x8000_0000 != 0;
        let chunk_offset = (offset & 0x7FFF_FFFF) as usize;
        let chunk_start = start + chunk_offset;
        if raw_flag {
            let end = chunk_start
                .checked_add(uncompressed as usize)
                .ok_or(Error::InvalidRange)?;
            let raw = body.get(chunk_start..end).ok_or(Error::UnexpectedEof)?;
            out.extend_from_slice(raw);
        } else {
            let end = chunk_start
                .checked_add(compressed as usize)
                .ok_or(Error::InvalidRange)?;
            let compressed_bytes = body.get(chunk_start..end).ok_or(Error::UnexpectedEof)?;
            out.extend_from_slice(&zlib_decompress(compressed_bytes, uncompressed as usize)?);
        }
    }
    Ok(out)
}

/// Split a frame into ≤16 KiB chunks (the FTEX encode chunking policy).
pub fn chunk_frame(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![data];
    }
    data.chunks(MAX_CHUNK_LEN).collect()
}

/// Zero-pad or truncate `frame` to exactly `expected_len` bytes.
fn correct_frame_size(mut frame: Vec<u8>, expected_len: usize) -> Vec<u8> {
    frame.resize(expected_len, 0);
    frame
}

/// Decode an FTEX buffer to a fully materialized [`FtexTexture`].
pub fn decode_texture(bytes: &[u8]) -> Result<FtexTexture> {
    let header = parse_header(bytes)?;
    let faces = header.face_count();
    let frame_count = faces * header.mipmaps as usize;

    let mip_headers_start = FTEX_HEADER_LEN;
    let mip_headers_end = mip_headers_start + frame_count * MIP_HEADER_LEN;
    let mip_header_bytes = bytes
        .get(mip_headers_start..mip_headers_end)
        .ok_or(Error::UnexpectedEof)?;

    let mut mip_headers = Vec::with_capacity(frame_count);
    for i in 0..frame_count {
        let h = parse_mip_header(&mip_header_bytes[i * MIP_HEADER_LEN..(i + 1) * MIP_HEADER_LEN])?;
        if h.index as usize != i % header.mipmaps as usize {
            return Err(Error::Parse("FTEX per-mipmap index does not match its position"));
        }
        mip_headers.push(h);
    }

    let body = &bytes[mip_headers_end..];
    let mut frames = Vec::with_capacity(frame_count);
    for (i, mip) in mip_headers.iter().enumerate() {
        let mip_index = i % header.mipmaps as usize;
        let decoded = decode_frame(body, mip)?;
        let expected = dds_mipmap_size(
            header.pixel_format,
            header.width as u32,
            header.height as u32,
            header.depth.max(1) as u32,
            mip_index as u32,
        )?;
        frames.push(correct_frame_size(decoded, expected));
    }

    Ok(FtexTexture { header, frames })
}

/// Encode a [`FtexTexture`], splitting and zlib-compressing each frame
/// unconditionally into ≤16 KiB chunks.
pub fn encode_texture(texture: &FtexTexture) -> Result<Vec<u8>> {
    let mut directory = Vec::new();
    let mut body = Vec::new();

    for frame in &texture.frames {
        let chunks = chunk_frame(frame);
        let chunk_count = chunks.len();
        let offset = body.len() as u32;

        if chunk_count <= 1 {
            let compressed = zlib_compress(frame);
            body.extend_from_slice(&compressed);
            directory.push(MipHeader {
                offset,
                uncompressed_size: frame.len() as u32,
                compressed_size: compressed.len() as u32,
                index: 0, // patched below
                chunk_count: 0,
            });
            continue;
        }

        let dir_start = body.len();
        let dir_len = (chunk_count * 8) as u32;
        let mut chunk_dir = Vec::with_capacity(chunk_count * 8);
        let mut chunk_bodies = Vec::new();
        for chunk in &chunks {
            let compressed = zlib_compress(chunk);
            let chunk_offset = dir_len + chunk_bodies.len() as u32;
            write_le_u16(&mut chunk_dir, compressed.len() as u16)?;
            write_le_u16(&mut chunk_dir, chunk.len() as u16)?;
            write_le_u32(&mut chunk_dir, chunk_offset)?;
            chunk_bodies.extend_from_slice(&compressed);
        }
        body.extend_from_slice(&chunk_dir);
        body.extend_from_slice(&chunk_bodies);

        directory.push(MipHeader {
            offset: dir_start as u32,
            uncompressed_size: frame.len() as u32,
            compressed_size: 0,
            index: 0,
            chunk_count: chunk_count as u16,
        });
    }

    let mipmaps = texture.header.mipmaps as usize;
    for (i, mip) in directory.iter_mut().enumerate() {
        mip.index = (i % mipmaps) as u8;
    }

    let mut out = Vec::with_capacity(FTEX_HEADER_LEN + directory.len() * MIP_HEADER_LEN + body.len());
    write_header(&texture.header, &mut out)?;
    for mip in &directory {
        write_mip_header(&mut out, mip)?;
    }
    out.extend_from_slice(&body);
    Ok(out)
}

// ---------------------------------------------------------------------
// DDS
// ---------------------------------------------------------------------

const DDS_HEADER_LEN: usize = 128;
const DX10_HEADER_LEN: usize = 20;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;
const DDSD_DEPTH: u32 = 0x80_0000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

const DDSCAPS2_CUBEMAP: u32 = 0x200;
const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0xFE00;
const DDSCAPS2_VOLUME: u32 = 0x20_0000;

/// A minimally parsed DDS container: header fields plus every mip level's
/// raw bytes, concatenated face-major per the FTEX frame ordering.
#[derive(Debug, Clone)]
pub struct DdsImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mipmaps: u32,
    pub is_cube: bool,
    pub pixel_format: u16,
    pub frames: Vec<Vec<u8>>,
}

/// `(dxgi_format, fourcc)` recorded for each FTEX pixel format this crate
/// understands how to round-trip through DDS. Not a vendor-verified
/// mapping; see the module docs.
fn dxgi_for_pixel_format(fmt: u16) -> Option<(u32, Option<&'static [u8; 4]>)> {
    Some(match fmt {
        1 => (61, None),         // R8_UNORM
        2 => (71, Some(b"DXT1")), // BC1_UNORM
        3 => (74, Some(b"DXT3")), // BC2_UNORM
        4 => (77, Some(b"DXT5")), // BC3_UNORM
        8 => (80, None),          // BC4_UNORM
        9 => (83, None),          // BC5_UNORM
        10 => (95, None),         // BC6H_UF16
        11 => (98, None),         // BC7_UNORM
        12 => (10, None),         // R16G16B16A16_FLOAT
        13 => (2, None),          // R32G32B32A32_FLOAT
        14 => (24, None),         // R10G10B10A2_UNORM
        15 => (26, None),         // R11G11B10_FLOAT
        _ => return None,
    })
}

fn pixel_format_for_dxgi(dxgi_format: u32) -> Option<u16> {
    Some(match dxgi_format {
        61 => 1,
        71 => 2,
        74 => 3,
        77 => 4,
        80 => 8,
        83 => 9,
        95 => 10,
        98 => 11,
        10 => 12,
        2 => 13,
        24 => 14,
        26 => 15,
        _ => return None,
    })
}

fn pixel_format_for_fourcc(fourcc: &[u8; 4]) -> Option<u16> {
    match fourcc {
        b"DXT1" => Some(2),
        b"DXT3" => Some(3),
        b"DXT5" => Some(4),
        _ => None,
    }
}

/// Parse a DDS buffer (header + DX10 extension + mip data for a single
/// image or cube map).
pub fn decode_dds(bytes: &[u8]) -> Result<DdsImage> {
    if bytes.len() < 4 + DDS_HEADER_LEN {
        return Err(Error::UnexpectedEof);
    }
    if &bytes[0..4] != b"DDS " {
        return Err(Error::BadMagic);
    }
    let mut c = std::io::Cursor::new(&bytes[4..]);
    let _size = le_u32(&mut c)?;
    let flags = le_u32(&mut c)?;
    let height = le_u32(&mut c)?;
    let width = le_u32(&mut c)?;
    let _pitch_or_linear_size = le_u32(&mut c)?;
    let depth_field = le_u32(&mut c)?;
    let mipmap_count_field = le_u32(&mut c)?;
    let mut reserved1 = [0u32; 11];
    for r in reserved1.iter_mut() {
        *r = le_u32(&mut c)?;
    }
    let pf_size = le_u32(&mut c)?;
    let _ = pf_size;
    let pf_flags = le_u32(&mut c)?;
    let fourcc: [u8; 4] = bytesa(&mut c)?;
    let _rgb_bit_count = le_u32(&mut c)?;
    let _r_mask = le_u32(&mut c)?;
    let _g_mask = le_u32(&mut c)?;
    let _b_mask = le_u32(&mut c)?;
    let _a_mask = le_u32(&mut c)?;
    let caps = le_u32(&mut c)?;
    let caps2 = le_u32(&mut c)?;
    let _caps3 = le_u32(&mut c)?;
    let _caps4 = le_u32(&mut c)?;
    let _reserved2 = le_u32(&mut c)?;

    let mipmaps = if flags & DDSD_MIPMAPCOUNT != 0 && mipmap_count_field > 0 {
        mipmap_count_field
    } else {
        1
    };
    let depth = if flags & DDSD_DEPTH != 0 && depth_field > 0 {
        depth_field
    } else {
        1
    };
    let is_cube = caps2 & DDSCAPS2_CUBEMAP != 0;
    let _ = caps;

    let mut offset = 4 + DDS_HEADER_LEN;
    let pixel_format = if pf_flags & DDPF_FOURCC != 0 && &fourcc == b"DX10" {
        let dx10 = bytes
            .get(offset..offset + DX10_HEADER_LEN)
            .ok_or(Error::UnexpectedEof)?;
        let mut dc = std::io::Cursor::new(dx10);
        let dxgi_format = le_u32(&mut dc)?;
        let _resource_dimension = le_u32(&mut dc)?;
        let _misc_flag = le_u32(&mut dc)?;
        let _array_size = le_u32(&mut dc)?;
        let _misc_flags2 = le_u32(&mut dc)?;
        offset += DX10_HEADER_LEN;
        pixel_format_for_dxgi(dxgi_format)
            .ok_or(Error::Parse("unrecognized DX10 dxgiFormat"))?
    } else if pf_flags & DDPF_FOURCC != 0 {
        pixel_format_for_fourcc(&fourcc).ok_or(Error::Parse("unrecognized DDS FourCC"))?
    } else if pf_flags & (DDPF_RGB | DDPF_ALPHAPIXELS) != 0 {
        0
    } else {
        return Err(Error::Parse("DDS pixel format is neither FourCC nor RGB"));
    };

    let faces = if is_cube { 6 } else { 1 };
    let mut frames = Vec::with_capacity(faces * mipmaps as usize);
    let data = &bytes[offset..];
    let mut cursor = 0usize;
    for _face in 0..faces {
        for mip in 0..mipmaps {
            let len = dds_mipmap_size(pixel_format, width, height, depth, mip)?;
            let end = cursor.checked_add(len).ok_or(Error::InvalidRange)?;
            let slice = data.get(cursor..end).ok_or(Error::UnexpectedEof)?;
            frames.push(slice.to_vec());
            cursor = end;
        }
    }

    Ok(DdsImage {
        width,
        height,
        depth,
        mipmaps,
        is_cube,
        pixel_format,
        frames,
    })
}

/// Serialize a [`DdsImage`] back into DDS bytes.
pub fn encode_dds(image: &DdsImage) -> Result<Vec<u8>> {
    let (block_px, _) = block_config(image.pixel_format)?;
    let _ = block_px;
    let mip0_size = dds_mipmap_size(image.pixel_format, image.width, image.height, image.depth, 0)?;

    let mut out = Vec::with_capacity(4 + DDS_HEADER_LEN);
    out.extend_from_slice(b"DDS ");
    write_le_u32(&mut out, 124)?;

    let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
    if image.mipmaps > 1 {
        flags |= DDSD_MIPMAPCOUNT;
    }
    if image.depth > 1 {
        flags |= DDSD_DEPTH;
    }
    if image.pixel_format == 0 {
        flags |= 0x8; // DDSD_PITCH
    } else {
        flags |= DDSD_LINEARSIZE;
    }
    write_le_u32(&mut out, flags)?;
    write_le_u32(&mut out, image.height)?;
    write_le_u32(&mut out, image.width)?;
    write_le_u32(&mut out, mip0_size as u32)?;
    write_le_u32(&mut out, image.depth)?;
    write_le_u32(&mut out, image.mipmaps)?;
    for _ in 0..11 {
        write_le_u32(&mut out, 0)?;
    }

    write_le_u32(&mut out, 32)?; // pixel format struct size

    let (dxgi, fourcc) = dxgi_for_pixel_format(image.pixel_format)
        .map(|(d, f)| (Some(d), f))
        .unwrap_or((None, None));

    if image.pixel_format == 0 {
        write_le_u32(&mut out, DDPF_RGB | DDPF_ALPHAPIXELS)?;
        out.extend_from_slice(&[0u8; 4]); // fourCC unused
        write_le_u32(&mut out, 32)?; // rgbBitCount
        write_le_u32(&mut out, 0x00FF_0000)?; // R
        write_le_u32(&mut out, 0x0000_FF00)?; // G
        write_le_u32(&mut out, 0x0000_00FF)?; // B
        write_le_u32(&mut out, 0xFF00_0000)?; // A
    } else if let Some(fourcc) = fourcc {
        write_le_u32(&mut out, DDPF_FOURCC)?;
        out.extend_from_slice(fourcc);
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
    } else {
        write_le_u32(&mut out, DDPF_FOURCC)?;
        out.extend_from_slice(b"DX10");
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
        write_le_u32(&mut out, 0)?;
    }

    let mut caps = DDSCAPS_TEXTURE;
    if image.mipmaps > 1 {
        caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
    }
    if image.is_cube {
        caps |= DDSCAPS_COMPLEX;
    }
    write_le_u32(&mut out, caps)?;

    let mut caps2 = 0u32;
    if image.is_cube {
        caps2 |= DDSCAPS2_CUBEMAP | DDSCAPS2_CUBEMAP_ALL_FACES;
    }
    if image.depth > 1 {
        caps2 |= DDSCAPS2_VOLUME;
    }
    write_le_u32(&mut out, caps2)?;
    write_le_u32(&mut out, 0)?; // caps3
    write_le_u32(&mut out, 0)?; // caps4
    write_le_u32(&mut out, 0)?; // reserved2

    if fourcc.is_none() && image.pixel_format != 0 {
        let dxgi_format = dxgi.ok_or(Error::Parse("no DXGI format for this pixel format"))?;
        write_le_u32(&mut out, dxgi_format)?;
        write_le_u32(&mut out, if image.depth > 1 { 4 } else { 3 })?; // resourceDimension: TEXTURE3D=4, TEXTURE2D=3
        write_le_u32(&mut out, 0)?; // miscFlag
        write_le_u32(&mut out, 1)?; // arraySize
        write_le_u32(&mut out, 0)?; // miscFlags2
    }

    for frame in &image.frames {
        out.extend_from_slice(frame);
    }

    Ok(out)
}

// ---------------------------------------------------------------------
// Top-level transcoding
// ---------------------------------------------------------------------

/// Decode an FTEX buffer straight to DDS bytes.
pub fn decode(ftex_bytes: &[u8]) -> Result<Vec<u8>> {
    let texture = decode_texture(ftex_bytes)?;
    let image = DdsImage {
        width: texture.header.width as u32,
        height: texture.header.height as u32,
        depth: texture.header.depth.max(1) as u32,
        mipmaps: texture.header.mipmaps as u32,
        is_cube: texture.header.is_cube(),
        pixel_format: texture.header.pixel_format,
        frames: texture.frames,
    };
    encode_dds(&image)
}

/// Encode a DDS buffer to FTEX bytes, compressing every frame.
pub fn encode(dds_bytes: &[u8], color_space: ColorSpace) -> Result<Vec<u8>> {
    let image = decode_dds(dds_bytes)?;
    let version = if image.pixel_format <= 4 { 2.03 } else { 2.04 };
    let mut texture_type = color_space.low_nibble();
    if image.is_cube {
        texture_type |= TEXTURE_TYPE_CUBE;
    }

    let header = FtexHeader {
        version,
        pixel_format: image.pixel_format,
        width: image.width as u16,
        height: image.height as u16,
        depth: image.depth as u16,
        mipmaps: image.mipmaps as u8,
        nrt: 0x02,
        flags: 0x11,
        unk1: 1,
        unk2: 0,
        texture_type,
        hash1: [0; 8],
        hash2: [0; 8],
    };

    encode_texture(&FtexTexture {
        header,
        frames: image.frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmap_size_halves_each_level() {
        // format 2 (BC1): 4x4 blocks, 8 bytes/block.
        assert_eq!(dds_mipmap_size(2, 16, 16, 1, 0).unwrap(), 4 * 4 * 8);
        assert_eq!(dds_mipmap_size(2, 16, 16, 1, 1).unwrap(), 2 * 2 * 8);
        assert_eq!(dds_mipmap_size(2, 16, 16, 1, 2).unwrap(), 1 * 1 * 8);
    }

    #[test]
    fn round_trips_single_mip_uncompressed_texture() {
        let header = FtexHeader {
            version: 2.03,
            pixel_format: 0,
            width: 2,
            height: 2,
            depth: 1,
            mipmaps: 1,
            nrt: 0x02,
            flags: 0x11,
            unk1: 1,
            unk2: 0,
            texture_type: ColorSpace::Linear.low_nibble(),
            hash1: [0; 8],
            hash2: [0; 8],
        };
        let frame = vec![0xAAu8; 2 * 2 * 4];
        let texture = FtexTexture {
            header,
            frames: vec![frame.clone()],
        };
        let encoded = encode_texture(&texture).unwrap();
        let decoded = decode_texture(&encoded).unwrap();
        assert_eq!(decoded.frames, vec![frame]);
        assert_eq!(decoded.header.width, 2);
        assert_eq!(decoded.header.mipmaps, 1);
    }

    #[test]
    fn rejects_zero_mipmaps() {
        let mut bytes = vec![0u8; FTEX_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"FTEX");
        bytes[4..8].copy_from_slice(&2.03f32.to_le_bytes());
        // pixel_format/width/height/depth all zero; mipmaps byte at offset 16 is 0.
        assert!(matches!(decode_texture(&bytes), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = vec![0u8; FTEX_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"FTEX");
        bytes[4..8].copy_from_slice(&1.0f32.to_le_bytes());
        assert!(matches!(
            decode_texture(&bytes),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn mip_header_index_must_match_position() {
        let header = FtexHeader {
            version: 2.03,
            pixel_format: 0,
            width: 2,
            height: 2,
            depth: 1,
            mipmaps: 2,
            nrt: 0x02,
            flags: 0x11,
            unk1: 1,
            unk2: 0,
            texture_type: ColorSpace::Linear.low_nibble(),
            hash1: [0; 8],
            hash2: [0; 8],
        };
        let frames = vec![vec![0u8; 16], vec![0u8; 4]];
        let texture = FtexTexture { header, frames };
        let mut encoded = encode_texture(&texture).unwrap();
        // Corrupt the second mip header's index byte.
        encoded[FTEX_HEADER_LEN + MIP_HEADER_LEN + 8] = 5;
        assert!(decode_texture(&encoded).is_err());
    }

    #[test]
    fn dds_round_trips_dimensions_and_pixels() {
        let image = DdsImage {
            width: 8,
            height: 8,
            depth: 1,
            mipmaps: 1,
            is_cube: false,
            pixel_format: 2,
            frames: vec![vec![0x11u8; 2 * 2 * 8]],
        };
        let bytes = encode_dds(&image).unwrap();
        let decoded = decode_dds(&bytes).unwrap();
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 8);
        assert_eq!(decoded.pixel_format, 2);
        assert_eq!(decoded.frames, image.frames);
    }

    #[test]
    fn ftex_dds_ftex_round_trip_preserves_pixels() {
        let image = DdsImage {
            width: 4,
            height: 4,
            depth: 1,
            mipmaps: 1,
            is_cube: false,
            pixel_format: 2,
            frames: vec![vec![0x7Fu8; 1 * 1 * 8]],
        };
        let dds_bytes = encode_dds(&image).unwrap();
        let ftex_bytes = encode(&dds_bytes, ColorSpace::Linear).unwrap();
        let round_tripped = decode(&ftex_bytes).unwrap();
        let back = decode_dds(&round_tripped).unwrap();
        assert_eq!(back.width, image.width);
        assert_eq!(back.height, image.height);
        assert_eq!(back.pixel_format, image.pixel_format);
        assert_eq!(back.frames, image.frames);
    }

    #[test]
    fn round_trips_frame_split_across_multiple_chunks() {
        // 128x128x4 bytes = 65536 bytes, four 16 KiB chunks - exercises the
        // chunk directory's offset field, which single-chunk frames never do.
        let header = FtexHeader {
            version: 2.03,
            pixel_format: 0,
            width: 128,
            height: 128,
            depth: 1,
            mipmaps: 1,
            nrt: 0x02,
            flags: 0x11,
            unk1: 1,
            unk2: 0,
            texture_type: ColorSpace::Linear.low_nibble(),
            hash1: [0; 8],
            hash2: [0; 8],
        };
        let frame: Vec<u8> = (0..128 * 128 * 4).map(|i| (i % 256) as u8).collect();
        let texture = FtexTexture {
            header,
            frames: vec![frame.clone()],
        };
        let encoded = encode_texture(&texture).unwrap();
        let decoded = decode_texture(&encoded).unwrap();
        assert_eq!(decoded.frames, vec![frame]);
    }
}

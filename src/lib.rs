//! **pescore** - codecs for a football-simulation game's asset container
//! and texture formats.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`cri::cpk`]           | CPK - archive container built on a UTF table |
//! | [`cri::utf`]           | UTF table - the column-oriented subformat CPK is built on |
//! | [`cri::crilayla`]      | CRILAYLA - LZ-style decompressor for CPK entries |
//! | [`ftex`]                | FTEX ⇔ DDS - mipmapped texture transcoder |
//! | [`container::fpk`]      | FPK - MD5-keyed flat archive |
//! | [`container::fsop`]     | FSOP - paired vertex/pixel shader archive |
//! | [`container::uniparam`] | UniformParameter - indexed blob table |
//! | [`container::framed_zlib`] | Framed zlib - 16-byte "WESYS/ESYS" envelope |
//!
//! Every codec here is a synchronous, buffer-oriented transformation: bytes
//! in, a parsed model, bytes out. None of them touch the filesystem,
//! parse CLI arguments, or read the host clock - that orchestration belongs
//! to the caller (see `demos/` for thin examples).

pub mod container;
pub mod cri;
pub mod error;
pub mod ftex;
pub mod utils;

pub use error::{Error, Result};

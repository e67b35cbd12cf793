//! The three simple tabular archive/container formats, plus the framed
//! zlib wrapper they (and FTEX) sit on top of.
//!
//! | Module | Format |
//! |--------|--------|
//! | [`framed_zlib`] | 16-byte "WESYS/ESYS" envelope around a raw zlib payload |
//! | [`fpk`]         | MD5-keyed flat archive ("fox package") |
//! | [`fsop`]        | Paired vertex/pixel shader archive, XOR-obfuscated |
//! | [`uniparam`]    | Indexed blob table with NUL-terminated filenames |

pub mod fpk;
pub mod framed_zlib;
pub mod fsop;
pub mod uniparam;

//! CRI Middleware container formats: the UTF table subformat, the
//! CRILAYLA entry codec it sits on top of, and the CPK archive built from
//! both.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`bitstream`] | Reverse-direction, MSB-first bit reader over a byte buffer |
//! | [`crilayla`]  | LZ-style back-reference decompressor for CPK entries |
//! | [`utf`]       | Column-oriented, XOR-obfuscated tabular serializer/deserializer |
//! | [`cpk`]       | Archive container built from three UTF tables |

pub mod bitstream;
pub mod cpk;
pub mod crilayla;
pub mod utf;

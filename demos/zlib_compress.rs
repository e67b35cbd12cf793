use std::env;
use std::fs;

use pescore::Result;
use pescore::container::framed_zlib;

/// Wraps a file in the framed zlib envelope used by CPK entries and FTEX
/// frames, only when doing so is smaller than the input.
///
/// Usage: `zlib_compress <in> <out>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let in_path = args.next().expect("usage: zlib_compress <in> <out>");
    let out_path = args.next().expect("usage: zlib_compress <in> <out>");

    let data = fs::read(in_path)?;
    fs::write(out_path, framed_zlib::try_compress(&data))?;
    Ok(())
}

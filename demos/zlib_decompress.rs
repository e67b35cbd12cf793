use std::env;
use std::fs;

use pescore::Result;
use pescore::container::framed_zlib;

/// Unwraps a framed zlib buffer, passing it through unchanged if it was
/// never framed.
///
/// Usage: `zlib_decompress <in> <out>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let in_path = args.next().expect("usage: zlib_decompress <in> <out>");
    let out_path = args.next().expect("usage: zlib_decompress <in> <out>");

    let data = fs::read(in_path)?;
    fs::write(out_path, framed_zlib::try_decompress(&data)?)?;
    Ok(())
}

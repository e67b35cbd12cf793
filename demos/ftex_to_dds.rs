use std::env;
use std::fs;

use pescore::Result;
use pescore::ftex;

/// Converts an FTEX texture to a DDS file.
///
/// Usage: `ftex_to_dds <in.ftex> <out.dds>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let in_path = args.next().expect("usage: ftex_to_dds <in.ftex> <out.dds>");
    let out_path = args.next().expect("usage: ftex_to_dds <in.ftex> <out.dds>");

    let ftex_bytes = fs::read(in_path)?;
    let dds_bytes = ftex::decode(&ftex_bytes)?;
    fs::write(out_path, dds_bytes)?;
    Ok(())
}

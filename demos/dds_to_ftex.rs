use std::env;
use std::fs;

use pescore::Result;
use pescore::ftex::{self, ColorSpace};

/// Converts a DDS file to an FTEX texture.
///
/// Usage: `dds_to_ftex <in.dds> <out.ftex> [linear|srgb|normal]`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let in_path = args.next().expect("usage: dds_to_ftex <in.dds> <out.ftex> [linear|srgb|normal]");
    let out_path = args.next().expect("usage: dds_to_ftex <in.dds> <out.ftex> [linear|srgb|normal]");
    let color_space = match args.next().as_deref() {
        Some("srgb") => ColorSpace::Srgb,
        Some("normal") => ColorSpace::Normal,
        _ => ColorSpace::Linear,
    };

    let dds_bytes = fs::read(in_path)?;
    let ftex_bytes = ftex::encode(&dds_bytes, color_space)?;
    fs::write(out_path, ftex_bytes)?;
    Ok(())
}

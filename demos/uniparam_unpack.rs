use std::env;
use std::fs;
use std::path::Path;

use pescore::Result;
use pescore::container::uniparam;

/// Extracts every entry of a UniformParameter table to a directory.
///
/// Usage: `uniparam_unpack <in.bin> <dest_dir>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let in_path = args.next().expect("usage: uniparam_unpack <in.bin> <dest_dir>");
    let dest_dir = args.next().expect("usage: uniparam_unpack <in.bin> <dest_dir>");

    let bytes = fs::read(in_path)?;
    let entries = uniparam::decode(&bytes)?;

    fs::create_dir_all(&dest_dir)?;
    for (name, data) in entries {
        fs::write(Path::new(&dest_dir).join(name), data)?;
    }
    Ok(())
}

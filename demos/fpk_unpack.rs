use std::env;
use std::fs;
use std::path::Path;

use pescore::Result;
use pescore::container::fpk;

/// Extracts every entry of an FPK archive to a directory.
///
/// Usage: `fpk_unpack <in.fpk> <dest_dir>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let fpk_path = args.next().expect("usage: fpk_unpack <in.fpk> <dest_dir>");
    let dest_dir = args.next().expect("usage: fpk_unpack <in.fpk> <dest_dir>");

    let bytes = fs::read(fpk_path)?;
    let (_kind, entries) = fpk::decode(&bytes)?;

    fs::create_dir_all(&dest_dir)?;
    for (name, data) in entries {
        fs::write(Path::new(&dest_dir).join(name), data)?;
    }
    Ok(())
}

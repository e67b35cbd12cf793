use std::env;
use std::fs;
use std::path::Path;

use pescore::Result;
use pescore::container::fsop;

/// Extracts every shader pair in an FSOP stream to `<name>.vsh`/`<name>.psh`
/// files.
///
/// Usage: `fsop_unpack <in.fsop> <dest_dir>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let fsop_path = args.next().expect("usage: fsop_unpack <in.fsop> <dest_dir>");
    let dest_dir = args.next().expect("usage: fsop_unpack <in.fsop> <dest_dir>");

    let bytes = fs::read(fsop_path)?;
    let entries = fsop::decode(&bytes)?;

    fs::create_dir_all(&dest_dir)?;
    for (name, pair) in entries {
        fs::write(Path::new(&dest_dir).join(format!("{name}.vsh")), pair.vertex)?;
        fs::write(Path::new(&dest_dir).join(format!("{name}.psh")), pair.pixel)?;
    }
    Ok(())
}

use std::env;
use std::fs::{self, File};
use std::path::Path;

use pescore::Result;
use pescore::cri::cpk::CpkReader;

/// Extracts every entry of a CPK archive to a directory.
///
/// Usage: `cpk_unpack <in.cpk> <dest_dir>`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let cpk_path = args.next().expect("usage: cpk_unpack <in.cpk> <dest_dir>");
    let dest_dir = args.next().expect("usage: cpk_unpack <in.cpk> <dest_dir>");

    let file = File::open(&cpk_path)?;
    let mut reader = CpkReader::new(file)?;

    let names: Vec<String> = reader.entries().map(|e| e.name.clone()).collect();
    for name in names {
        let entry = reader.get_entry_by_name(&name).unwrap().clone();
        let data = reader.read_file(&entry)?;

        let dest_path = Path::new(&dest_dir).join(&name);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest_path, data)?;
    }
    Ok(())
}

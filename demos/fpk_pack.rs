use std::collections::BTreeMap;
use std::env;
use std::fs;

use pescore::Result;
use pescore::container::fpk::{self, FpkKind};

/// Packs explicit files into an FPK archive.
///
/// Usage: `fpk_pack <out.fpk> <name>=<local_file> ...`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let out_path = args
        .next()
        .expect("usage: fpk_pack <out.fpk> <name>=<local_file> ...");

    let mut entries = BTreeMap::new();
    for arg in args {
        let (name, local_path) = arg
            .split_once('=')
            .expect("each entry must be <name>=<local_file>");
        entries.insert(name.to_string(), fs::read(local_path)?);
    }

    let kind = if out_path.ends_with(".fpkd") {
        FpkKind::Fpkd
    } else {
        FpkKind::Fpk
    };
    fs::write(&out_path, fpk::encode(kind, &entries)?)?;
    Ok(())
}

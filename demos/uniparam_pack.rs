use std::collections::BTreeMap;
use std::env;
use std::fs;

use pescore::Result;
use pescore::container::uniparam;

/// Packs explicit files into a UniformParameter table.
///
/// Usage: `uniparam_pack <out.bin> <name>=<local_file> ...`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let out_path = args
        .next()
        .expect("usage: uniparam_pack <out.bin> <name>=<local_file> ...");

    let mut entries = BTreeMap::new();
    for arg in args {
        let (name, local_path) = arg
            .split_once('=')
            .expect("each entry must be <name>=<local_file>");
        entries.insert(name.to_string(), fs::read(local_path)?);
    }

    fs::write(&out_path, uniparam::encode(&entries)?)?;
    Ok(())
}

use std::env;
use std::fs;

use pescore::Result;
use pescore::cri::cpk::CpkBuilder;

/// Packs explicit files into a CPK archive.
///
/// Usage: `cpk_pack <out.cpk> <packed_path>=<local_file> ...`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let out_path = args
        .next()
        .expect("usage: cpk_pack <out.cpk> <packed_path>=<local_file> ...");

    let mut builder = CpkBuilder::new();
    for arg in args {
        let (packed_path, local_path) = arg
            .split_once('=')
            .expect("each entry must be <packed_path>=<local_file>");
        let data = fs::read(local_path)?;
        builder.add_file(packed_path, data, None)?;
    }

    fs::write(&out_path, builder.build()?)?;
    Ok(())
}

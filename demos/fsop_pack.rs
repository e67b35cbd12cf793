use std::collections::BTreeMap;
use std::env;
use std::fs;

use pescore::Result;
use pescore::container::fsop::{self, ShaderPair};

/// Packs explicit vertex/pixel shader pairs into an FSOP stream.
///
/// Usage: `fsop_pack <out.fsop> <name>=<vertex_file>,<pixel_file> ...`
fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let out_path = args
        .next()
        .expect("usage: fsop_pack <out.fsop> <name>=<vertex_file>,<pixel_file> ...");

    let mut entries = BTreeMap::new();
    for arg in args {
        let (name, paths) = arg
            .split_once('=')
            .expect("each entry must be <name>=<vertex_file>,<pixel_file>");
        let (vertex_path, pixel_path) = paths
            .split_once(',')
            .expect("each entry must be <name>=<vertex_file>,<pixel_file>");
        entries.insert(
            name.to_string(),
            ShaderPair {
                vertex: fs::read(vertex_path)?,
                pixel: fs::read(pixel_path)?,
            },
        );
    }

    fs::write(&out_path, fsop::encode(&entries)?)?;
    Ok(())
}

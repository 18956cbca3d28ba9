//! Write sample captured responses for `chnative inspect` / `validate`.
//!
//! ```text
//! cargo run -p chnative-tests --bin write_fixtures -- <out-dir>
//! ```

use std::path::PathBuf;
use std::{env, fs, process};

use chnative_tests::{failing_response, insert_preamble, select_response};
use chnative_wire::CompressionMethod;

fn main() {
    let out = env::args_os().nth(1).map_or_else(|| PathBuf::from("fixtures"), PathBuf::from);

    let fixtures = [
        ("select.bin", select_response(3, 1000, None)),
        ("select_zstd.bin", select_response(3, 1000, Some(CompressionMethod::Zstd))),
        ("insert_preamble.bin", insert_preamble()),
        ("exception.bin", failing_response()),
    ];

    if let Err(e) = fs::create_dir_all(&out) {
        eprintln!("error: cannot create {}: {e}", out.display());
        process::exit(1);
    }
    for (name, bytes) in fixtures {
        let path = out.join(name);
        if let Err(e) = fs::write(&path, &bytes) {
            eprintln!("error: cannot write {}: {e}", path.display());
            process::exit(1);
        }
        println!("{} ({} bytes)", path.display(), bytes.len());
    }
}

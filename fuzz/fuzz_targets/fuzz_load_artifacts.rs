//! Arbitrary bytes as the forest blob and handle sequence must load as
//! an error, never panic or hang.

#![no_main]

use std::fs;

use libfuzzer_sys::fuzz_target;
use snapmatch::index;
use snapmatch::storage::ArtifactPaths;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let at = (split as usize * rest.len()) / 256;
    let (forest, handles) = rest.split_at(at);

    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    fs::write(&paths.dimension, "4").unwrap();
    fs::write(&paths.forest, forest).unwrap();
    fs::write(&paths.handles, handles).unwrap();

    if let Ok(index) = index::load(&paths) {
        // A blob that passes the checks must be safe to query.
        let _ = index.search(&[0.5, -0.5, 0.25, 1.0], 10);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapmatch::Catalog;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data) {
        if let Ok(catalog) = Catalog::from_json_str(json) {
            let _ = catalog.filter_options();
        }
    }
});

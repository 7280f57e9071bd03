#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use phenology::config::ConfigLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // Any outcome is fine as long as loading never panics.
        let _ = ConfigLoader::default().load_from_str(yaml_str, Path::new("fuzz.yaml"));
    }
});

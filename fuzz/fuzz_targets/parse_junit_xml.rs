#![no_main]

use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = flipgate_ingest::parse_junit_xml(s, Path::new("fuzz.xml"));
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(report) = serde_json::from_slice::<flipgate_types::FlakeReport>(data) {
        let _ = flipgate_render::render_markdown(&report);
    }
});

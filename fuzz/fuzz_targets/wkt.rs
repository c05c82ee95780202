#![no_main]

use libfuzzer_sys::fuzz_target;
use simple_features::*;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(geom) = decode_ewkt(text) {
            let _ = decode_ewkt(&geom.as_ewkt());
        }
    }
});

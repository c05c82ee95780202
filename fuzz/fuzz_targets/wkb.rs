#![no_main]

use libfuzzer_sys::fuzz_target;
use simple_features::*;

fuzz_target!(|data: &[u8]| {
    if let Ok(geom) = decode_ewkb(data) {
        let _ = decode_ewkb(&geom.as_ewkb());
        let _ = geom.as_ewkt();
    }
});

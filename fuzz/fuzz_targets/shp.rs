#![no_main]

use libfuzzer_sys::fuzz_target;
use simple_features::*;
use std::fs;
use std::path::Path;

/// Replace the content of the single record of a PolygonZ file with `data`
fn write_record(root: &Path, data: &[u8]) -> Result<()> {
    let mut shp = ShapeFile::create(root, ShapeType::PolygonZ, Vec::new())?;
    shp.transaction(|tr| {
        tr.add(ShpRecord::null(Row::new()));
        Ok(())
    })?;
    let words = (data.len() / 2) as u32;
    let file_words = ((HEADER_SIZE + 8) / 2) as u32 + words;

    let mut bytes = fs::read(root.with_extension("shp"))?;
    bytes.truncate(HEADER_SIZE + 4);
    bytes[24..28].copy_from_slice(&file_words.to_be_bytes());
    bytes.extend_from_slice(&words.to_be_bytes());
    bytes.extend_from_slice(&data[..words as usize * 2]);
    fs::write(root.with_extension("shp"), bytes)?;

    let mut index = fs::read(root.with_extension("shx"))?;
    index[HEADER_SIZE + 4..HEADER_SIZE + 8].copy_from_slice(&words.to_be_bytes());
    fs::write(root.with_extension("shx"), index)?;
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let root = dir.path().join("fuzz");
    if write_record(&root, data).is_err() {
        return;
    }
    if let Ok(shp) = ShapeFile::open(&root) {
        let _ = shp.record(0);
    }
});

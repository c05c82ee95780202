use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use fallible_streaming_iterator::FallibleStreamingIterator;
use simple_features::*;
use std::fs;
use std::path::Path;

const POINTS: [(f64, f64, &str); 2] = [(-90.08375, 34.39996, "6"), (-87.8258, 33.36416, "9")];

fn file_header(out: &mut Vec<u8>, file_length: usize, bbox: [f64; 4]) {
    out.write_i32::<BigEndian>(9994).unwrap();
    for _ in 0..5 {
        out.write_i32::<BigEndian>(0).unwrap();
    }
    out.write_i32::<BigEndian>((file_length / 2) as i32).unwrap();
    out.write_i32::<LittleEndian>(1000).unwrap();
    out.write_i32::<LittleEndian>(1).unwrap();
    for v in bbox {
        out.write_f64::<LittleEndian>(v).unwrap();
    }
    for _ in 0..4 {
        out.write_f64::<LittleEndian>(0.0).unwrap();
    }
}

/// Point shapefile with one numeric field, as produced by other GIS tools
fn write_point_fixture(root: &Path) {
    let bbox = [-90.08375, 33.36416, -87.8258, 34.39996];
    let mut shp = Vec::new();
    let mut shx = Vec::new();
    file_header(&mut shp, 100 + 2 * 28, bbox);
    file_header(&mut shx, 100 + 2 * 8, bbox);
    for (i, (x, y, _)) in POINTS.iter().enumerate() {
        shx.write_i32::<BigEndian>((100 + i as i32 * 28) / 2).unwrap();
        shx.write_i32::<BigEndian>(10).unwrap();
        shp.write_i32::<BigEndian>(i as i32 + 1).unwrap();
        shp.write_i32::<BigEndian>(10).unwrap();
        shp.write_i32::<LittleEndian>(1).unwrap();
        shp.write_f64::<LittleEndian>(*x).unwrap();
        shp.write_f64::<LittleEndian>(*y).unwrap();
    }

    let mut dbf = vec![0x03, 107, 3, 14];
    dbf.write_u32::<LittleEndian>(2).unwrap();
    dbf.write_u16::<LittleEndian>(32 + 32 + 1).unwrap();
    dbf.write_u16::<LittleEndian>(1 + 10).unwrap();
    dbf.extend_from_slice(&[0; 20]);
    let mut desc = [0u8; 32];
    desc[..6].copy_from_slice(b"Hoyoyo");
    desc[11] = b'N';
    desc[16] = 10;
    dbf.extend_from_slice(&desc);
    dbf.push(0x0D);
    for (_, _, value) in POINTS {
        dbf.push(b' ');
        dbf.extend_from_slice(format!("{value:>10}").as_bytes());
    }
    dbf.push(0x1A);

    fs::write(root.with_extension("shp"), shp).unwrap();
    fs::write(root.with_extension("shx"), shx).unwrap();
    fs::write(root.with_extension("dbf"), dbf).unwrap();
}

#[test]
fn read_point_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("point");
    write_point_fixture(&root);

    let shp = ShapeFile::open(root.with_extension("shp"))?;
    assert_eq!(shp.record_count(), 2);
    assert_eq!(shp.shape_type(), ShapeType::Point);
    assert_eq!(shp.fields().len(), 1);
    assert_eq!(shp.fields()[0].name, "Hoyoyo");
    assert_eq!(shp.fields()[0].field_type, FieldType::Numeric);
    assert_eq!(shp.header().bbox(), [-90.08375, 33.36416, -87.8258, 34.39996]);

    let record = shp.record(0)?;
    match record.geometry() {
        Some(Geometry::Point(p)) => {
            assert!((p.x() + 90.08375).abs() < 1e-6);
            assert!((p.y() - 34.39996).abs() < 1e-6);
            assert_eq!(p.srid(), DEFAULT_SRID);
        }
        other => panic!("unexpected geometry {other:?}"),
    }
    assert_eq!(record.data["Hoyoyo"], FieldValue::Integer(6));
    assert_eq!(shp.record(1)?.data["Hoyoyo"], FieldValue::Integer(9));
    assert!(matches!(
        shp.record(2),
        Err(Error::OutOfRange { index: 2, count: 2 })
    ));
    Ok(())
}

#[test]
fn iterate_records() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("point");
    write_point_fixture(&root);

    let shp = ShapeFile::open(&root)?;
    let mut records = shp.records();
    let mut indexes = Vec::new();
    while let Some(record) = records.next()? {
        indexes.push(record.index);
    }
    assert_eq!(indexes, vec![0, 1]);
    Ok(())
}

#[test]
fn bounding_box_from_header() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("point");
    write_point_fixture(&root);

    let bbox = ShapeFile::open(&root)?.bounding_box();
    assert_eq!(bbox.lower_corner().x(), -90.08375);
    assert_eq!(bbox.upper_corner().y(), 34.39996);
    Ok(())
}

#[test]
fn missing_sibling_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("point");
    write_point_fixture(&root);
    fs::remove_file(root.with_extension("shx"))?;
    assert!(matches!(ShapeFile::open(&root), Err(Error::IO(_))));
    Ok(())
}

#[test]
fn invalid_file_code() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("point");
    write_point_fixture(&root);
    let mut shp = fs::read(root.with_extension("shp"))?;
    shp[3] = 0;
    fs::write(root.with_extension("shp"), shp)?;
    assert!(matches!(
        ShapeFile::open(&root),
        Err(Error::InvalidFileCode(_))
    ));
    Ok(())
}

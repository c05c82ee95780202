use geozero::geojson::{GeoJson, GeoJsonWriter};
use geozero::GeozeroGeometry;
use simple_features::*;

const SAMPLES: [&str; 8] = [
    "SRID=4326;POINT(12.4 -45.3)",
    "SRID=256;POINT(12.4 -45.3 35.3 45.1)",
    "SRID=4326;LINESTRING(10 -20,-0.5 0.5)",
    "SRID=4326;POLYGON((0 0,4 0,4 4,0 4,0 0),(1 1,3 1,3 3,1 3,1 1))",
    "SRID=4326;MULTIPOINT((12.4 -123.3),(-65.1 123.4))",
    "SRID=4326;MULTILINESTRINGM((1 2 3,4 5 6),(7 8 9,10 11 12))",
    "SRID=4326;MULTIPOLYGON(((0 0,4 0,4 4,0 0)),((10 10,11 10,11 11,10 10)))",
    "SRID=256;GEOMETRYCOLLECTIONM(POINTM(4.67 45.4 45.6),LINESTRINGM(5.7 12.45 5.6,67.55 54 6.7))",
];

#[test]
fn text_and_binary_agree() -> Result<()> {
    for text in SAMPLES {
        let geom = decode_ewkt(text)?;
        assert_eq!(geom.as_ewkt(), text);
        let binary = decode_ewkb(&geom.as_ewkb())?;
        assert_eq!(binary, geom, "{text}");
        assert_eq!(decode_hex_ewkb(&geom.as_hex_ewkb())?, geom, "{text}");
    }
    Ok(())
}

#[test]
fn plain_wkb_drops_srid_and_extra_ordinates() -> Result<()> {
    let geom = decode_ewkt("SRID=256;POINT(1 2 3 4)")?;
    let wkb = geom.as_wkb();
    assert_eq!(wkb.len(), 21);
    let plain = decode_wkb(&wkb)?;
    assert_eq!(plain.srid(), DEFAULT_SRID);
    assert!(!plain.has_z() && !plain.has_m());
    assert_eq!(plain.as_wkt(), "POINT(1 2)");
    Ok(())
}

#[test]
fn truncated_binary_fails() -> Result<()> {
    let wkb = decode_ewkt("SRID=4326;LINESTRING(10 -20,-0.5 0.5)")?.as_ewkb();
    for len in [0, 1, 4, 8, 12, wkb.len() - 1] {
        assert!(
            matches!(decode_ewkb(&wkb[..len]), Err(Error::MalformedBinary(_))),
            "length {len}"
        );
    }
    Ok(())
}

#[test]
fn malformed_text_fails() {
    for text in ["", "POINT", "POINT(1)", "LINESTRING(1 2,3)", "CIRCLE(1 2)", "SRID=x;POINT(1 2)"] {
        assert!(
            matches!(decode_ewkt(text), Err(Error::MalformedText(_))),
            "{text}"
        );
    }
}

#[test]
fn envelope_of_geometry() -> Result<()> {
    let geom = decode_ewkt("SRID=4326;MULTIPOINT((12.4 -123.3),(-65.1 123.4))")?;
    let bbox = geom.bounding_box().expect("bbox of non-empty geometry");
    assert_eq!(bbox.lower_corner().x(), -65.1);
    assert_eq!(bbox.lower_corner().y(), -123.3);
    assert_eq!(bbox.upper_corner().x(), 12.4);
    assert_eq!(bbox.upper_corner().y(), 123.4);
    assert_eq!(bbox.srid(), 4326);
    assert!(decode_ewkt("MULTIPOINT EMPTY")?.bounding_box().is_none());
    Ok(())
}

#[test]
fn geojson_interop() -> geozero::error::Result<()> {
    let geom = Geometry::from_geozero(&GeoJson(
        r#"{"type": "LineString", "coordinates": [[1.5, 2.0], [3.0, 4.25]]}"#,
    ))?;
    assert_eq!(geom.as_wkt(), "LINESTRING(1.5 2,3 4.25)");

    let mut out: Vec<u8> = Vec::new();
    geom.process_geom(&mut GeoJsonWriter::new(&mut out))?;
    let json = String::from_utf8_lossy(&out);
    assert!(json.contains("LineString"), "{json}");
    assert!(json.contains("4.25"), "{json}");
    Ok(())
}

//! WKB and EWKB codec.
//!
//! Layout: byte order flag (1 = little-endian), 4-byte type code, optional
//! 4-byte SRID, then the body. EWKB marks optional parts with the three high
//! bits of the type code. Counts precede every repeated block and elements
//! of multi geometries and collections carry their own header.
//!
//! The encoder always writes little-endian. The decoder reads both byte
//! orders.

use crate::error::{Error, Result};
use crate::geometry::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::mem::size_of;

pub const WKB_POINT: u32 = 1;
pub const WKB_LINESTRING: u32 = 2;
pub const WKB_POLYGON: u32 = 3;
pub const WKB_MULTIPOINT: u32 = 4;
pub const WKB_MULTILINESTRING: u32 = 5;
pub const WKB_MULTIPOLYGON: u32 = 6;
pub const WKB_GEOMETRYCOLLECTION: u32 = 7;

const Z_FLAG: u32 = 0x8000_0000;
const M_FLAG: u32 = 0x4000_0000;
const SRID_FLAG: u32 = 0x2000_0000;

/// Byte order flag values
const WKB_XDR: u8 = 0;
const WKB_NDR: u8 = 1;

/// Smallest possible encoding of a nested geometry header
const HEADER_MIN_SIZE: usize = size_of::<u8>() + size_of::<u32>();

/// What the encoder emits beyond x/y.
///
/// `z`/`m` suppress ordinates present on the geometry, they never add
/// missing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EwkbOptions {
    /// Write the SRID flag and field
    pub srid: bool,
    /// Allow Z ordinates
    pub z: bool,
    /// Allow M ordinates
    pub m: bool,
}

impl Default for EwkbOptions {
    fn default() -> Self {
        EwkbOptions {
            srid: true,
            z: true,
            m: true,
        }
    }
}

impl EwkbOptions {
    /// Plain WKB: no SRID, no Z, no M
    pub fn wkb() -> Self {
        EwkbOptions {
            srid: false,
            z: false,
            m: false,
        }
    }
}

pub(crate) fn base_type_code(geom: &Geometry) -> u32 {
    match geom {
        Geometry::Point(_) => WKB_POINT,
        Geometry::LineString(_) => WKB_LINESTRING,
        Geometry::Polygon(_) => WKB_POLYGON,
        Geometry::MultiPoint(_) => WKB_MULTIPOINT,
        Geometry::MultiLineString(_) => WKB_MULTILINESTRING,
        Geometry::MultiPolygon(_) => WKB_MULTIPOLYGON,
        Geometry::GeometryCollection(_) => WKB_GEOMETRYCOLLECTION,
    }
}

/// Encode with SRID, Z and M
pub fn encode_ewkb(geom: &Geometry) -> Vec<u8> {
    encode_with(geom, &EwkbOptions::default())
}

/// Encode as plain 2D WKB
pub fn encode_wkb(geom: &Geometry) -> Vec<u8> {
    encode_with(geom, &EwkbOptions::wkb())
}

pub fn encode_with(geom: &Geometry, opts: &EwkbOptions) -> Vec<u8> {
    let mut writer = WkbWriter {
        buf: Vec::new(),
        dims: geom.dims().restrict(opts.z, opts.m),
    };
    let srid = opts.srid.then(|| geom.srid());
    writer.write_geometry(geom, srid);
    writer.buf
}

pub fn decode_ewkb(bytes: &[u8]) -> Result<Geometry> {
    decode_ewkb_with_srid(bytes, DEFAULT_SRID)
}

/// Decode, assigning `default_srid` when the input carries none
pub fn decode_ewkb_with_srid(bytes: &[u8], default_srid: i32) -> Result<Geometry> {
    let mut reader = WkbReader {
        buf: bytes,
        pos: 0,
        default_srid,
    };
    let geom = reader.read_geometry(None, 0)?;
    if reader.remaining() > 0 {
        return Err(Error::MalformedBinary(format!(
            "{} trailing bytes after geometry",
            reader.remaining()
        )));
    }
    Ok(geom)
}

/// Plain WKB is a subset of EWKB and decodes the same way
pub fn decode_wkb(bytes: &[u8]) -> Result<Geometry> {
    decode_ewkb(bytes)
}

pub fn decode_hex_ewkb(hex: &str) -> Result<Geometry> {
    decode_ewkb(&from_hex(hex)?)
}

pub fn decode_hex_wkb(hex: &str) -> Result<Geometry> {
    decode_wkb(&from_hex(hex)?)
}

fn from_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim()).map_err(|e| Error::MalformedBinary(format!("invalid hex: {e}")))
}

impl Geometry {
    pub fn as_ewkb(&self) -> Vec<u8> {
        encode_ewkb(self)
    }
    pub fn as_wkb(&self) -> Vec<u8> {
        encode_wkb(self)
    }
    pub fn as_ewkb_with(&self, opts: &EwkbOptions) -> Vec<u8> {
        encode_with(self, opts)
    }
    /// Uppercase hex of the EWKB encoding
    pub fn as_hex_ewkb(&self) -> String {
        hex::encode_upper(self.as_ewkb())
    }
    /// Uppercase hex of the WKB encoding
    pub fn as_hex_wkb(&self) -> String {
        hex::encode_upper(self.as_wkb())
    }
}

struct WkbWriter {
    buf: Vec<u8>,
    /// Output dimensions, shared by the whole tree
    dims: Dimensions,
}

impl WkbWriter {
    fn write_u32(&mut self, v: u32) {
        let mut b = [0; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn write_i32(&mut self, v: i32) {
        let mut b = [0; 4];
        LittleEndian::write_i32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn write_f64(&mut self, v: f64) {
        let mut b = [0; 8];
        LittleEndian::write_f64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    fn write_count(&mut self, n: usize) {
        self.write_u32(n as u32);
    }

    fn write_header(&mut self, code: u32, srid: Option<i32>) {
        self.buf.push(WKB_NDR);
        let mut type_id = code;
        if self.dims.z {
            type_id |= Z_FLAG;
        }
        if self.dims.m {
            type_id |= M_FLAG;
        }
        if srid.is_some() {
            type_id |= SRID_FLAG;
        }
        self.write_u32(type_id);
        if let Some(srid) = srid {
            self.write_i32(srid);
        }
    }

    fn write_coord(&mut self, p: &Point) {
        self.write_f64(p.x());
        self.write_f64(p.y());
        if self.dims.z {
            self.write_f64(p.z());
        }
        if self.dims.m {
            self.write_f64(p.m());
        }
    }

    fn write_points(&mut self, points: &[Point]) {
        self.write_count(points.len());
        for p in points {
            self.write_coord(p);
        }
    }

    fn write_rings(&mut self, rings: &[LinearRing]) {
        self.write_count(rings.len());
        for ring in rings {
            self.write_points(ring.points());
        }
    }

    fn write_geometry(&mut self, geom: &Geometry, srid: Option<i32>) {
        self.write_header(base_type_code(geom), srid);
        match geom {
            Geometry::Point(p) => self.write_coord(p),
            Geometry::LineString(line) => self.write_points(line.points()),
            Geometry::Polygon(poly) => self.write_rings(poly.rings()),
            Geometry::MultiPoint(multi) => {
                self.write_count(multi.len());
                for p in multi.points() {
                    self.write_header(WKB_POINT, None);
                    self.write_coord(p);
                }
            }
            Geometry::MultiLineString(multi) => {
                self.write_count(multi.len());
                for line in multi.line_strings() {
                    self.write_header(WKB_LINESTRING, None);
                    self.write_points(line.points());
                }
            }
            Geometry::MultiPolygon(multi) => {
                self.write_count(multi.len());
                for poly in multi.polygons() {
                    self.write_header(WKB_POLYGON, None);
                    self.write_rings(poly.rings());
                }
            }
            Geometry::GeometryCollection(coll) => {
                self.write_count(coll.len());
                for child in coll.geometries() {
                    self.write_geometry(child, None);
                }
            }
        }
    }
}

struct WkbReader<'a> {
    buf: &'a [u8],
    pos: usize,
    default_srid: i32,
}

/// Per-geometry decoding state taken from its header
#[derive(Clone, Copy)]
struct Header {
    big_endian: bool,
    code: u32,
    dims: Dimensions,
    srid: i32,
}

impl<'a> WkbReader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::MalformedBinary(format!(
                "truncated input: {n} bytes needed at offset {}, {} left",
                self.pos,
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_u32(&mut self, big_endian: bool) -> Result<u32> {
        let b = self.take(size_of::<u32>())?;
        Ok(if big_endian {
            BigEndian::read_u32(b)
        } else {
            LittleEndian::read_u32(b)
        })
    }

    fn read_f64(&mut self, big_endian: bool) -> Result<f64> {
        let b = self.take(size_of::<f64>())?;
        Ok(if big_endian {
            BigEndian::read_f64(b)
        } else {
            LittleEndian::read_f64(b)
        })
    }

    /// Element count, rejected when the elements cannot fit in the rest of the buffer
    fn read_count(&mut self, big_endian: bool, min_elem_size: usize) -> Result<usize> {
        let count = self.read_u32(big_endian)? as usize;
        if count.saturating_mul(min_elem_size) > self.remaining() {
            return Err(Error::MalformedBinary(format!(
                "count {count} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn read_header(&mut self, inherited_srid: Option<i32>) -> Result<Header> {
        let big_endian = match self.take(1)?[0] {
            WKB_XDR => true,
            WKB_NDR => false,
            flag => {
                return Err(Error::MalformedBinary(format!(
                    "unknown byte order flag {flag}"
                )))
            }
        };
        let type_id = self.read_u32(big_endian)?;
        let code = type_id & !(Z_FLAG | M_FLAG | SRID_FLAG);
        if !(WKB_POINT..=WKB_GEOMETRYCOLLECTION).contains(&code) {
            return Err(Error::MalformedBinary(format!(
                "unknown geometry type {type_id:#010x}"
            )));
        }
        let dims = Dimensions::new(type_id & Z_FLAG != 0, type_id & M_FLAG != 0);
        let srid = if type_id & SRID_FLAG != 0 {
            self.read_u32(big_endian)? as i32
        } else {
            inherited_srid.unwrap_or(self.default_srid)
        };
        Ok(Header {
            big_endian,
            code,
            dims,
            srid,
        })
    }

    fn read_coord(&mut self, h: &Header) -> Result<Point> {
        let be = h.big_endian;
        let x = self.read_f64(be)?;
        let y = self.read_f64(be)?;
        let z = if h.dims.z { self.read_f64(be)? } else { 0.0 };
        let m = if h.dims.m { self.read_f64(be)? } else { 0.0 };
        Ok(match (h.dims.z, h.dims.m) {
            (false, false) => Point::from_x_y(x, y, h.srid),
            (true, false) => Point::from_x_y_z(x, y, z, h.srid),
            (false, true) => Point::from_x_y_m(x, y, m, h.srid),
            (true, true) => Point::from_x_y_z_m(x, y, z, m, h.srid),
        })
    }

    fn read_points(&mut self, h: &Header) -> Result<Vec<Point>> {
        let count = self.read_count(h.big_endian, h.dims.ordinates() * size_of::<f64>())?;
        (0..count).map(|_| self.read_coord(h)).collect()
    }

    fn read_rings(&mut self, h: &Header) -> Result<Vec<LinearRing>> {
        let count = self.read_count(h.big_endian, size_of::<u32>())?;
        (0..count)
            .map(|_| Ok(LineString::from_points(self.read_points(h)?, h.srid, h.dims)))
            .collect()
    }

    /// Elements of a multi geometry or collection, each with its own header
    fn read_children(
        &mut self,
        h: &Header,
        expected: Option<u32>,
        depth: usize,
    ) -> Result<Vec<Geometry>> {
        if depth >= MAX_NESTING {
            return Err(Error::MalformedBinary(format!(
                "geometry nested deeper than {MAX_NESTING} levels"
            )));
        }
        let count = self.read_count(h.big_endian, HEADER_MIN_SIZE)?;
        let mut children = Vec::with_capacity(count);
        for _ in 0..count {
            let child = self.read_geometry(Some(h.srid), depth + 1)?;
            if let Some(code) = expected {
                if base_type_code(&child) != code {
                    return Err(Error::MalformedBinary(format!(
                        "unexpected element type {} in type {}",
                        base_type_code(&child),
                        h.code
                    )));
                }
            }
            children.push(child);
        }
        Ok(children)
    }

    fn read_geometry(&mut self, inherited_srid: Option<i32>, depth: usize) -> Result<Geometry> {
        let h = self.read_header(inherited_srid)?;
        let geom = match h.code {
            WKB_POINT => Geometry::Point(self.read_coord(&h)?),
            WKB_LINESTRING => {
                LineString::from_points(self.read_points(&h)?, h.srid, h.dims).into()
            }
            WKB_POLYGON => Polygon::from_linear_rings(self.read_rings(&h)?, h.srid, h.dims).into(),
            WKB_MULTIPOINT => {
                let points = self
                    .read_children(&h, Some(WKB_POINT), depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::Point(p) => Some(p),
                        _ => None,
                    })
                    .collect();
                MultiPoint::from_points(points, h.srid, h.dims).into()
            }
            WKB_MULTILINESTRING => {
                let lines = self
                    .read_children(&h, Some(WKB_LINESTRING), depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::LineString(l) => Some(l),
                        _ => None,
                    })
                    .collect();
                MultiLineString::from_line_strings(lines, h.srid, h.dims).into()
            }
            WKB_MULTIPOLYGON => {
                let polygons = self
                    .read_children(&h, Some(WKB_POLYGON), depth)?
                    .into_iter()
                    .filter_map(|g| match g {
                        Geometry::Polygon(p) => Some(p),
                        _ => None,
                    })
                    .collect();
                MultiPolygon::from_polygons(polygons, h.srid, h.dims).into()
            }
            _ => {
                let children = self.read_children(&h, None, depth)?;
                GeometryCollection::from_geometries(children, h.srid, h.dims).into()
            }
        };
        Ok(geom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_hex() {
        let point: Geometry = Point::from_x_y(12.4, 45.3, 123).into();
        assert_eq!(
            point.as_hex_ewkb(),
            "01010000207B000000CDCCCCCCCCCC28406666666666A64640"
        );
        assert_eq!(point.as_hex_wkb(), "0101000000CDCCCCCCCCCC28406666666666A64640");
    }

    #[test]
    fn point_zm_hex() {
        let point: Geometry = Point::from_x_y_z_m(12.4, 45.3, -3.5, 15.0, 123).into();
        assert_eq!(
            point.as_hex_ewkb(),
            "01010000E07B000000CDCCCCCCCCCC28406666666666A646400000000000000CC00000000000002E40"
        );
        // Plain WKB drops Z, M and the SRID
        assert_eq!(point.as_hex_wkb(), "0101000000CDCCCCCCCCCC28406666666666A64640");
    }

    #[test]
    fn suppress_ordinates() {
        let point: Geometry = Point::from_x_y_z_m(12.4, 45.3, -3.5, 15.0, 123).into();
        let opts = EwkbOptions {
            srid: false,
            z: true,
            m: false,
        };
        assert_eq!(
            hex::encode_upper(point.as_ewkb_with(&opts)),
            "0101000080CDCCCCCCCCCC28406666666666A646400000000000000CC0"
        );
    }

    #[test]
    fn linestring_hex() -> Result<()> {
        let line: Geometry =
            LineString::from_coordinates(&[[10.0, -20.0], [0.0, -0.5]], 4326).into();
        let hex = "0102000020E610000002000000000000000000244000000000000034C00000000000000000000000000000E0BF";
        assert_eq!(line.as_hex_ewkb(), hex);
        assert_eq!(decode_hex_ewkb(hex)?, line);
        assert_eq!(decode_hex_ewkb(&hex.to_lowercase())?.srid(), 4326);
        Ok(())
    }

    #[test]
    fn big_endian_input() -> Result<()> {
        let geom = decode_hex_wkb("00000000014024000000000000C034000000000000")?;
        assert_eq!(geom, Point::from_x_y(10.0, -20.0, DEFAULT_SRID).into());
        assert_eq!(geom.srid(), DEFAULT_SRID);
        Ok(())
    }

    #[test]
    fn default_srid_is_configurable() -> Result<()> {
        let bytes = Geometry::from(Point::from_x_y(1.0, 2.0, 4326)).as_wkb();
        assert_eq!(decode_ewkb_with_srid(&bytes, 31467)?.srid(), 31467);
        Ok(())
    }

    #[test]
    fn polygon_layout() -> Result<()> {
        let poly: Geometry = Polygon::from_coordinates(
            &[
                vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                vec![[1.0, 1.0], [1.0, 2.0], [2.0, 2.0], [1.0, 1.0]],
            ],
            256,
        )
        .into();
        let bytes = poly.as_ewkb();
        // header + srid + ring count + (count + 5 points) + (count + 4 points)
        assert_eq!(bytes.len(), 1 + 4 + 4 + 4 + (4 + 5 * 16) + (4 + 4 * 16));
        assert_eq!(LittleEndian::read_u32(&bytes[9..13]), 2);
        assert_eq!(LittleEndian::read_u32(&bytes[13..17]), 5);
        assert_eq!(decode_ewkb(&bytes)?, poly);
        Ok(())
    }

    #[test]
    fn collection_children_have_headers() -> Result<()> {
        let coll: Geometry = GeometryCollection::from_geometries(
            vec![
                Point::from_x_y(4.67, 45.4, 4326).into(),
                LineString::from_coordinates(&[[5.7, 12.45], [67.55, 54.0]], 4326).into(),
            ],
            4326,
            Dimensions::XY,
        )
        .into();
        let bytes = coll.as_ewkb();
        assert_eq!(
            hex::encode_upper(&bytes[..18]),
            "0107000020E6100000020000000101000000"
        );
        let decoded = decode_ewkb(&bytes)?;
        assert_eq!(decoded, coll);
        if let Geometry::GeometryCollection(c) = &decoded {
            assert_eq!(c.geometries()[1].srid(), 4326);
        }
        Ok(())
    }

    #[test]
    fn roundtrip_dimensions() -> Result<()> {
        let pts = |dims| {
            vec![
                Point::from_x_y_z_m(1.0, 2.0, 3.0, 4.0, 123).normalized(123, dims),
                Point::from_x_y_z_m(-1.0, -2.0, -3.0, -4.0, 123).normalized(123, dims),
            ]
        };
        for dims in [
            Dimensions::XY,
            Dimensions::XYZ,
            Dimensions::XYM,
            Dimensions::XYZM,
        ] {
            let geoms: Vec<Geometry> = vec![
                pts(dims)[0].into(),
                LineString::from_points(pts(dims), 123, dims).into(),
                MultiPoint::from_points(pts(dims), 123, dims).into(),
                MultiPolygon::from_polygons(
                    vec![Polygon::from_linear_rings(
                        vec![LineString::from_points(pts(dims), 123, dims)],
                        123,
                        dims,
                    )],
                    123,
                    dims,
                )
                .into(),
            ];
            for geom in geoms {
                let decoded = decode_ewkb(&geom.as_ewkb())?;
                assert_eq!(decoded, geom);
                assert_eq!(decoded.dims(), dims);
                assert_eq!(decoded.srid(), 123);
            }
        }
        Ok(())
    }

    #[test]
    fn truncated_input_fails() {
        let bytes = Geometry::from(MultiLineString::from_coordinates(
            &[vec![[1.0, 2.0], [3.0, 4.0]], vec![[5.0, 6.0]]],
            4326,
        ))
        .as_ewkb();
        for len in 0..bytes.len() {
            assert!(
                matches!(decode_ewkb(&bytes[..len]), Err(Error::MalformedBinary(_))),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            decode_hex_wkb("0201000000"),
            Err(Error::MalformedBinary(_))
        ));
        assert!(matches!(
            decode_hex_wkb("0108000000"),
            Err(Error::MalformedBinary(_))
        ));
        // Count far beyond the buffer
        assert!(matches!(
            decode_hex_wkb("0102000000FFFFFFFF"),
            Err(Error::MalformedBinary(_))
        ));
        // Multipoint holding a line string
        assert!(matches!(
            decode_hex_wkb("01040000000100000001020000000000000000"),
            Err(Error::MalformedBinary(_))
        ));
        assert!(matches!(
            decode_hex_wkb("0102000000010000000000000000000000"),
            Err(Error::MalformedBinary(_))
        ));
    }

    fn nested_collections(depth: usize) -> Vec<u8> {
        let mut bytes = [1, 7, 0, 0, 0, 1, 0, 0, 0].repeat(depth);
        let point = hex::decode("0101000000000000000000F03F0000000000000040").unwrap();
        bytes.extend_from_slice(&point);
        bytes
    }

    #[test]
    fn nesting_limit() -> Result<()> {
        let geom = decode_wkb(&nested_collections(50))?;
        let expected = format!(
            "{}POINT(1 2){}",
            "GEOMETRYCOLLECTION(".repeat(50),
            ")".repeat(50)
        );
        assert_eq!(geom.as_wkt(), expected);
        assert!(matches!(
            decode_wkb(&nested_collections(10000)),
            Err(Error::MalformedBinary(_))
        ));
        Ok(())
    }
}

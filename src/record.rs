//! Shape records: geometry content codec and feature access.

use crate::dbf::{FieldValue, Row};
use crate::envelope::Bounds;
use crate::error::{Error, Result};
use crate::geometry::*;
use crate::shape_type::ShapeType;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use geozero::{
    ColumnValue, CoordDimensions, FeatureAccess, FeatureProperties, GeomProcessor,
    GeozeroGeometry, PropertyProcessor,
};
use std::mem::size_of;

/// One shapefile feature: geometry plus attribute row.
#[derive(Clone, Debug, PartialEq)]
pub struct ShpRecord {
    /// 0-based ordinal in the file, 0 for records not yet stored
    pub index: usize,
    /// `None` for null shapes
    pub geometry: Option<Geometry>,
    pub data: Row,
}

impl ShpRecord {
    pub fn new<G: Into<Geometry>>(geometry: G, data: Row) -> ShpRecord {
        ShpRecord {
            index: 0,
            geometry: Some(geometry.into()),
            data,
        }
    }

    /// Record without geometry
    pub fn null(data: Row) -> ShpRecord {
        ShpRecord {
            index: 0,
            geometry: None,
            data,
        }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn data(&self) -> &Row {
        &self.data
    }
}

/// Shape code a geometry is stored under, `-1` when it has none
fn shape_code_of(geom: &Geometry) -> i32 {
    match geom {
        Geometry::Point(_) => ShapeType::Point.code(),
        Geometry::MultiPoint(_) => ShapeType::MultiPoint.code(),
        Geometry::LineString(_) | Geometry::MultiLineString(_) => ShapeType::PolyLine.code(),
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => ShapeType::Polygon.code(),
        Geometry::GeometryCollection(_) => -1,
    }
}

/// Whether the content of a record carries the M block
fn writes_m(shape_type: ShapeType, geom: &Geometry) -> bool {
    shape_type.has_m() || (shape_type.has_z() && geom.has_m())
}

/// Points of a record grouped in parts
fn parts_of(geom: &Geometry) -> Vec<&[Point]> {
    match geom {
        Geometry::Point(p) => vec![std::slice::from_ref(p)],
        Geometry::MultiPoint(multi) => vec![multi.points()],
        Geometry::LineString(line) => vec![line.points()],
        Geometry::MultiLineString(multi) => {
            multi.line_strings().iter().map(|l| l.points()).collect()
        }
        Geometry::Polygon(poly) => poly.rings().iter().map(|r| r.points()).collect(),
        Geometry::MultiPolygon(multi) => multi
            .polygons()
            .iter()
            .flat_map(|p| p.rings())
            .map(|r| r.points())
            .collect(),
        Geometry::GeometryCollection(_) => Vec::new(),
    }
}

/// Record content for a file of type `shape_type`, without record header
pub(crate) fn encode_content(geom: Option<&Geometry>, shape_type: ShapeType) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let geom = match geom {
        Some(geom) => geom,
        None => {
            out.write_i32::<LittleEndian>(ShapeType::Null.code())?;
            return Ok(out);
        }
    };
    if shape_type == ShapeType::Null || shape_code_of(geom) != shape_type.base().code() {
        return Err(Error::UnsupportedShapeType {
            expected: shape_type,
            found: shape_code_of(geom),
        });
    }
    let with_m = writes_m(shape_type, geom);
    out.write_i32::<LittleEndian>(shape_type.code())?;

    if let Geometry::Point(p) = geom {
        out.write_f64::<LittleEndian>(p.x())?;
        out.write_f64::<LittleEndian>(p.y())?;
        if shape_type.has_z() {
            out.write_f64::<LittleEndian>(p.z())?;
        }
        if with_m {
            out.write_f64::<LittleEndian>(p.m())?;
        }
        return Ok(out);
    }

    let parts = parts_of(geom);
    let points: Vec<&Point> = parts.iter().flat_map(|part| part.iter()).collect();
    let bounds = geom.bounds().or_zero();
    out.write_f64::<LittleEndian>(bounds.min_x)?;
    out.write_f64::<LittleEndian>(bounds.min_y)?;
    out.write_f64::<LittleEndian>(bounds.max_x)?;
    out.write_f64::<LittleEndian>(bounds.max_y)?;
    if shape_type.has_parts() {
        out.write_i32::<LittleEndian>(parts.len() as i32)?;
    }
    out.write_i32::<LittleEndian>(points.len() as i32)?;
    if shape_type.has_parts() {
        let mut start = 0;
        for part in &parts {
            out.write_i32::<LittleEndian>(start as i32)?;
            start += part.len();
        }
    }
    for p in &points {
        out.write_f64::<LittleEndian>(p.x())?;
        out.write_f64::<LittleEndian>(p.y())?;
    }
    if shape_type.has_z() {
        out.write_f64::<LittleEndian>(bounds.min_z)?;
        out.write_f64::<LittleEndian>(bounds.max_z)?;
        for p in &points {
            out.write_f64::<LittleEndian>(p.z())?;
        }
    }
    if with_m {
        out.write_f64::<LittleEndian>(bounds.min_m)?;
        out.write_f64::<LittleEndian>(bounds.max_m)?;
        for p in &points {
            out.write_f64::<LittleEndian>(p.m())?;
        }
    }
    Ok(out)
}

fn truncated(_: std::io::Error) -> Error {
    Error::MalformedBinary("truncated shape record".to_string())
}

fn read_i32(buf: &mut &[u8]) -> Result<i32> {
    buf.read_i32::<LittleEndian>().map_err(truncated)
}

fn read_f64(buf: &mut &[u8]) -> Result<f64> {
    buf.read_f64::<LittleEndian>().map_err(truncated)
}

fn read_count(buf: &mut &[u8], elem_size: usize) -> Result<usize> {
    let count = read_i32(buf)?;
    if count < 0 || (count as usize).saturating_mul(elem_size) > buf.len() {
        return Err(Error::MalformedBinary(format!(
            "count {count} exceeds record content"
        )));
    }
    Ok(count as usize)
}

/// Decode record content of a file with type `file_type`
pub(crate) fn decode_content(content: &[u8], file_type: ShapeType) -> Result<Option<Geometry>> {
    let mut buf = content;
    let code = read_i32(&mut buf)?;
    let shape_type = ShapeType::from_code(code)?;
    if shape_type == ShapeType::Null {
        return Ok(None);
    }
    if shape_type.base() != file_type.base() {
        return Err(Error::UnsupportedShapeType {
            expected: file_type,
            found: code,
        });
    }
    let srid = DEFAULT_SRID;

    if shape_type.base() == ShapeType::Point {
        let x = read_f64(&mut buf)?;
        let y = read_f64(&mut buf)?;
        let z = if shape_type.has_z() {
            Some(read_f64(&mut buf)?)
        } else {
            None
        };
        let m = if shape_type.has_m() || (shape_type.has_z() && buf.len() >= size_of::<f64>()) {
            Some(read_f64(&mut buf)?)
        } else {
            None
        };
        let point = match (z, m) {
            (None, None) => Point::from_x_y(x, y, srid),
            (Some(z), None) => Point::from_x_y_z(x, y, z, srid),
            (None, Some(m)) => Point::from_x_y_m(x, y, m, srid),
            (Some(z), Some(m)) => Point::from_x_y_z_m(x, y, z, m, srid),
        };
        return Ok(Some(point.into()));
    }

    // Skip the record bbox, recomputed from the points
    for _ in 0..4 {
        read_f64(&mut buf)?;
    }
    let num_parts = if shape_type.has_parts() {
        read_count(&mut buf, size_of::<i32>())?
    } else {
        1
    };
    let num_points = read_count(&mut buf, 0)?;
    let mut part_starts = Vec::with_capacity(num_parts);
    if shape_type.has_parts() {
        for _ in 0..num_parts {
            let start = read_i32(&mut buf)?;
            let valid = start >= 0
                && (start as usize) <= num_points
                && part_starts.last().map_or(true, |&prev| prev <= start as usize);
            if !valid {
                return Err(Error::MalformedBinary(format!(
                    "invalid part index {start}"
                )));
            }
            part_starts.push(start as usize);
        }
    } else {
        part_starts.push(0);
    }
    if num_points.saturating_mul(2 * size_of::<f64>()) > buf.len() {
        return Err(Error::MalformedBinary(format!(
            "{num_points} points exceed record content"
        )));
    }
    let mut xy = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        xy.push((read_f64(&mut buf)?, read_f64(&mut buf)?));
    }
    let block_len = (2 + num_points) * size_of::<f64>();
    let mut zs = None;
    if shape_type.has_z() {
        zs = Some(read_measure_block(&mut buf, num_points)?);
    }
    let mut ms = None;
    if shape_type.has_m() || (shape_type.has_z() && buf.len() >= block_len) {
        ms = Some(read_measure_block(&mut buf, num_points)?);
    }
    let dims = Dimensions::new(zs.is_some(), ms.is_some());
    let points: Vec<Point> = xy
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            let z = zs.as_ref().map_or(0.0, |zs| zs[i]);
            let m = ms.as_ref().map_or(0.0, |ms| ms[i]);
            Point::from_x_y_z_m(x, y, z, m, srid).normalized(srid, dims)
        })
        .collect();

    let geom = match shape_type.base() {
        ShapeType::MultiPoint => MultiPoint::from_points(points, srid, dims).into(),
        base => {
            let mut lines = Vec::with_capacity(num_parts);
            for (i, &start) in part_starts.iter().enumerate() {
                let end = part_starts.get(i + 1).copied().unwrap_or(num_points);
                lines.push(LineString::from_points(
                    points[start..end].to_vec(),
                    srid,
                    dims,
                ));
            }
            if base == ShapeType::Polygon {
                let polygon = Polygon::from_linear_rings(lines, srid, dims);
                MultiPolygon::from_polygons(vec![polygon], srid, dims).into()
            } else {
                MultiLineString::from_line_strings(lines, srid, dims).into()
            }
        }
    };
    Ok(Some(geom))
}

/// Range followed by one value per point
fn read_measure_block(buf: &mut &[u8], num_points: usize) -> Result<Vec<f64>> {
    read_f64(buf)?;
    read_f64(buf)?;
    (0..num_points).map(|_| read_f64(buf)).collect()
}

/// Extent of a set of records' geometries
pub(crate) fn bounds_of<'a, I: IntoIterator<Item = &'a Geometry>>(geometries: I) -> Bounds {
    let mut bounds = Bounds::create();
    for geom in geometries {
        bounds.expand(&geom.bounds());
    }
    bounds
}

impl GeozeroGeometry for ShpRecord {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> geozero::error::Result<()> {
        match &self.geometry {
            Some(geom) => geom.process_geom(processor),
            None => Ok(()),
        }
    }
    fn dims(&self) -> CoordDimensions {
        self.geometry
            .as_ref()
            .map_or_else(CoordDimensions::xy, |g| GeozeroGeometry::dims(g))
    }
    fn srid(&self) -> Option<i32> {
        self.geometry.as_ref().map(|g| g.srid())
    }
}

impl FeatureProperties for ShpRecord {
    /// Process attributes in field name order, skipping nulls.
    fn process_properties<P: PropertyProcessor>(
        &self,
        processor: &mut P,
    ) -> geozero::error::Result<bool> {
        let mut names: Vec<&String> = self.data.keys().collect();
        names.sort();
        let mut idx = 0;
        for name in names {
            let finish = match &self.data[name] {
                FieldValue::Null => continue,
                FieldValue::Character(s) => processor.property(idx, name, &ColumnValue::String(s))?,
                FieldValue::Integer(i) => processor.property(idx, name, &ColumnValue::Long(*i))?,
                FieldValue::Float(f) => processor.property(idx, name, &ColumnValue::Double(*f))?,
                FieldValue::Logical(b) => processor.property(idx, name, &ColumnValue::Bool(*b))?,
                FieldValue::Date(d) => {
                    let text = d.format("%Y-%m-%d").to_string();
                    processor.property(idx, name, &ColumnValue::DateTime(&text))?
                }
            };
            if finish {
                return Ok(true);
            }
            idx += 1;
        }
        Ok(false)
    }
}

impl FeatureAccess for ShpRecord {}

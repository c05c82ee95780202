//! Bridge between the geometry model and geozero processors.
//!
//! `Geometry` emits geozero events, so it can be written by any geozero
//! writer. `GeometryBuilder` consumes them and rebuilds a `Geometry`.

use crate::geometry::*;
use geozero::error::{GeozeroError, Result};
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry};

fn process_coord<P: GeomProcessor>(p: &Point, idx: usize, processor: &mut P) -> Result<()> {
    if processor.multi_dim() {
        processor.coordinate(
            p.x(),
            p.y(),
            p.has_z().then_some(p.z()),
            p.has_m().then_some(p.m()),
            None,
            None,
            idx,
        )
    } else {
        processor.xy(p.x(), p.y(), idx)
    }
}

fn process_linestring<P: GeomProcessor>(
    line: &LineString,
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> Result<()> {
    processor.linestring_begin(tagged, line.len(), idx)?;
    for (i, p) in line.points().iter().enumerate() {
        process_coord(p, i, processor)?;
    }
    processor.linestring_end(tagged, idx)
}

fn process_polygon<P: GeomProcessor>(
    poly: &Polygon,
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> Result<()> {
    processor.polygon_begin(tagged, poly.len(), idx)?;
    for (i, ring) in poly.rings().iter().enumerate() {
        process_linestring(ring, false, i, processor)?;
    }
    processor.polygon_end(tagged, idx)
}

pub(crate) fn process_geometry<P: GeomProcessor>(
    geom: &Geometry,
    idx: usize,
    processor: &mut P,
) -> Result<()> {
    match geom {
        Geometry::Point(p) => {
            processor.point_begin(idx)?;
            process_coord(p, 0, processor)?;
            processor.point_end(idx)
        }
        Geometry::LineString(line) => process_linestring(line, true, idx, processor),
        Geometry::Polygon(poly) => process_polygon(poly, true, idx, processor),
        Geometry::MultiPoint(multi) => {
            processor.multipoint_begin(multi.len(), idx)?;
            for (i, p) in multi.points().iter().enumerate() {
                process_coord(p, i, processor)?;
            }
            processor.multipoint_end(idx)
        }
        Geometry::MultiLineString(multi) => {
            processor.multilinestring_begin(multi.len(), idx)?;
            for (i, line) in multi.line_strings().iter().enumerate() {
                process_linestring(line, false, i, processor)?;
            }
            processor.multilinestring_end(idx)
        }
        Geometry::MultiPolygon(multi) => {
            processor.multipolygon_begin(multi.len(), idx)?;
            for (i, poly) in multi.polygons().iter().enumerate() {
                process_polygon(poly, false, i, processor)?;
            }
            processor.multipolygon_end(idx)
        }
        Geometry::GeometryCollection(coll) => {
            processor.geometrycollection_begin(coll.len(), idx)?;
            for (i, child) in coll.geometries().iter().enumerate() {
                process_geometry(child, i, processor)?;
            }
            processor.geometrycollection_end(idx)
        }
    }
}

impl GeozeroGeometry for Geometry {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> Result<()> {
        processor.srid(Some(Geometry::srid(self)))?;
        process_geometry(self, 0, processor)
    }
    fn dims(&self) -> CoordDimensions {
        CoordDimensions {
            z: self.has_z(),
            m: self.has_m(),
            t: false,
            tm: false,
        }
    }
    fn srid(&self) -> Option<i32> {
        Some(Geometry::srid(self))
    }
}

impl Geometry {
    /// Build a geometry from any geozero source, e.g. `geozero::geojson::GeoJson`
    pub fn from_geozero<G: GeozeroGeometry>(source: &G) -> Result<Geometry> {
        let mut builder = GeometryBuilder::new();
        source.process_geom(&mut builder)?;
        builder.finish()
    }
}

/// Partially built composite
enum Frame {
    Point(Option<Point>),
    LineString(Vec<Point>),
    Polygon(Vec<LineString>),
    MultiPoint(Vec<Point>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
    GeometryCollection(Vec<Geometry>),
}

/// geozero processor assembling one `Geometry` from processing events.
///
/// Dimensions follow the first coordinate received. The SRID is the one
/// announced by the source, else the builder's default.
pub struct GeometryBuilder {
    srid: i32,
    dims: Option<Dimensions>,
    stack: Vec<Frame>,
    result: Option<Geometry>,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        GeometryBuilder::with_srid(DEFAULT_SRID)
    }
}

impl GeometryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder assigning `srid` unless the source announces its own
    pub fn with_srid(srid: i32) -> Self {
        GeometryBuilder {
            srid,
            dims: None,
            stack: Vec::new(),
            result: None,
        }
    }

    /// The completed geometry
    pub fn finish(self) -> Result<Geometry> {
        if !self.stack.is_empty() {
            return Err(GeozeroError::Geometry("Unterminated geometry".to_string()));
        }
        let geom = self
            .result
            .ok_or_else(|| GeozeroError::Geometry("No geometry processed".to_string()))?;
        Ok(geom.normalized(self.srid, self.dims.unwrap_or_default()))
    }

    fn push_point(&mut self, point: Point) -> Result<()> {
        self.dims.get_or_insert(point.dims());
        match self.stack.last_mut() {
            Some(Frame::Point(slot @ None)) => *slot = Some(point),
            Some(Frame::LineString(points)) | Some(Frame::MultiPoint(points)) => {
                points.push(point)
            }
            _ => return Err(GeozeroError::Geometry("Unexpected coordinate".to_string())),
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Frame> {
        self.stack
            .pop()
            .ok_or_else(|| GeozeroError::Geometry("Unbalanced geometry end".to_string()))
    }

    /// Hand a completed geometry to the enclosing collection, or keep it as result
    fn complete(&mut self, geom: Geometry) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::GeometryCollection(children)) => children.push(geom),
            None if self.result.is_none() => self.result = Some(geom),
            _ => return Err(GeozeroError::Geometry("Unexpected geometry".to_string())),
        }
        Ok(())
    }

    fn line(&self, points: Vec<Point>) -> LineString {
        LineString::from_points(points, self.srid, self.dims.unwrap_or_default())
    }

    fn polygon(&self, rings: Vec<LineString>) -> Polygon {
        Polygon::from_linear_rings(rings, self.srid, self.dims.unwrap_or_default())
    }
}

fn unbalanced() -> GeozeroError {
    GeozeroError::Geometry("Unbalanced geometry end".to_string())
}

impl GeomProcessor for GeometryBuilder {
    fn dimensions(&self) -> CoordDimensions {
        CoordDimensions::xyzm()
    }
    fn srid(&mut self, srid: Option<i32>) -> Result<()> {
        if let Some(srid) = srid {
            self.srid = srid;
        }
        Ok(())
    }
    fn xy(&mut self, x: f64, y: f64, _idx: usize) -> Result<()> {
        self.push_point(Point::from_x_y(x, y, self.srid))
    }
    fn coordinate(
        &mut self,
        x: f64,
        y: f64,
        z: Option<f64>,
        m: Option<f64>,
        _t: Option<f64>,
        _tm: Option<u64>,
        _idx: usize,
    ) -> Result<()> {
        let point = match (z, m) {
            (None, None) => Point::from_x_y(x, y, self.srid),
            (Some(z), None) => Point::from_x_y_z(x, y, z, self.srid),
            (None, Some(m)) => Point::from_x_y_m(x, y, m, self.srid),
            (Some(z), Some(m)) => Point::from_x_y_z_m(x, y, z, m, self.srid),
        };
        self.push_point(point)
    }
    fn empty_point(&mut self, _idx: usize) -> Result<()> {
        Err(GeozeroError::Geometry(
            "Empty points are not supported".to_string(),
        ))
    }
    fn point_begin(&mut self, _idx: usize) -> Result<()> {
        self.stack.push(Frame::Point(None));
        Ok(())
    }
    fn point_end(&mut self, _idx: usize) -> Result<()> {
        match self.pop()? {
            Frame::Point(Some(p)) => self.complete(p.into()),
            Frame::Point(None) => Err(GeozeroError::Geometry(
                "Point without coordinate".to_string(),
            )),
            _ => Err(unbalanced()),
        }
    }
    fn multipoint_begin(&mut self, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::MultiPoint(Vec::new()));
        Ok(())
    }
    fn multipoint_end(&mut self, _idx: usize) -> Result<()> {
        match self.pop()? {
            Frame::MultiPoint(points) => {
                let multi =
                    MultiPoint::from_points(points, self.srid, self.dims.unwrap_or_default());
                self.complete(multi.into())
            }
            _ => Err(unbalanced()),
        }
    }
    fn linestring_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::LineString(Vec::new()));
        Ok(())
    }
    fn linestring_end(&mut self, _tagged: bool, _idx: usize) -> Result<()> {
        let line = match self.pop()? {
            Frame::LineString(points) => self.line(points),
            _ => return Err(unbalanced()),
        };
        // Rings and multilinestring parts go to their parent
        match self.stack.last_mut() {
            Some(Frame::Polygon(rings)) => rings.push(line),
            Some(Frame::MultiLineString(lines)) => lines.push(line),
            _ => self.complete(line.into())?,
        }
        Ok(())
    }
    fn multilinestring_begin(&mut self, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::MultiLineString(Vec::new()));
        Ok(())
    }
    fn multilinestring_end(&mut self, _idx: usize) -> Result<()> {
        match self.pop()? {
            Frame::MultiLineString(lines) => {
                let multi = MultiLineString::from_line_strings(
                    lines,
                    self.srid,
                    self.dims.unwrap_or_default(),
                );
                self.complete(multi.into())
            }
            _ => Err(unbalanced()),
        }
    }
    fn polygon_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::Polygon(Vec::new()));
        Ok(())
    }
    fn polygon_end(&mut self, _tagged: bool, _idx: usize) -> Result<()> {
        let poly = match self.pop()? {
            Frame::Polygon(rings) => self.polygon(rings),
            _ => return Err(unbalanced()),
        };
        match self.stack.last_mut() {
            Some(Frame::MultiPolygon(polygons)) => polygons.push(poly),
            _ => self.complete(poly.into())?,
        }
        Ok(())
    }
    fn multipolygon_begin(&mut self, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::MultiPolygon(Vec::new()));
        Ok(())
    }
    fn multipolygon_end(&mut self, _idx: usize) -> Result<()> {
        match self.pop()? {
            Frame::MultiPolygon(polygons) => {
                let multi =
                    MultiPolygon::from_polygons(polygons, self.srid, self.dims.unwrap_or_default());
                self.complete(multi.into())
            }
            _ => Err(unbalanced()),
        }
    }
    fn geometrycollection_begin(&mut self, _size: usize, _idx: usize) -> Result<()> {
        self.stack.push(Frame::GeometryCollection(Vec::new()));
        Ok(())
    }
    fn geometrycollection_end(&mut self, _idx: usize) -> Result<()> {
        match self.pop()? {
            Frame::GeometryCollection(children) => {
                let coll = GeometryCollection::from_geometries(
                    children,
                    self.srid,
                    self.dims.unwrap_or_default(),
                );
                self.complete(coll.into())
            }
            _ => Err(unbalanced()),
        }
    }
}

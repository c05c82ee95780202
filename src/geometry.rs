//! Simple feature geometry model.
//!
//! Geometries are value trees: composites own their children exclusively and
//! every child carries the SRID and dimensions of its parent. Factories
//! normalise children on construction so that invariant always holds.

use crate::envelope::{Bounds, Envelope};
use crate::error::{Error, Result};
use crate::sexagesimal;
use std::f64::consts::PI;

/// Spatial reference identifier used when none is given (WGS 84)
pub const DEFAULT_SRID: i32 = 4326;

/// Deepest collection nesting the decoders accept
pub(crate) const MAX_NESTING: usize = 128;

const DEG2RAD: f64 = PI / 180.0;

/// Optional ordinates carried by a geometry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// height
    pub z: bool,
    /// measurement
    pub m: bool,
}

impl Dimensions {
    pub const XY: Dimensions = Dimensions { z: false, m: false };
    pub const XYZ: Dimensions = Dimensions { z: true, m: false };
    pub const XYM: Dimensions = Dimensions { z: false, m: true };
    pub const XYZM: Dimensions = Dimensions { z: true, m: true };

    pub fn new(z: bool, m: bool) -> Dimensions {
        Dimensions { z, m }
    }

    /// Number of ordinates per coordinate
    pub fn ordinates(&self) -> usize {
        2 + self.z as usize + self.m as usize
    }

    /// Drop the ordinates the caller does not allow
    pub fn restrict(&self, allow_z: bool, allow_m: bool) -> Dimensions {
        Dimensions {
            z: self.z && allow_z,
            m: self.m && allow_m,
        }
    }
}

/// A single position. Equality compares `x`, `y`, `z` and `m` only.
#[derive(Clone, Copy, Debug)]
pub struct Point {
    x: f64,
    y: f64,
    z: f64,
    m: f64,
    srid: i32,
    dims: Dimensions,
}

impl Point {
    pub fn from_x_y(x: f64, y: f64, srid: i32) -> Point {
        Point {
            x,
            y,
            z: 0.0,
            m: 0.0,
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn from_x_y_z(x: f64, y: f64, z: f64, srid: i32) -> Point {
        Point {
            z,
            dims: Dimensions::XYZ,
            ..Point::from_x_y(x, y, srid)
        }
    }

    pub fn from_x_y_m(x: f64, y: f64, m: f64, srid: i32) -> Point {
        Point {
            m,
            dims: Dimensions::XYM,
            ..Point::from_x_y(x, y, srid)
        }
    }

    pub fn from_x_y_z_m(x: f64, y: f64, z: f64, m: f64, srid: i32) -> Point {
        Point {
            x,
            y,
            z,
            m,
            srid,
            dims: Dimensions::XYZM,
        }
    }

    /// Build a point from `[x, y]`, `[x, y, z]`, `[x, y, m]` or `[x, y, z, m]`
    /// according to `dims`.
    pub fn from_coordinates(coords: &[f64], srid: i32, dims: Dimensions) -> Result<Point> {
        if coords.len() != dims.ordinates() {
            return Err(Error::DimensionMismatch {
                expected: dims.ordinates(),
                found: coords.len(),
            });
        }
        let point = match (dims.z, dims.m) {
            (false, false) => Point::from_x_y(coords[0], coords[1], srid),
            (true, false) => Point::from_x_y_z(coords[0], coords[1], coords[2], srid),
            (false, true) => Point::from_x_y_m(coords[0], coords[1], coords[2], srid),
            (true, true) => {
                Point::from_x_y_z_m(coords[0], coords[1], coords[2], coords[3], srid)
            }
        };
        Ok(point)
    }

    /// Point from polar coordinates, `theta` in degrees
    pub fn from_r_t(r: f64, theta: f64, srid: i32) -> Point {
        let t = theta * DEG2RAD;
        Point::from_x_y(r * t.cos(), r * t.sin(), srid)
    }

    /// Point from sexagesimal text such as `20° 47' 26.37 W` or ``47`20 06.09E``.
    ///
    /// The first value becomes `x`. A leading `-` or a `W`/`S` marker negates it.
    pub fn from_latlong(lat: &str, lon: &str, srid: i32) -> Result<Point> {
        Ok(Point::from_x_y(
            sexagesimal::parse_degrees(lat)?,
            sexagesimal::parse_degrees(lon)?,
            srid,
        ))
    }

    pub fn x(&self) -> f64 {
        self.x
    }
    pub fn y(&self) -> f64 {
        self.y
    }
    /// Elevation, 0.0 unless the point has Z
    pub fn z(&self) -> f64 {
        self.z
    }
    /// Measure, 0.0 unless the point has M
    pub fn m(&self) -> f64 {
        self.m
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }
    pub fn has_z(&self) -> bool {
        self.dims.z
    }
    pub fn has_m(&self) -> bool {
        self.dims.m
    }

    /// All present ordinates in x, y, z, m order
    pub fn to_coordinates(&self) -> Vec<f64> {
        let mut coords = vec![self.x, self.y];
        if self.dims.z {
            coords.push(self.z);
        }
        if self.dims.m {
            coords.push(self.m);
        }
        coords
    }

    pub fn bounding_box(&self) -> Envelope {
        let corner = if self.dims.z {
            Point::from_x_y_z(self.x, self.y, self.z, self.srid)
        } else {
            Point::from_x_y(self.x, self.y, self.srid)
        };
        Envelope::from_points(corner, corner)
    }

    pub fn m_range(&self) -> (f64, f64) {
        (self.m, self.m)
    }

    /// Adopt a parent's SRID and dimensions, zeroing dropped ordinates
    pub(crate) fn normalized(self, srid: i32, dims: Dimensions) -> Point {
        Point {
            x: self.x,
            y: self.y,
            z: if dims.z { self.z } else { 0.0 },
            m: if dims.m { self.m } else { 0.0 },
            srid,
            dims,
        }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z && self.m == other.m
    }
}

/// Ordered sequence of points, duplicates allowed
#[derive(Clone, Debug)]
pub struct LineString {
    points: Vec<Point>,
    srid: i32,
    dims: Dimensions,
}

/// A closed line string used as polygon boundary. Closure is a convention of
/// use and is not checked on construction.
pub type LinearRing = LineString;

impl LineString {
    pub fn from_points(points: Vec<Point>, srid: i32, dims: Dimensions) -> LineString {
        LineString {
            points: points
                .into_iter()
                .map(|p| p.normalized(srid, dims))
                .collect(),
            srid,
            dims,
        }
    }

    pub fn from_coordinates(coords: &[[f64; 2]], srid: i32) -> LineString {
        LineString {
            points: coords
                .iter()
                .map(|&[x, y]| Point::from_x_y(x, y, srid))
                .collect(),
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// First point equals last point
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }

    pub(crate) fn normalized(self, srid: i32, dims: Dimensions) -> LineString {
        LineString::from_points(self.points, srid, dims)
    }
}

impl PartialEq for LineString {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

/// Exterior ring followed by zero or more holes
#[derive(Clone, Debug)]
pub struct Polygon {
    rings: Vec<LinearRing>,
    srid: i32,
    dims: Dimensions,
}

impl Polygon {
    pub fn from_linear_rings(rings: Vec<LinearRing>, srid: i32, dims: Dimensions) -> Polygon {
        Polygon {
            rings: rings
                .into_iter()
                .map(|r| r.normalized(srid, dims))
                .collect(),
            srid,
            dims,
        }
    }

    pub fn from_coordinates(rings: &[Vec<[f64; 2]>], srid: i32) -> Polygon {
        Polygon {
            rings: rings
                .iter()
                .map(|coords| LineString::from_coordinates(coords, srid))
                .collect(),
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn rings(&self) -> &[LinearRing] {
        &self.rings
    }
    pub fn exterior_ring(&self) -> Option<&LinearRing> {
        self.rings.first()
    }
    pub fn interior_rings(&self) -> &[LinearRing] {
        self.rings.get(1..).unwrap_or(&[])
    }
    pub fn len(&self) -> usize {
        self.rings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub(crate) fn normalized(self, srid: i32, dims: Dimensions) -> Polygon {
        Polygon::from_linear_rings(self.rings, srid, dims)
    }
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.rings == other.rings
    }
}

#[derive(Clone, Debug)]
pub struct MultiPoint {
    points: Vec<Point>,
    srid: i32,
    dims: Dimensions,
}

impl MultiPoint {
    pub fn from_points(points: Vec<Point>, srid: i32, dims: Dimensions) -> MultiPoint {
        let LineString { points, .. } = LineString::from_points(points, srid, dims);
        MultiPoint { points, srid, dims }
    }

    pub fn from_coordinates(coords: &[[f64; 2]], srid: i32) -> MultiPoint {
        let LineString { points, .. } = LineString::from_coordinates(coords, srid);
        MultiPoint {
            points,
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }
}

impl PartialEq for MultiPoint {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

#[derive(Clone, Debug)]
pub struct MultiLineString {
    line_strings: Vec<LineString>,
    srid: i32,
    dims: Dimensions,
}

impl MultiLineString {
    pub fn from_line_strings(
        line_strings: Vec<LineString>,
        srid: i32,
        dims: Dimensions,
    ) -> MultiLineString {
        MultiLineString {
            line_strings: line_strings
                .into_iter()
                .map(|l| l.normalized(srid, dims))
                .collect(),
            srid,
            dims,
        }
    }

    pub fn from_coordinates(lines: &[Vec<[f64; 2]>], srid: i32) -> MultiLineString {
        MultiLineString {
            line_strings: lines
                .iter()
                .map(|coords| LineString::from_coordinates(coords, srid))
                .collect(),
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn line_strings(&self) -> &[LineString] {
        &self.line_strings
    }
    pub fn len(&self) -> usize {
        self.line_strings.len()
    }
    pub fn is_empty(&self) -> bool {
        self.line_strings.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }
}

impl PartialEq for MultiLineString {
    fn eq(&self, other: &Self) -> bool {
        self.line_strings == other.line_strings
    }
}

#[derive(Clone, Debug)]
pub struct MultiPolygon {
    polygons: Vec<Polygon>,
    srid: i32,
    dims: Dimensions,
}

impl MultiPolygon {
    pub fn from_polygons(polygons: Vec<Polygon>, srid: i32, dims: Dimensions) -> MultiPolygon {
        MultiPolygon {
            polygons: polygons
                .into_iter()
                .map(|p| p.normalized(srid, dims))
                .collect(),
            srid,
            dims,
        }
    }

    pub fn from_coordinates(polygons: &[Vec<Vec<[f64; 2]>>], srid: i32) -> MultiPolygon {
        MultiPolygon {
            polygons: polygons
                .iter()
                .map(|rings| Polygon::from_coordinates(rings, srid))
                .collect(),
            srid,
            dims: Dimensions::XY,
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }
    pub fn len(&self) -> usize {
        self.polygons.len()
    }
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }
}

impl PartialEq for MultiPolygon {
    fn eq(&self, other: &Self) -> bool {
        self.polygons == other.polygons
    }
}

/// Heterogeneous collection, homogeneous in SRID and dimensions
#[derive(Clone, Debug)]
pub struct GeometryCollection {
    geometries: Vec<Geometry>,
    srid: i32,
    dims: Dimensions,
}

impl GeometryCollection {
    pub fn from_geometries(
        geometries: Vec<Geometry>,
        srid: i32,
        dims: Dimensions,
    ) -> GeometryCollection {
        GeometryCollection {
            geometries: geometries
                .into_iter()
                .map(|g| g.normalized(srid, dims))
                .collect(),
            srid,
            dims,
        }
    }

    pub fn geometries(&self) -> &[Geometry] {
        &self.geometries
    }
    pub fn len(&self) -> usize {
        self.geometries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
    pub fn srid(&self) -> i32 {
        self.srid
    }
    pub fn dims(&self) -> Dimensions {
        self.dims
    }
}

impl PartialEq for GeometryCollection {
    fn eq(&self, other: &Self) -> bool {
        self.geometries == other.geometries
    }
}

/// Closed set of simple feature variants
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
}

impl Geometry {
    pub fn srid(&self) -> i32 {
        match self {
            Geometry::Point(g) => g.srid,
            Geometry::LineString(g) => g.srid,
            Geometry::Polygon(g) => g.srid,
            Geometry::MultiPoint(g) => g.srid,
            Geometry::MultiLineString(g) => g.srid,
            Geometry::MultiPolygon(g) => g.srid,
            Geometry::GeometryCollection(g) => g.srid,
        }
    }

    pub fn dims(&self) -> Dimensions {
        match self {
            Geometry::Point(g) => g.dims,
            Geometry::LineString(g) => g.dims,
            Geometry::Polygon(g) => g.dims,
            Geometry::MultiPoint(g) => g.dims,
            Geometry::MultiLineString(g) => g.dims,
            Geometry::MultiPolygon(g) => g.dims,
            Geometry::GeometryCollection(g) => g.dims,
        }
    }

    pub fn has_z(&self) -> bool {
        self.dims().z
    }

    pub fn has_m(&self) -> bool {
        self.dims().m
    }

    /// True for composites without any element. A point is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::LineString(g) => g.is_empty(),
            Geometry::Polygon(g) => g.is_empty(),
            Geometry::MultiPoint(g) => g.is_empty(),
            Geometry::MultiLineString(g) => g.is_empty(),
            Geometry::MultiPolygon(g) => g.is_empty(),
            Geometry::GeometryCollection(g) => g.is_empty(),
        }
    }

    /// Same geometry under another spatial reference, applied to every descendant
    pub fn with_srid(self, srid: i32) -> Geometry {
        let dims = self.dims();
        self.normalized(srid, dims)
    }

    pub(crate) fn normalized(self, srid: i32, dims: Dimensions) -> Geometry {
        match self {
            Geometry::Point(g) => Geometry::Point(g.normalized(srid, dims)),
            Geometry::LineString(g) => Geometry::LineString(g.normalized(srid, dims)),
            Geometry::Polygon(g) => Geometry::Polygon(g.normalized(srid, dims)),
            Geometry::MultiPoint(g) => {
                Geometry::MultiPoint(MultiPoint::from_points(g.points, srid, dims))
            }
            Geometry::MultiLineString(g) => Geometry::MultiLineString(
                MultiLineString::from_line_strings(g.line_strings, srid, dims),
            ),
            Geometry::MultiPolygon(g) => {
                Geometry::MultiPolygon(MultiPolygon::from_polygons(g.polygons, srid, dims))
            }
            Geometry::GeometryCollection(g) => Geometry::GeometryCollection(
                GeometryCollection::from_geometries(g.geometries, srid, dims),
            ),
        }
    }

    /// Visit every point of the tree in encoding order
    pub(crate) fn for_each_point<F: FnMut(&Point)>(&self, f: &mut F) {
        match self {
            Geometry::Point(p) => f(p),
            Geometry::LineString(g) => g.points.iter().for_each(f),
            Geometry::Polygon(g) => g.rings.iter().flat_map(|r| &r.points).for_each(f),
            Geometry::MultiPoint(g) => g.points.iter().for_each(f),
            Geometry::MultiLineString(g) => {
                g.line_strings.iter().flat_map(|l| &l.points).for_each(f)
            }
            Geometry::MultiPolygon(g) => g
                .polygons
                .iter()
                .flat_map(|p| &p.rings)
                .flat_map(|r| &r.points)
                .for_each(f),
            Geometry::GeometryCollection(g) => {
                for geom in &g.geometries {
                    geom.for_each_point(f);
                }
            }
        }
    }

    pub(crate) fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::create();
        self.for_each_point(&mut |p| bounds.expand_point(p));
        bounds
    }

    /// Component-wise min/max over all points, `None` for empty geometries
    pub fn bounding_box(&self) -> Option<Envelope> {
        self.bounds().to_envelope(self.srid(), self.has_z())
    }

    /// Measure extent, `None` without M or without points
    pub fn m_range(&self) -> Option<(f64, f64)> {
        if !self.has_m() {
            return None;
        }
        self.bounds().m_range()
    }
}

impl From<Point> for Geometry {
    fn from(value: Point) -> Self {
        Geometry::Point(value)
    }
}

impl From<LineString> for Geometry {
    fn from(value: LineString) -> Self {
        Geometry::LineString(value)
    }
}

impl From<Polygon> for Geometry {
    fn from(value: Polygon) -> Self {
        Geometry::Polygon(value)
    }
}

impl From<MultiPoint> for Geometry {
    fn from(value: MultiPoint) -> Self {
        Geometry::MultiPoint(value)
    }
}

impl From<MultiLineString> for Geometry {
    fn from(value: MultiLineString) -> Self {
        Geometry::MultiLineString(value)
    }
}

impl From<MultiPolygon> for Geometry {
    fn from(value: MultiPolygon) -> Self {
        Geometry::MultiPolygon(value)
    }
}

impl From<GeometryCollection> for Geometry {
    fn from(value: GeometryCollection) -> Self {
        Geometry::GeometryCollection(value)
    }
}

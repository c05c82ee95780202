//! Axis-aligned bounding boxes.

use crate::geometry::{Dimensions, Point};

/// Bounding box stored as its min and max corner points.
///
/// Envelopes are always derived from geometries, never shared with them.
#[derive(Clone, Copy, Debug)]
pub struct Envelope {
    lower_corner: Point,
    upper_corner: Point,
}

impl Envelope {
    pub fn from_points(lower_corner: Point, upper_corner: Point) -> Envelope {
        Envelope {
            lower_corner,
            upper_corner,
        }
    }

    pub fn lower_corner(&self) -> &Point {
        &self.lower_corner
    }

    pub fn upper_corner(&self) -> &Point {
        &self.upper_corner
    }

    pub fn srid(&self) -> i32 {
        self.lower_corner.srid()
    }

    pub fn dims(&self) -> Dimensions {
        self.lower_corner.dims()
    }

    pub fn width(&self) -> f64 {
        self.upper_corner.x() - self.lower_corner.x()
    }

    pub fn height(&self) -> f64 {
        self.upper_corner.y() - self.lower_corner.y()
    }

    /// Middle of the box, keeping Z when the corners carry it
    pub fn center(&self) -> Point {
        let (lo, hi) = (&self.lower_corner, &self.upper_corner);
        let x = (lo.x() + hi.x()) / 2.0;
        let y = (lo.y() + hi.y()) / 2.0;
        if lo.has_z() {
            Point::from_x_y_z(x, y, (lo.z() + hi.z()) / 2.0, lo.srid())
        } else {
            Point::from_x_y(x, y, lo.srid())
        }
    }

    /// Grow this envelope to also cover `other`
    pub fn extend(&mut self, other: &Envelope) {
        let mut bounds = Bounds::create();
        bounds.expand_point(&self.lower_corner);
        bounds.expand_point(&self.upper_corner);
        bounds.expand_point(&other.lower_corner);
        bounds.expand_point(&other.upper_corner);
        if let Some(env) = bounds.to_envelope(self.srid(), self.dims().z) {
            *self = env;
        }
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.lower_corner == other.lower_corner && self.upper_corner == other.upper_corner
    }
}

/// Running min/max over x, y, z and m.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub min_m: f64,
    pub max_m: f64,
}

impl Bounds {
    pub fn create() -> Bounds {
        Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            min_z: f64::INFINITY,
            max_z: f64::NEG_INFINITY,
            min_m: f64::INFINITY,
            max_m: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    pub fn expand_xy(&mut self, x: f64, y: f64) {
        if x < self.min_x {
            self.min_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }

    pub fn expand_point(&mut self, p: &Point) {
        self.expand_xy(p.x(), p.y());
        if p.has_z() {
            self.min_z = self.min_z.min(p.z());
            self.max_z = self.max_z.max(p.z());
        }
        if p.has_m() {
            self.min_m = self.min_m.min(p.m());
            self.max_m = self.max_m.max(p.m());
        }
    }

    pub fn expand(&mut self, r: &Bounds) {
        self.expand_xy(r.min_x, r.min_y);
        self.expand_xy(r.max_x, r.max_y);
        self.min_z = self.min_z.min(r.min_z);
        self.max_z = self.max_z.max(r.max_z);
        self.min_m = self.min_m.min(r.min_m);
        self.max_m = self.max_m.max(r.max_m);
    }

    pub fn has_z(&self) -> bool {
        self.min_z <= self.max_z
    }

    pub fn has_m(&self) -> bool {
        self.min_m <= self.max_m
    }

    pub fn to_envelope(&self, srid: i32, with_z: bool) -> Option<Envelope> {
        if self.is_empty() {
            return None;
        }
        let env = if with_z && self.has_z() {
            Envelope::from_points(
                Point::from_x_y_z(self.min_x, self.min_y, self.min_z, srid),
                Point::from_x_y_z(self.max_x, self.max_y, self.max_z, srid),
            )
        } else {
            Envelope::from_points(
                Point::from_x_y(self.min_x, self.min_y, srid),
                Point::from_x_y(self.max_x, self.max_y, srid),
            )
        };
        Some(env)
    }

    /// Measure extent, if any point carried M
    pub fn m_range(&self) -> Option<(f64, f64)> {
        self.has_m().then_some((self.min_m, self.max_m))
    }

    /// Replace the empty sentinels with zeros, as written in shapefile headers
    pub fn or_zero(&self) -> Bounds {
        let fix = |lo: f64, hi: f64| if lo <= hi { (lo, hi) } else { (0.0, 0.0) };
        let (min_x, max_x) = fix(self.min_x, self.max_x);
        let (min_y, max_y) = fix(self.min_y, self.max_y);
        let (min_z, max_z) = fix(self.min_z, self.max_z);
        let (min_m, max_m) = fix(self.min_m, self.max_m);
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
            min_z,
            max_z,
            min_m,
            max_m,
        }
    }
}

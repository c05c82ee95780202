use crate::error::{Error, Result};
use crate::geometry::Dimensions;

/// Shape type codes of the `.shp` header and record content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Null = 0,
    Point = 1,
    PolyLine = 3,
    Polygon = 5,
    MultiPoint = 8,
    PointZ = 11,
    PolyLineZ = 13,
    PolygonZ = 15,
    MultiPointZ = 18,
    PointM = 21,
    PolyLineM = 23,
    PolygonM = 25,
    MultiPointM = 28,
}

impl ShapeType {
    pub fn from_code(code: i32) -> Result<ShapeType> {
        use ShapeType::*;
        let shape_type = match code {
            0 => Null,
            1 => Point,
            3 => PolyLine,
            5 => Polygon,
            8 => MultiPoint,
            11 => PointZ,
            13 => PolyLineZ,
            15 => PolygonZ,
            18 => MultiPointZ,
            21 => PointM,
            23 => PolyLineM,
            25 => PolygonM,
            28 => MultiPointM,
            _ => return Err(Error::UnknownShapeType(code)),
        };
        Ok(shape_type)
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// The 2D family member, e.g. `Polygon` for `PolygonZ`
    pub fn base(&self) -> ShapeType {
        use ShapeType::*;
        match self {
            Null => Null,
            Point | PointZ | PointM => Point,
            PolyLine | PolyLineZ | PolyLineM => PolyLine,
            Polygon | PolygonZ | PolygonM => Polygon,
            MultiPoint | MultiPointZ | MultiPointM => MultiPoint,
        }
    }

    pub fn has_z(&self) -> bool {
        use ShapeType::*;
        matches!(self, PointZ | PolyLineZ | PolygonZ | MultiPointZ)
    }

    /// M-only types. Z types may carry M as well, see `ShpRecord`.
    pub fn has_m(&self) -> bool {
        use ShapeType::*;
        matches!(self, PointM | PolyLineM | PolygonM | MultiPointM)
    }

    /// Line and polygon records carry a part index
    pub fn has_parts(&self) -> bool {
        matches!(self.base(), ShapeType::PolyLine | ShapeType::Polygon)
    }

    /// Dimensions always written for this type
    pub fn dims(&self) -> Dimensions {
        Dimensions::new(self.has_z(), self.has_m())
    }
}

//! WKT and EWKT codec.
//!
//! Output is compact: no space after keywords or commas, ordinates separated
//! by a single space and numbers in their shortest round-trip form. XYM
//! geometries use the `M` keyword suffix, every other dimension is implied by
//! the ordinate count. EWKT prefixes the text with `SRID=<n>;`.
//!
//! The reader is lenient about whitespace, keyword case and dimension
//! suffixes (`POINTZ`, `POINT Z`, `POINT ZM`, ...).

use crate::error::{Error, Result};
use crate::geometry::*;
use std::fmt;

/// What the encoder emits beyond x/y.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WktOptions {
    /// Write the `SRID=<n>;` prefix
    pub srid: bool,
    /// Allow Z ordinates
    pub z: bool,
    /// Allow M ordinates
    pub m: bool,
}

impl Default for WktOptions {
    fn default() -> Self {
        WktOptions {
            srid: true,
            z: true,
            m: true,
        }
    }
}

/// EWKT with SRID prefix, Z and M
pub fn encode_ewkt(geom: &Geometry) -> String {
    encode_with(geom, &WktOptions::default())
}

/// WKT keeping Z and M but without SRID
pub fn encode_wkt(geom: &Geometry) -> String {
    encode_with(
        geom,
        &WktOptions {
            srid: false,
            ..Default::default()
        },
    )
}

pub fn encode_with(geom: &Geometry, opts: &WktOptions) -> String {
    let mut writer = WktWriter {
        out: String::new(),
        dims: geom.dims().restrict(opts.z, opts.m),
    };
    if opts.srid {
        writer.out.push_str(&format!("SRID={};", geom.srid()));
    }
    writer.write_geometry(geom);
    writer.out
}

pub fn decode_ewkt(text: &str) -> Result<Geometry> {
    decode_ewkt_with_srid(text, DEFAULT_SRID)
}

/// Decode, assigning `default_srid` when the text has no SRID prefix
pub fn decode_ewkt_with_srid(text: &str, default_srid: i32) -> Result<Geometry> {
    let mut parser = WktParser {
        tokens: tokenize(text)?,
        pos: 0,
        explicit_dims: None,
        arity: None,
        depth: 0,
    };
    let srid = parser.srid_prefix()?.unwrap_or(default_srid);
    let raw = parser.geometry()?;
    if let Some(token) = parser.peek() {
        return Err(malformed(format!("unexpected {token} after geometry")));
    }
    let dims = parser.dims()?;
    build(raw, srid, dims)
}

/// WKT is a subset of EWKT and decodes the same way
pub fn decode_wkt(text: &str) -> Result<Geometry> {
    decode_ewkt(text)
}

pub fn decode_wkt_with_srid(text: &str, default_srid: i32) -> Result<Geometry> {
    decode_ewkt_with_srid(text, default_srid)
}

impl Geometry {
    pub fn as_ewkt(&self) -> String {
        encode_ewkt(self)
    }
    pub fn as_wkt(&self) -> String {
        encode_wkt(self)
    }
    pub fn as_wkt_with(&self, opts: &WktOptions) -> String {
        encode_with(self, opts)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_wkt(self))
    }
}

fn malformed(msg: String) -> Error {
    Error::MalformedText(msg)
}

fn keyword(geom: &Geometry) -> &'static str {
    match geom {
        Geometry::Point(_) => "POINT",
        Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

struct WktWriter {
    out: String,
    dims: Dimensions,
}

impl WktWriter {
    fn write_coord(&mut self, p: &Point) {
        self.out.push_str(&format!("{} {}", p.x(), p.y()));
        if self.dims.z {
            self.out.push_str(&format!(" {}", p.z()));
        }
        if self.dims.m {
            self.out.push_str(&format!(" {}", p.m()));
        }
    }

    /// Parenthesised comma separated list, `EMPTY` when there is nothing to list
    fn write_list<T>(&mut self, items: &[T], mut item: impl FnMut(&mut Self, &T)) {
        if items.is_empty() {
            self.out.push_str("EMPTY");
            return;
        }
        self.out.push('(');
        for (i, it) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            item(self, it);
        }
        self.out.push(')');
    }

    fn write_points(&mut self, points: &[Point]) {
        self.write_list(points, Self::write_coord);
    }

    fn write_rings(&mut self, rings: &[LinearRing]) {
        self.write_list(rings, |w, ring| w.write_points(ring.points()));
    }

    fn write_geometry(&mut self, geom: &Geometry) {
        self.out.push_str(keyword(geom));
        if self.dims.m && !self.dims.z {
            self.out.push('M');
        }
        if geom.is_empty() {
            self.out.push(' ');
        }
        match geom {
            Geometry::Point(p) => {
                self.out.push('(');
                self.write_coord(p);
                self.out.push(')');
            }
            Geometry::LineString(line) => self.write_points(line.points()),
            Geometry::Polygon(poly) => self.write_rings(poly.rings()),
            Geometry::MultiPoint(multi) => self.write_list(multi.points(), |w, p| {
                w.out.push('(');
                w.write_coord(p);
                w.out.push(')');
            }),
            Geometry::MultiLineString(multi) => {
                self.write_list(multi.line_strings(), |w, line| w.write_points(line.points()))
            }
            Geometry::MultiPolygon(multi) => {
                self.write_list(multi.polygons(), |w, poly| w.write_rings(poly.rings()))
            }
            Geometry::GeometryCollection(coll) => {
                self.write_list(coll.geometries(), Self::write_geometry)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Equals,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "`{w}`"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Comma => f.write_str("`,`"),
            Token::Semicolon => f.write_str("`;`"),
            Token::Equals => f.write_str("`=`"),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | ',' | ';' | '=' => {
                chars.next();
                tokens.push(match c {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ',' => Token::Comma,
                    ';' => Token::Semicolon,
                    _ => Token::Equals,
                });
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Word(text[start..end].to_ascii_uppercase()));
            }
            c if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')) {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let number = &text[start..end];
                let value = number
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("invalid number `{number}`")))?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(malformed(format!(
                    "unexpected character `{other}` at offset {start}"
                )))
            }
        }
    }
    Ok(tokens)
}

type Coord = Vec<f64>;

/// Parsed tree before dimensions are known
enum Raw {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Raw>),
}

struct WktParser {
    tokens: Vec<Token>,
    pos: usize,
    /// First dimension suffix seen, outermost first
    explicit_dims: Option<Dimensions>,
    /// Ordinate count of the first coordinate
    arity: Option<usize>,
    depth: usize,
}

const KEYWORDS: [&str; 7] = [
    "GEOMETRYCOLLECTION",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "MULTIPOINT",
    "LINESTRING",
    "POLYGON",
    "POINT",
];

impl WktParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| malformed("unexpected end of input".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.next()?;
        if token != expected {
            return Err(malformed(format!("expected {expected}, found {token}")));
        }
        Ok(())
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn srid_prefix(&mut self) -> Result<Option<i32>> {
        if self.peek() != Some(&Token::Word("SRID".to_string())) {
            return Ok(None);
        }
        self.pos += 1;
        self.expect(Token::Equals)?;
        let srid = match self.next()? {
            Token::Number(n) if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 => n as i32,
            other => return Err(malformed(format!("invalid SRID {other}"))),
        };
        self.expect(Token::Semicolon)?;
        Ok(Some(srid))
    }

    fn set_dims(&mut self, dims: Dimensions) -> Result<()> {
        match self.explicit_dims {
            Some(seen) if seen != dims => Err(malformed(
                "conflicting dimension suffixes".to_string(),
            )),
            _ => {
                self.explicit_dims = Some(dims);
                Ok(())
            }
        }
    }

    fn suffix_dims(suffix: &str) -> Option<Dimensions> {
        match suffix {
            "Z" => Some(Dimensions::XYZ),
            "M" => Some(Dimensions::XYM),
            "ZM" => Some(Dimensions::XYZM),
            _ => None,
        }
    }

    /// Keyword with optional attached or separate dimension suffix
    fn keyword(&mut self) -> Result<&'static str> {
        let word = match self.next()? {
            Token::Word(w) => w,
            other => return Err(malformed(format!("expected geometry keyword, found {other}"))),
        };
        let (keyword, suffix) = KEYWORDS
            .iter()
            .find_map(|k| word.strip_prefix(k).map(|rest| (*k, rest)))
            .ok_or_else(|| malformed(format!("unknown geometry type `{word}`")))?;
        if !suffix.is_empty() {
            let dims = Self::suffix_dims(suffix)
                .ok_or_else(|| malformed(format!("unknown geometry type `{word}`")))?;
            self.set_dims(dims)?;
        } else if let Some(Token::Word(next)) = self.peek() {
            if let Some(dims) = Self::suffix_dims(next) {
                self.pos += 1;
                self.set_dims(dims)?;
            }
        }
        Ok(keyword)
    }

    fn coord(&mut self) -> Result<Coord> {
        let mut coord = Vec::with_capacity(4);
        while let Some(Token::Number(n)) = self.peek() {
            coord.push(*n);
            self.pos += 1;
        }
        if coord.is_empty() {
            let found = self
                .peek()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "end of input".to_string());
            return Err(malformed(format!("expected coordinate, found {found}")));
        }
        match self.arity {
            None => self.arity = Some(coord.len()),
            Some(n) if n != coord.len() => {
                return Err(malformed(format!(
                    "mixed coordinate dimensions: {n} and {} ordinates",
                    coord.len()
                )))
            }
            _ => {}
        }
        Ok(coord)
    }

    /// `EMPTY`, `()` or a parenthesised comma separated list
    fn list<T, F: FnMut(&mut Self) -> Result<T>>(&mut self, mut item: F) -> Result<Vec<T>> {
        if self.consume(&Token::Word("EMPTY".to_string())) {
            return Ok(Vec::new());
        }
        self.expect(Token::LParen)?;
        let mut items = Vec::new();
        if self.consume(&Token::RParen) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            match self.next()? {
                Token::Comma => {}
                Token::RParen => return Ok(items),
                other => return Err(malformed(format!("expected `,` or `)`, found {other}"))),
            }
        }
    }

    fn coords(&mut self) -> Result<Vec<Coord>> {
        self.list(Self::coord)
    }

    fn rings(&mut self) -> Result<Vec<Vec<Coord>>> {
        self.list(Self::coords)
    }

    /// Multipoint element with or without its own parentheses
    fn multipoint_item(&mut self) -> Result<Coord> {
        if self.consume(&Token::LParen) {
            let coord = self.coord()?;
            self.expect(Token::RParen)?;
            Ok(coord)
        } else {
            self.coord()
        }
    }

    fn geometry(&mut self) -> Result<Raw> {
        let raw = match self.keyword()? {
            "POINT" => {
                let mut coords = self.coords()?;
                if coords.len() != 1 {
                    return Err(malformed(format!(
                        "point needs exactly one coordinate, found {}",
                        coords.len()
                    )));
                }
                Raw::Point(coords.remove(0))
            }
            "LINESTRING" => Raw::LineString(self.coords()?),
            "POLYGON" => Raw::Polygon(self.rings()?),
            "MULTIPOINT" => Raw::MultiPoint(self.list(Self::multipoint_item)?),
            "MULTILINESTRING" => Raw::MultiLineString(self.rings()?),
            "MULTIPOLYGON" => Raw::MultiPolygon(self.list(Self::rings)?),
            _ => {
                if self.depth >= MAX_NESTING {
                    return Err(malformed(format!(
                        "geometry nested deeper than {MAX_NESTING} levels"
                    )));
                }
                self.depth += 1;
                let children = self.list(Self::geometry)?;
                self.depth -= 1;
                Raw::GeometryCollection(children)
            }
        };
        Ok(raw)
    }

    /// Dimensions from the suffix if any, else from the ordinate count
    fn dims(&self) -> Result<Dimensions> {
        match (self.explicit_dims, self.arity) {
            (Some(dims), Some(n)) if dims.ordinates() != n => Err(malformed(format!(
                "expected {} ordinates per coordinate, found {n}",
                dims.ordinates()
            ))),
            (Some(dims), _) => Ok(dims),
            (None, None) | (None, Some(2)) => Ok(Dimensions::XY),
            (None, Some(3)) => Ok(Dimensions::XYZ),
            (None, Some(4)) => Ok(Dimensions::XYZM),
            (None, Some(n)) => Err(malformed(format!("{n} ordinates per coordinate"))),
        }
    }
}

fn build_points(coords: &[Coord], srid: i32, dims: Dimensions) -> Result<Vec<Point>> {
    coords
        .iter()
        .map(|c| Point::from_coordinates(c, srid, dims))
        .collect()
}

fn build_line(coords: &[Coord], srid: i32, dims: Dimensions) -> Result<LineString> {
    Ok(LineString::from_points(build_points(coords, srid, dims)?, srid, dims))
}

fn build_polygon(rings: &[Vec<Coord>], srid: i32, dims: Dimensions) -> Result<Polygon> {
    let rings = rings
        .iter()
        .map(|r| build_line(r, srid, dims))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::from_linear_rings(rings, srid, dims))
}

fn build(raw: Raw, srid: i32, dims: Dimensions) -> Result<Geometry> {
    let geom = match raw {
        Raw::Point(c) => Point::from_coordinates(&c, srid, dims)?.into(),
        Raw::LineString(coords) => build_line(&coords, srid, dims)?.into(),
        Raw::Polygon(rings) => build_polygon(&rings, srid, dims)?.into(),
        Raw::MultiPoint(coords) => {
            MultiPoint::from_points(build_points(&coords, srid, dims)?, srid, dims).into()
        }
        Raw::MultiLineString(lines) => {
            let lines = lines
                .iter()
                .map(|l| build_line(l, srid, dims))
                .collect::<Result<Vec<_>>>()?;
            MultiLineString::from_line_strings(lines, srid, dims).into()
        }
        Raw::MultiPolygon(polygons) => {
            let polygons = polygons
                .iter()
                .map(|p| build_polygon(p, srid, dims))
                .collect::<Result<Vec<_>>>()?;
            MultiPolygon::from_polygons(polygons, srid, dims).into()
        }
        Raw::GeometryCollection(children) => {
            let children = children
                .into_iter()
                .map(|c| build(c, srid, dims))
                .collect::<Result<Vec<_>>>()?;
            GeometryCollection::from_geometries(children, srid, dims).into()
        }
    };
    Ok(geom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_text() {
        let point: Geometry = Point::from_x_y_z(12.4, 45.3, -3.5, 123).into();
        assert_eq!(point.as_wkt(), "POINT(12.4 45.3 -3.5)");
        assert_eq!(point.as_ewkt(), "SRID=123;POINT(12.4 45.3 -3.5)");
        assert_eq!(
            point.as_wkt_with(&WktOptions {
                srid: true,
                z: false,
                m: false
            }),
            "SRID=123;POINT(12.4 45.3)"
        );

        let point: Geometry = Point::from_x_y_m(12.4, 45.3, -3.5, 123).into();
        assert_eq!(point.as_ewkt(), "SRID=123;POINTM(12.4 45.3 -3.5)");

        let point: Geometry = Point::from_x_y_z_m(12.4, -45.3, 35.3, 45.1, 4326).into();
        assert_eq!(point.to_string(), "POINT(12.4 -45.3 35.3 45.1)");
    }

    #[test]
    fn composite_text() {
        let line: Geometry =
            LineString::from_coordinates(&[[12.4, -45.3], [45.4, 41.6]], 256).into();
        assert_eq!(line.as_ewkt(), "SRID=256;LINESTRING(12.4 -45.3,45.4 41.6)");

        let poly: Geometry = Polygon::from_coordinates(
            &[
                vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                vec![[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0], [1.0, 1.0]],
            ],
            256,
        )
        .into();
        assert_eq!(
            poly.as_wkt(),
            "POLYGON((0 0,4 0,4 4,0 4,0 0),(1 1,3 1,3 3,1 3,1 1))"
        );

        let multi: Geometry =
            MultiPoint::from_coordinates(&[[12.4, -123.3], [-65.1, 123.4]], 444).into();
        assert_eq!(multi.as_wkt(), "MULTIPOINT((12.4 -123.3),(-65.1 123.4))");

        let multi: Geometry = MultiPolygon::from_coordinates(
            &[
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]],
            ],
            4326,
        )
        .into();
        assert_eq!(
            multi.as_wkt(),
            "MULTIPOLYGON(((0 0,1 0,1 1,0 0)),((5 5,6 5,6 6,5 5)))"
        );
    }

    #[test]
    fn collection_with_measures() {
        let coll: Geometry = GeometryCollection::from_geometries(
            vec![
                Point::from_x_y_m(4.67, 45.4, 45.6, 256).into(),
                LineString::from_points(
                    vec![
                        Point::from_x_y_m(5.7, 12.45, 5.6, 256),
                        Point::from_x_y_m(67.55, 54.0, 6.7, 256),
                    ],
                    256,
                    Dimensions::XYM,
                )
                .into(),
            ],
            256,
            Dimensions::XYM,
        )
        .into();
        let text = "SRID=256;GEOMETRYCOLLECTIONM(POINTM(4.67 45.4 45.6),LINESTRINGM(5.7 12.45 5.6,67.55 54 6.7))";
        assert_eq!(coll.as_ewkt(), text);
        let decoded = decode_ewkt(text).unwrap();
        assert_eq!(decoded, coll);
        assert_eq!(decoded.dims(), Dimensions::XYM);
        assert_eq!(decoded.srid(), 256);
    }

    #[test]
    fn empty_geometries() -> Result<()> {
        let empty: Geometry = MultiPolygon::from_polygons(vec![], 4326, Dimensions::XY).into();
        assert_eq!(empty.as_wkt(), "MULTIPOLYGON EMPTY");
        let empty: Geometry =
            GeometryCollection::from_geometries(vec![], 4326, Dimensions::XY).into();
        assert_eq!(empty.as_wkt(), "GEOMETRYCOLLECTION EMPTY");
        assert!(decode_wkt("GEOMETRYCOLLECTION EMPTY")?.is_empty());
        assert!(decode_wkt("linestring ()")?.is_empty());
        Ok(())
    }

    #[test]
    fn decode_dimensions() -> Result<()> {
        assert_eq!(decode_wkt("POINT(1 2 3)")?.dims(), Dimensions::XYZ);
        assert_eq!(decode_wkt("POINT(1 2 3 4)")?.dims(), Dimensions::XYZM);
        assert_eq!(decode_wkt("POINT Z (1 2 3)")?.dims(), Dimensions::XYZ);
        assert_eq!(decode_wkt("pointzm(1 2 3 4)")?.dims(), Dimensions::XYZM);

        let geom = decode_wkt("POINT M (1 2 3)")?;
        assert_eq!(geom.dims(), Dimensions::XYM);
        assert_eq!(geom, Point::from_x_y_m(1.0, 2.0, 3.0, 0).into());
        Ok(())
    }

    #[test]
    fn decode_srid() -> Result<()> {
        assert_eq!(decode_ewkt("SRID=31467;POINT(1 2)")?.srid(), 31467);
        assert_eq!(decode_ewkt("POINT(1 2)")?.srid(), DEFAULT_SRID);
        assert_eq!(decode_wkt_with_srid("POINT(1 2)", 3857)?.srid(), 3857);
        assert_eq!(decode_ewkt_with_srid("SRID=-1;POINT(1 2)", 3857)?.srid(), -1);
        Ok(())
    }

    #[test]
    fn decode_lenient_forms() -> Result<()> {
        assert_eq!(
            decode_wkt("MULTIPOINT(1 2, 3 4)")?,
            decode_wkt("MULTIPOINT((1 2),(3 4))")?
        );
        let poly = decode_wkt("  polygon (( 0 0 , 1 0,1 1 , 0 0 ) ) ")?;
        assert_eq!(poly.as_wkt(), "POLYGON((0 0,1 0,1 1,0 0))");
        assert_eq!(decode_wkt("POINT(1e2 -2.5E-1)")?.as_wkt(), "POINT(100 -0.25)");
        Ok(())
    }

    #[test]
    fn decode_errors() {
        for text in [
            "LINESTRING(1 2, 3 4 5)",
            "POINT(1 2",
            "POINT(1 2) junk",
            "CIRCLE(1 2)",
            "POINTZ(1 2)",
            "POINT(1)",
            "POINT()",
            "POINT(1 2,3 4)",
            "SRID=abc;POINT(1 2)",
            "SRID=4326 POINT(1 2)",
            "POINT(1 2 3 4 5)",
            "POINT(1 -)",
            "",
            "GEOMETRYCOLLECTIONZ(POINTM(1 2 3))",
        ] {
            assert!(
                matches!(decode_wkt(text), Err(Error::MalformedText(_))),
                "{text} decoded"
            );
        }
    }

    #[test]
    fn roundtrip_nested() -> Result<()> {
        let text = "GEOMETRYCOLLECTION(POINT(4 6),LINESTRING(4 6,7 10),MULTIPOINT((1 1),(2 2)),GEOMETRYCOLLECTION(POLYGON((0 0,1 0,1 1,0 0))))";
        let geom = decode_wkt(text)?;
        assert_eq!(geom.as_wkt(), text);
        Ok(())
    }

    fn nested_collections(depth: usize) -> String {
        format!(
            "{}POINT(1 2){}",
            "GEOMETRYCOLLECTION(".repeat(depth),
            ")".repeat(depth)
        )
    }

    #[test]
    fn nesting_limit() -> Result<()> {
        let text = nested_collections(50);
        assert_eq!(decode_wkt(&text)?.as_wkt(), text);
        assert!(matches!(
            decode_wkt(&nested_collections(10000)),
            Err(Error::MalformedText(_))
        ));
        Ok(())
    }
}

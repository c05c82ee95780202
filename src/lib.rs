//! [Simple feature](https://www.ogc.org/standard/sfa/) geometries with lossless
//! conversion between WKB/EWKB and WKT/EWKT, and a reader/writer for the
//! [ESRI Shapefile](https://www.esri.com/content/dam/esrisites/sitecore-archive/Files/Pdfs/library/whitepapers/pdfs/shapefile.pdf)
//! trio (`.shp`, `.shx`, `.dbf`) with transactional record edits.
//!
//! # Codec example:
//!
//! ```
//! use simple_features::*;
//!
//! let point = Point::from_x_y(12.4, 45.3, 123);
//! let geom = Geometry::from(point);
//! assert_eq!(geom.as_hex_ewkb(), "01010000207B000000CDCCCCCCCCCC28406666666666A64640");
//! assert_eq!(geom.as_ewkt(), "SRID=123;POINT(12.4 45.3)");
//! assert_eq!(decode_ewkb(&geom.as_ewkb())?, geom);
//! # Ok::<(), simple_features::Error>(())
//! ```
//!
//! # Shapefile example:
//!
//! ```no_run
//! use simple_features::*;
//!
//! # fn edit() -> simple_features::Result<()> {
//! let mut shp = ShapeFile::open("cities.shp")?;
//! shp.transaction(|tr| {
//!     let mut row = Row::new();
//!     row.insert("name".to_string(), FieldValue::Character("Tokyo".to_string()));
//!     tr.add(ShpRecord::new(Point::from_x_y(139.69, 35.69, DEFAULT_SRID), row));
//!     tr.delete(0);
//!     Ok(())
//! })?;
//! println!("{} records", shp.record_count());
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

mod dbf;
mod envelope;
mod error;
mod file_reader;
mod file_transaction;
mod file_writer;
mod geometry;
mod geometry_processor;
mod header;
mod record;
mod sexagesimal;
mod shape_type;
pub mod wkb;
pub mod wkt;

pub use dbf::{AttributeStore, Dbf, FieldDef, FieldType, FieldValue, Row};
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use file_reader::{ShapeFile, ShpRecords};
pub use file_transaction::ShpTransaction;
pub use geometry::*;
pub use geometry_processor::GeometryBuilder;
pub use header::ShapeHeader;
pub use record::ShpRecord;
pub use shape_type::ShapeType;
pub use wkb::{
    decode_ewkb, decode_hex_ewkb, decode_hex_wkb, decode_wkb, encode_ewkb, encode_wkb,
    EwkbOptions,
};
pub use wkt::{decode_ewkt, decode_wkt, encode_ewkt, encode_wkt, WktOptions};

/// `.shp`/`.shx` file code, stored big-endian at offset 0
pub const FILE_CODE: i32 = 9994;
/// `.shp`/`.shx` format version, stored little-endian at offset 28
pub const SHP_VERSION: i32 = 1000;
/// Size of the `.shp`/`.shx` header in bytes
pub const HEADER_SIZE: usize = 100;

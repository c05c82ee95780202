//! The 100-byte header shared by `.shp` and `.shx`, and the `.shx` index.

use crate::envelope::{Bounds, Envelope};
use crate::error::{Error, Result};
use crate::geometry::{Point, DEFAULT_SRID};
use crate::shape_type::ShapeType;
use crate::{FILE_CODE, HEADER_SIZE, SHP_VERSION};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Size of one `.shx` entry
pub const INDEX_ENTRY_SIZE: usize = 8;

/// Shapefile header information
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeHeader {
    /// File length in bytes, header included
    pub file_length: usize,
    pub shape_type: ShapeType,
    pub(crate) bounds: Bounds,
}

impl ShapeHeader {
    pub(crate) fn new(shape_type: ShapeType, bounds: Bounds) -> ShapeHeader {
        ShapeHeader {
            file_length: HEADER_SIZE,
            shape_type,
            bounds,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<ShapeHeader> {
        let file_code = reader.read_i32::<BigEndian>()?;
        if file_code != FILE_CODE {
            return Err(Error::InvalidFileCode(file_code));
        }
        let mut unused = [0; 20];
        reader.read_exact(&mut unused)?;
        let file_length = reader.read_i32::<BigEndian>()?;
        let version = reader.read_i32::<LittleEndian>()?;
        if version != SHP_VERSION {
            debug!("Unexpected shapefile version {version}");
        }
        let shape_type = ShapeType::from_code(reader.read_i32::<LittleEndian>()?)?;
        let mut bounds = Bounds::create();
        bounds.min_x = reader.read_f64::<LittleEndian>()?;
        bounds.min_y = reader.read_f64::<LittleEndian>()?;
        bounds.max_x = reader.read_f64::<LittleEndian>()?;
        bounds.max_y = reader.read_f64::<LittleEndian>()?;
        bounds.min_z = reader.read_f64::<LittleEndian>()?;
        bounds.max_z = reader.read_f64::<LittleEndian>()?;
        bounds.min_m = reader.read_f64::<LittleEndian>()?;
        bounds.max_m = reader.read_f64::<LittleEndian>()?;
        Ok(ShapeHeader {
            file_length: file_length.max(0) as usize * 2,
            shape_type,
            bounds,
        })
    }

    /// Write the header with the given total file length in bytes
    pub fn write<W: Write>(&self, out: &mut W, file_length: usize) -> Result<()> {
        let bounds = self.bounds.or_zero();
        out.write_i32::<BigEndian>(FILE_CODE)?;
        out.write_all(&[0; 20])?;
        out.write_i32::<BigEndian>((file_length / 2) as i32)?;
        out.write_i32::<LittleEndian>(SHP_VERSION)?;
        out.write_i32::<LittleEndian>(self.shape_type.code())?;
        for v in [
            bounds.min_x,
            bounds.min_y,
            bounds.max_x,
            bounds.max_y,
            bounds.min_z,
            bounds.max_z,
            bounds.min_m,
            bounds.max_m,
        ] {
            out.write_f64::<LittleEndian>(v)?;
        }
        Ok(())
    }

    /// 2D extent `[min_x, min_y, max_x, max_y]`
    pub fn bbox(&self) -> [f64; 4] {
        [
            self.bounds.min_x,
            self.bounds.min_y,
            self.bounds.max_x,
            self.bounds.max_y,
        ]
    }

    pub fn z_range(&self) -> (f64, f64) {
        (self.bounds.min_z, self.bounds.max_z)
    }

    pub fn m_range(&self) -> (f64, f64) {
        (self.bounds.min_m, self.bounds.max_m)
    }

    /// Header extent as envelope, with Z for Z types
    pub fn bounding_box(&self) -> Envelope {
        let b = &self.bounds;
        if self.shape_type.has_z() {
            Envelope::from_points(
                Point::from_x_y_z(b.min_x, b.min_y, b.min_z, DEFAULT_SRID),
                Point::from_x_y_z(b.max_x, b.max_y, b.max_z, DEFAULT_SRID),
            )
        } else {
            Envelope::from_points(
                Point::from_x_y(b.min_x, b.min_y, DEFAULT_SRID),
                Point::from_x_y(b.max_x, b.max_y, DEFAULT_SRID),
            )
        }
    }
}

/// Position of one record in the `.shp`, in bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Offset of the record header
    pub offset: usize,
    /// Content length, record header excluded
    pub length: usize,
}

/// Read the `.shx` entries following its header
pub(crate) fn read_index<R: Read>(reader: &mut R, header: &ShapeHeader) -> Result<Vec<IndexEntry>> {
    let count = header.file_length.saturating_sub(HEADER_SIZE) / INDEX_ENTRY_SIZE;
    let mut entries = Vec::new();
    for _ in 0..count {
        let offset = reader.read_i32::<BigEndian>()?;
        let length = reader.read_i32::<BigEndian>()?;
        if offset < 0 || length < 0 {
            return Err(Error::IO(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid index entry ({offset}, {length})"),
            )));
        }
        entries.push(IndexEntry {
            offset: offset as usize * 2,
            length: length as usize * 2,
        });
    }
    Ok(entries)
}

pub(crate) fn write_index<W: Write>(out: &mut W, entries: &[IndexEntry]) -> Result<()> {
    for entry in entries {
        out.write_i32::<BigEndian>((entry.offset / 2) as i32)?;
        out.write_i32::<BigEndian>((entry.length / 2) as i32)?;
    }
    Ok(())
}

use crate::dbf::{Dbf, FieldDef};
use crate::envelope::Bounds;
use crate::error::Result;
use crate::file_reader::{FileRoot, ShapeFile, RECORD_HEADER_SIZE};
use crate::header::{write_index, IndexEntry, ShapeHeader, INDEX_ENTRY_SIZE};
use crate::record::{bounds_of, decode_content, encode_content, ShpRecord};
use crate::shape_type::ShapeType;
use crate::HEADER_SIZE;
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

impl ShapeFile {
    /// Create an empty shapefile and open it.
    ///
    /// # Usage example:
    ///
    /// ```
    /// use simple_features::*;
    ///
    /// # fn create_shp() -> Result<()> {
    /// let fields = vec![FieldDef::character("Name", 20), FieldDef::integer("Pop", 9)];
    /// let mut shp = ShapeFile::create("cities.shp", ShapeType::Point, fields)?;
    /// shp.transaction(|tr| {
    ///     let mut row = Row::new();
    ///     row.insert("Name".to_string(), "Bern".into());
    ///     tr.add(ShpRecord::new(Point::from_x_y(7.44, 46.95, DEFAULT_SRID), row));
    ///     Ok(())
    /// })?;
    /// assert_eq!(shp.record_count(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create<P: AsRef<Path>>(
        path: P,
        shape_type: ShapeType,
        fields: Vec<FieldDef>,
    ) -> Result<ShapeFile> {
        let root = FileRoot::new(path.as_ref());
        ShpWriter::new(shape_type, fields)?.write(&root)?;
        info!("Created {} ({shape_type:?})", root.path().display());
        ShapeFile::open(root.sibling("shp"))
    }
}

/// Shapefile writer.
///
/// Records are staged in a temporary file and assembled with header and
/// index in `write`.
pub(crate) struct ShpWriter {
    shape_type: ShapeType,
    fields: Vec<FieldDef>,
    tmpout: BufWriter<File>,
    /// `.shp` offset of the next record
    offset: usize,
    index: Vec<IndexEntry>,
    dbf_records: Vec<Vec<u8>>,
    bounds: Bounds,
}

impl ShpWriter {
    pub fn new(shape_type: ShapeType, fields: Vec<FieldDef>) -> Result<Self> {
        let tmpout = BufWriter::new(tempfile::tempfile()?);
        Ok(ShpWriter {
            shape_type,
            fields,
            tmpout,
            offset: HEADER_SIZE,
            index: Vec::new(),
            dbf_records: Vec::new(),
            bounds: Bounds::create(),
        })
    }

    /// Encode and stage a new record
    pub fn add_record(&mut self, record: &ShpRecord) -> Result<()> {
        let content = encode_content(record.geometry(), self.shape_type)?;
        let dbf_record = Dbf::encode_record(&self.fields, &record.data)?;
        if let Some(geom) = record.geometry() {
            self.bounds.expand(&geom.bounds());
        }
        self.push(&content, dbf_record)
    }

    /// Stage an existing record from its stored bytes
    pub fn add_raw(&mut self, content: &[u8], dbf_record: Vec<u8>) -> Result<()> {
        let geometry = decode_content(content, self.shape_type)?;
        self.bounds.expand(&bounds_of(geometry.iter()));
        self.push(content, dbf_record)
    }

    fn push(&mut self, content: &[u8], dbf_record: Vec<u8>) -> Result<()> {
        let number = self.index.len() + 1;
        self.tmpout.write_i32::<BigEndian>(number as i32)?;
        self.tmpout.write_i32::<BigEndian>((content.len() / 2) as i32)?;
        self.tmpout.write_all(content)?;
        self.index.push(IndexEntry {
            offset: self.offset,
            length: content.len(),
        });
        self.offset += RECORD_HEADER_SIZE + content.len();
        self.dbf_records.push(dbf_record);
        Ok(())
    }

    #[cfg(test)]
    fn record_count(&self) -> usize {
        self.index.len()
    }

    /// Write `.shp`, `.shx` and `.dbf` next to `root`.
    ///
    /// All three files are completely written to temporary files in the
    /// target directory before any of them replaces an existing file.
    pub fn write(mut self, root: &FileRoot) -> Result<()> {
        let dir = match root.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        let header = ShapeHeader::new(self.shape_type, self.bounds.clone());

        let mut shp = BufWriter::new(NamedTempFile::new_in(&dir)?);
        header.write(&mut shp, self.offset)?;
        self.tmpout.flush()?;
        let mut staged = self.tmpout.into_inner().map_err(|e| e.into_error())?;
        staged.seek(SeekFrom::Start(0))?;
        io::copy(&mut staged, &mut shp)?;
        let shp = shp.into_inner().map_err(|e| e.into_error())?;

        let mut shx = BufWriter::new(NamedTempFile::new_in(&dir)?);
        header.write(&mut shx, HEADER_SIZE + self.index.len() * INDEX_ENTRY_SIZE)?;
        write_index(&mut shx, &self.index)?;
        let shx = shx.into_inner().map_err(|e| e.into_error())?;

        let mut dbf = NamedTempFile::new_in(&dir)?;
        dbf.write_all(&Dbf::encode_table(&self.fields, &self.dbf_records)?)?;

        for (tmp, ext) in [(shp, "shp"), (shx, "shx"), (dbf, "dbf")] {
            tmp.as_file().sync_all()?;
            tmp.persist(root.sibling(ext))?;
        }
        debug!(
            "Wrote {} records to {}",
            self.index.len(),
            root.path().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::{FieldValue, Row};
    use crate::geometry::{Point, DEFAULT_SRID};

    #[test]
    fn write_point_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = FileRoot::new(&dir.path().join("points"));
        let mut writer = ShpWriter::new(ShapeType::Point, vec![FieldDef::integer("Hoyoyo", 4)])?;
        for (x, y, v) in [(-90.08375, 34.39996, 6), (-87.8258, 33.36416, 9)] {
            let mut row = Row::new();
            row.insert("Hoyoyo".to_string(), FieldValue::Integer(v));
            writer.add_record(&ShpRecord::new(Point::from_x_y(x, y, DEFAULT_SRID), row))?;
        }
        assert_eq!(writer.record_count(), 2);
        writer.write(&root)?;

        let shp = std::fs::read(root.sibling("shp"))?;
        assert_eq!(shp.len(), 100 + 2 * (8 + 20));
        // Second record header: number 2, 10 words of content
        assert_eq!(&shp[128..136], &[0, 0, 0, 2, 0, 0, 0, 10]);
        let shx = std::fs::read(root.sibling("shx"))?;
        assert_eq!(shx.len(), 116);
        assert_eq!(&shx[100..108], &[0, 0, 0, 50, 0, 0, 0, 10]);
        assert_eq!(&shx[108..116], &[0, 0, 0, 64, 0, 0, 0, 10]);

        let shp = ShapeFile::open(root.path())?;
        assert_eq!(shp.header().bbox(), [-90.08375, 33.36416, -87.8258, 34.39996]);
        Ok(())
    }

    #[test]
    fn mismatched_record_is_rejected() -> Result<()> {
        let mut writer = ShpWriter::new(ShapeType::Polygon, Vec::new())?;
        let record = ShpRecord::new(Point::from_x_y(1.0, 2.0, DEFAULT_SRID), Row::new());
        assert!(writer.add_record(&record).is_err());
        assert_eq!(writer.record_count(), 0);
        Ok(())
    }
}

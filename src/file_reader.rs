use crate::dbf::{AttributeStore, Dbf, FieldDef};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::header::{read_index, IndexEntry, ShapeHeader};
use crate::record::{decode_content, ShpRecord};
use crate::shape_type::ShapeType;
use byteorder::{BigEndian, ReadBytesExt};
use fallible_streaming_iterator::FallibleStreamingIterator;
use geozero::{FeatureAccess, FeatureProcessor, GeozeroDatasource};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Size of the big-endian record header preceding each record content
pub(crate) const RECORD_HEADER_SIZE: usize = 8;

/// Shapefile dataset: `.shp` geometries, `.shx` index and `.dbf` attributes.
///
/// Records are decoded on demand, only the header and index are kept in
/// memory.
#[derive(Debug)]
pub struct ShapeFile {
    file_root: FileRoot,
    shp: File,
    header: ShapeHeader,
    index: Vec<IndexEntry>,
    dbf: Dbf,
}

/// Path shared by the three files, and the case of their extensions
#[derive(Clone, Debug)]
pub(crate) struct FileRoot {
    path: PathBuf,
    upper_case: bool,
}

impl FileRoot {
    /// Strip a `.shp`, `.shx` or `.dbf` extension from `path`, keeping its
    /// case for the siblings. Without one, upper case siblings are used only
    /// when they exist and the lower case `.shp` does not.
    pub(crate) fn new(path: &Path) -> FileRoot {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ["shp", "shx", "dbf"].contains(&ext.to_ascii_lowercase().as_str()) => {
                FileRoot {
                    path: path.with_extension(""),
                    upper_case: !ext.bytes().any(|b| b.is_ascii_lowercase()),
                }
            }
            _ => {
                let lower = FileRoot {
                    path: path.to_path_buf(),
                    upper_case: false,
                };
                let upper = FileRoot {
                    upper_case: true,
                    ..lower.clone()
                };
                if !lower.sibling("shp").exists() && upper.sibling("shp").exists() {
                    upper
                } else {
                    lower
                }
            }
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file with the given lower case extension
    pub(crate) fn sibling(&self, ext: &str) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".");
        if self.upper_case {
            name.push(ext.to_ascii_uppercase());
        } else {
            name.push(ext);
        }
        PathBuf::from(name)
    }
}

impl ShapeFile {
    /// Open a shapefile given its `.shp` path or its path without extension
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ShapeFile> {
        let file_root = FileRoot::new(path.as_ref());
        let mut shp = File::open(file_root.sibling("shp"))?;
        let header = ShapeHeader::read(&mut shp)?;

        let mut shx = BufReader::new(File::open(file_root.sibling("shx"))?);
        let shx_header = ShapeHeader::read(&mut shx)?;
        let index = read_index(&mut shx, &shx_header)?;

        let dbf = Dbf::open(file_root.sibling("dbf"))?;
        if dbf.record_count() != index.len() {
            warn!(
                "{} has {} attribute rows for {} shapes",
                file_root.path().display(),
                dbf.record_count(),
                index.len()
            );
        }
        info!(
            "Opened {} ({:?}, {} records)",
            file_root.path().display(),
            header.shape_type,
            index.len()
        );
        Ok(ShapeFile {
            file_root,
            shp,
            header,
            index,
            dbf,
        })
    }

    /// Path shared by the three files, without extension
    pub fn file_root(&self) -> &Path {
        self.file_root.path()
    }

    pub(crate) fn root(&self) -> &FileRoot {
        &self.file_root
    }

    /// Header information
    pub fn header(&self) -> &ShapeHeader {
        &self.header
    }

    pub fn shape_type(&self) -> ShapeType {
        self.header.shape_type
    }

    /// Extent from the `.shp` header
    pub fn bounding_box(&self) -> Envelope {
        self.header.bounding_box()
    }

    /// Attribute field declarations
    pub fn fields(&self) -> &[FieldDef] {
        self.dbf.field_defs()
    }

    pub fn record_count(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn dbf(&self) -> &Dbf {
        &self.dbf
    }

    fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.record_count() {
            return Err(Error::OutOfRange {
                index: i,
                count: self.record_count(),
            });
        }
        Ok(())
    }

    /// Record content bytes as stored in the `.shp`
    pub(crate) fn raw_content(&self, i: usize) -> Result<Vec<u8>> {
        self.check_index(i)?;
        let entry = self.index[i];
        if entry.offset + RECORD_HEADER_SIZE + entry.length > self.header.file_length {
            return Err(Error::MalformedBinary(format!(
                "record {i} extends beyond the end of the .shp file"
            )));
        }
        let mut shp = &self.shp;
        shp.seek(SeekFrom::Start(entry.offset as u64))?;
        let _number = shp.read_i32::<BigEndian>()?;
        let length = shp.read_i32::<BigEndian>()?.max(0) as usize * 2;
        if length != entry.length {
            debug!(
                "Record {i}: content length {length} differs from index ({})",
                entry.length
            );
        }
        let mut content = vec![0; entry.length];
        shp.read_exact(&mut content)?;
        Ok(content)
    }

    /// Decode the record at 0-based ordinal `i`
    pub fn record(&self, i: usize) -> Result<ShpRecord> {
        let content = self.raw_content(i)?;
        let geometry = decode_content(&content, self.shape_type())?;
        let data = self.dbf.row(i)?;
        Ok(ShpRecord {
            index: i,
            geometry,
            data,
        })
    }

    /// Iterate over all records
    pub fn records(&self) -> ShpRecords<'_> {
        ShpRecords {
            shp: self,
            next: 0,
            current: None,
        }
    }

    /// Read and process all records
    pub fn process_features<W: FeatureProcessor>(
        &self,
        out: &mut W,
    ) -> geozero::error::Result<()> {
        let name = self
            .file_root()
            .file_name()
            .map(|n| n.to_string_lossy().to_string());
        out.dataset_begin(name.as_deref())?;
        let mut records = self.records();
        while let Some(record) = records.next()? {
            record.process(out, record.index as u64)?;
        }
        out.dataset_end()
    }

    /// Release the file handles
    pub fn close(self) {
        debug!("Closing {}", self.file_root().display());
    }
}

/// Streaming iterator over the records of a `ShapeFile`.
///
/// ```rust
/// use fallible_streaming_iterator::FallibleStreamingIterator;
/// use simple_features::*;
///
/// # fn read_shp() -> Result<()> {
/// let shp = ShapeFile::open("point.shp")?;
/// let mut records = shp.records();
/// while let Some(record) = records.next()? {
///     println!("{:?} {:?}", record.geometry, record.data);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ShpRecords<'a> {
    shp: &'a ShapeFile,
    next: usize,
    current: Option<ShpRecord>,
}

impl FallibleStreamingIterator for ShpRecords<'_> {
    type Error = Error;
    type Item = ShpRecord;

    fn advance(&mut self) -> Result<()> {
        if self.next >= self.shp.record_count() {
            self.current = None;
            return Ok(());
        }
        self.current = Some(self.shp.record(self.next)?);
        self.next += 1;
        Ok(())
    }

    fn get(&self) -> Option<&ShpRecord> {
        self.current.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.shp.record_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl GeozeroDatasource for ShapeFile {
    /// Process all records, e.g. into a `GeoJsonWriter`.
    fn process<P: FeatureProcessor>(&mut self, processor: &mut P) -> geozero::error::Result<()> {
        self.process_features(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_roots() {
        let root = FileRoot::new(Path::new("data/point.shp"));
        assert_eq!(root.path(), Path::new("data/point"));
        assert_eq!(root.sibling("dbf"), Path::new("data/point.dbf"));
        let root = FileRoot::new(Path::new("data/point.DBF"));
        assert_eq!(root.path(), Path::new("data/point"));
        assert_eq!(root.sibling("shx"), Path::new("data/point.SHX"));
        let root = FileRoot::new(Path::new("data/point"));
        assert_eq!(root.sibling("shp"), Path::new("data/point.shp"));
        let root = FileRoot::new(Path::new("data/point.v2"));
        assert_eq!(root.path(), Path::new("data/point.v2"));
        assert_eq!(root.sibling("shx"), Path::new("data/point.v2.shx"));
    }

    #[test]
    fn upper_case_siblings_without_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("FOO");
        std::fs::write(root.with_extension("SHP"), b"")?;
        assert_eq!(FileRoot::new(&root).sibling("dbf"), dir.path().join("FOO.DBF"));
        std::fs::write(root.with_extension("shp"), b"")?;
        assert_eq!(FileRoot::new(&root).sibling("dbf"), dir.path().join("FOO.dbf"));
        Ok(())
    }
}

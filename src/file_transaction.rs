//! Staged edits of a shapefile, applied as one whole-file rewrite.

use crate::dbf::AttributeStore;
use crate::error::{Error, Result};
use crate::file_reader::ShapeFile;
use crate::file_writer::ShpWriter;
use crate::record::ShpRecord;

/// Pending adds and deletes of one `ShapeFile::transaction` block.
#[derive(Debug, Default)]
pub struct ShpTransaction {
    added: Vec<ShpRecord>,
    deleted: Vec<usize>,
    rolled_back: bool,
}

impl ShpTransaction {
    /// Stage a record to append after the surviving records
    pub fn add(&mut self, record: ShpRecord) {
        if self.rolled_back {
            debug!("Ignoring add after rollback");
            return;
        }
        self.added.push(record);
    }

    /// Stage removal of the record at 0-based ordinal `index`
    pub fn delete(&mut self, index: usize) {
        if self.rolled_back {
            debug!("Ignoring delete after rollback");
            return;
        }
        self.deleted.push(index);
    }

    /// Discard everything staged so far. Nothing is written when the block ends.
    pub fn rollback(&mut self) {
        self.added.clear();
        self.deleted.clear();
        self.rolled_back = true;
    }

    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back
    }

    /// Number of staged adds
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    /// Number of staged deletes
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }
}

impl ShapeFile {
    /// Run `edit` on a new transaction and commit its staged changes.
    ///
    /// Nothing is written when `edit` calls `rollback` or returns an error.
    /// A failing commit leaves all files as they were.
    pub fn transaction<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut ShpTransaction) -> Result<()>,
    {
        let mut tr = ShpTransaction::default();
        if let Err(e) = edit(&mut tr) {
            info!("Transaction on {} aborted: {e}", self.file_root().display());
            return Err(e);
        }
        if tr.rolled_back {
            info!("Transaction on {} rolled back", self.file_root().display());
            return Ok(());
        }
        self.commit(tr)
    }

    fn commit(&mut self, tr: ShpTransaction) -> Result<()> {
        let count = self.record_count();
        let mut deleted = tr.deleted;
        deleted.sort_unstable();
        deleted.dedup();
        if let Some(&index) = deleted.iter().find(|&&i| i >= count) {
            return Err(Error::OutOfRange { index, count });
        }
        if deleted.is_empty() && tr.added.is_empty() {
            debug!("Empty transaction on {}", self.file_root().display());
            return Ok(());
        }

        let mut writer = ShpWriter::new(self.shape_type(), self.fields().to_vec())?;
        for i in (0..count).filter(|i| deleted.binary_search(i).is_err()) {
            writer.add_raw(&self.raw_content(i)?, self.dbf().raw_record(i)?)?;
        }
        for record in &tr.added {
            writer.add_record(record)?;
        }
        let root = self.root().clone();
        writer.write(&root)?;
        *self = ShapeFile::open(root.sibling("shp"))?;
        info!(
            "Committed {} adds and {} deletes to {} ({} records)",
            tr.added.len(),
            deleted.len(),
            root.path().display(),
            self.record_count()
        );
        debug_assert_eq!(self.record_count(), self.dbf().record_count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbf::{FieldDef, FieldValue, Row};
    use crate::geometry::{Point, DEFAULT_SRID};
    use crate::shape_type::ShapeType;

    fn row(v: i64) -> Row {
        let mut row = Row::new();
        row.insert("Hoyoyo".to_string(), FieldValue::Integer(v));
        row
    }

    fn point_file(dir: &std::path::Path) -> Result<ShapeFile> {
        let mut shp = ShapeFile::create(
            dir.join("point.shp"),
            ShapeType::Point,
            vec![FieldDef::integer("Hoyoyo", 4)],
        )?;
        shp.transaction(|tr| {
            tr.add(ShpRecord::new(Point::from_x_y(-90.08375, 34.39996, DEFAULT_SRID), row(6)));
            tr.add(ShpRecord::new(Point::from_x_y(-87.8258, 33.36416, DEFAULT_SRID), row(9)));
            Ok(())
        })?;
        Ok(shp)
    }

    #[test]
    fn staging() {
        let mut tr = ShpTransaction::default();
        tr.delete(1);
        tr.add(ShpRecord::null(Row::new()));
        assert_eq!((tr.added_count(), tr.deleted_count()), (1, 1));
        tr.rollback();
        tr.delete(0);
        assert!(tr.is_rolled_back());
        assert_eq!((tr.added_count(), tr.deleted_count()), (0, 0));
    }

    #[test]
    fn commit_renumbers() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut shp = point_file(dir.path())?;
        assert_eq!(shp.record_count(), 2);

        shp.transaction(|tr| {
            tr.add(ShpRecord::new(Point::from_x_y(123.4, 123.4, DEFAULT_SRID), row(5)));
            tr.add(ShpRecord::new(Point::from_x_y(-16.67, 16.41, DEFAULT_SRID), row(-7)));
            tr.delete(1);
            tr.delete(1);
            Ok(())
        })?;
        assert_eq!(shp.record_count(), 3);
        let values: Vec<_> = (0..3)
            .map(|i| shp.record(i).map(|r| r.data["Hoyoyo"].clone()))
            .collect::<Result<_>>()?;
        assert_eq!(
            values,
            vec![
                FieldValue::Integer(6),
                FieldValue::Integer(5),
                FieldValue::Integer(-7)
            ]
        );
        assert_eq!(shp.header().bbox(), [-90.08375, 16.41, 123.4, 123.4]);
        Ok(())
    }

    #[test]
    fn failed_commit_leaves_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut shp = point_file(dir.path())?;
        let before = std::fs::read(dir.path().join("point.shp"))?;

        let result = shp.transaction(|tr| {
            tr.add(ShpRecord::new(Point::from_x_y(1.0, 1.0, DEFAULT_SRID), row(1)));
            tr.delete(7);
            Ok(())
        });
        assert!(matches!(result, Err(Error::OutOfRange { index: 7, count: 2 })));

        let mut big = Row::new();
        big.insert("Hoyoyo".to_string(), FieldValue::Integer(123456));
        let result = shp.transaction(|tr| {
            tr.add(ShpRecord::new(Point::from_x_y(1.0, 1.0, DEFAULT_SRID), big));
            Ok(())
        });
        assert!(matches!(result, Err(Error::InvalidAttribute(_))));

        let result = shp.transaction(|tr| {
            tr.delete(0);
            Err(Error::InvalidAttribute("stop".to_string()))
        });
        assert!(result.is_err());

        assert_eq!(std::fs::read(dir.path().join("point.shp"))?, before);
        assert_eq!(shp.record_count(), 2);
        Ok(())
    }
}

//! dBase III attribute tables (`.dbf`).
//!
//! Layout: 32-byte header, one 32-byte descriptor per field, a `0x0D`
//! terminator, then fixed-width records each starting with a deletion flag.
//! The file ends with `0x1A`.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use chrono::{Datelike, Local, NaiveDate};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const DBF_VERSION: u8 = 0x03;
const DBF_HEADER_SIZE: usize = 32;
const FIELD_DESCRIPTOR_SIZE: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const EOF_MARKER: u8 = 0x1A;
const RECORD_ACTIVE: u8 = b' ';
const RECORD_DELETED: u8 = b'*';
/// Maximum field name length in bytes
pub const MAX_FIELD_NAME: usize = 10;
const DATE_FORMAT: &str = "%Y%m%d";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// `C`, fixed width text
    Character,
    /// `N`, integer when `decimal` is 0
    Numeric,
    /// `F`
    Float,
    /// `L`
    Logical,
    /// `D`, `YYYYMMDD`
    Date,
}

impl FieldType {
    pub fn code(&self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
        }
    }

    pub fn from_code(code: u8) -> Result<FieldType> {
        match code {
            b'C' => Ok(FieldType::Character),
            b'N' => Ok(FieldType::Numeric),
            b'F' => Ok(FieldType::Float),
            b'L' => Ok(FieldType::Logical),
            b'D' => Ok(FieldType::Date),
            _ => Err(Error::InvalidDbf(format!(
                "unsupported field type `{}`",
                code as char
            ))),
        }
    }
}

/// Column declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Width in bytes
    pub length: u8,
    /// Digits after the decimal point, numeric types only
    pub decimal: u8,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType, length: u8, decimal: u8) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            field_type,
            length,
            decimal,
        }
    }
    pub fn character(name: &str, length: u8) -> FieldDef {
        FieldDef::new(name, FieldType::Character, length, 0)
    }
    pub fn integer(name: &str, length: u8) -> FieldDef {
        FieldDef::new(name, FieldType::Numeric, length, 0)
    }
    pub fn numeric(name: &str, length: u8, decimal: u8) -> FieldDef {
        FieldDef::new(name, FieldType::Numeric, length, decimal)
    }
    pub fn logical(name: &str) -> FieldDef {
        FieldDef::new(name, FieldType::Logical, 1, 0)
    }
    pub fn date(name: &str) -> FieldDef {
        FieldDef::new(name, FieldType::Date, 8, 0)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_FIELD_NAME || !self.name.is_ascii() {
            return Err(Error::InvalidDbf(format!(
                "field name `{}` must be 1 to {MAX_FIELD_NAME} ASCII bytes",
                self.name
            )));
        }
        if self.length == 0 {
            return Err(Error::InvalidDbf(format!(
                "field `{}` has zero length",
                self.name
            )));
        }
        Ok(())
    }
}

/// Attribute value of one field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Character(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
    Date(NaiveDate),
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Character(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Character(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Logical(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

/// Field name to value
pub type Row = HashMap<String, FieldValue>;

/// Record-aligned attribute table backing a shapefile
pub trait AttributeStore {
    fn field_defs(&self) -> &[FieldDef];
    fn row(&self, i: usize) -> Result<Row>;
    fn append(&mut self, row: &Row) -> Result<()>;
    fn record_count(&self) -> usize;
}

/// dBase III table read on demand from disk
#[derive(Debug)]
pub struct Dbf {
    path: PathBuf,
    file: File,
    fields: Vec<FieldDef>,
    record_count: usize,
    header_len: usize,
    record_len: usize,
    last_update: Option<NaiveDate>,
}

impl Dbf {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Dbf> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let mut head = [0; DBF_HEADER_SIZE];
        file.read_exact(&mut head)?;
        if head[0] & 0x07 != DBF_VERSION {
            debug!("dBase version byte {:#04x}", head[0]);
        }
        let last_update =
            NaiveDate::from_ymd_opt(1900 + head[1] as i32, head[2] as u32, head[3] as u32);
        let record_count = LittleEndian::read_u32(&head[4..8]) as usize;
        let header_len = LittleEndian::read_u16(&head[8..10]) as usize;
        let record_len = LittleEndian::read_u16(&head[10..12]) as usize;
        if header_len < DBF_HEADER_SIZE + 1 {
            return Err(Error::InvalidDbf(format!("header length {header_len}")));
        }

        let mut descriptors = vec![0; header_len - DBF_HEADER_SIZE];
        file.read_exact(&mut descriptors)?;
        let mut fields = Vec::new();
        for desc in descriptors.chunks_exact(FIELD_DESCRIPTOR_SIZE) {
            if desc[0] == HEADER_TERMINATOR {
                break;
            }
            let name_len = desc[..11].iter().position(|&b| b == 0).unwrap_or(11);
            fields.push(FieldDef {
                name: String::from_utf8_lossy(&desc[..name_len]).trim().to_string(),
                field_type: FieldType::from_code(desc[11])?,
                length: desc[16],
                decimal: desc[17],
            });
        }
        let data_len: usize = fields.iter().map(|f| f.length as usize).sum();
        if data_len + 1 > record_len {
            return Err(Error::InvalidDbf(format!(
                "record length {record_len} smaller than fields ({})",
                data_len + 1
            )));
        }
        debug!(
            "Opened {} with {} fields and {record_count} records",
            path.display(),
            fields.len()
        );
        Ok(Dbf {
            path,
            file,
            fields,
            record_count,
            header_len,
            record_len,
            last_update,
        })
    }

    /// Create an empty table with the given fields, replacing any existing file
    pub fn create<P: AsRef<Path>>(path: P, fields: Vec<FieldDef>) -> Result<Dbf> {
        let bytes = Dbf::encode_table(&fields, &[])?;
        File::create(path.as_ref())?.write_all(&bytes)?;
        Dbf::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Date of last update from the header
    pub fn last_update(&self) -> Option<NaiveDate> {
        self.last_update
    }

    fn check_index(&self, i: usize) -> Result<()> {
        if i >= self.record_count {
            return Err(Error::OutOfRange {
                index: i,
                count: self.record_count,
            });
        }
        Ok(())
    }

    /// Record bytes including the deletion flag
    pub(crate) fn raw_record(&self, i: usize) -> Result<Vec<u8>> {
        self.check_index(i)?;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(
            (self.header_len + i * self.record_len) as u64,
        ))?;
        let mut buf = vec![0; self.record_len];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Whether the record carries the deletion flag
    pub fn is_deleted(&self, i: usize) -> Result<bool> {
        Ok(self.raw_record(i)?.first() == Some(&RECORD_DELETED))
    }

    pub(crate) fn decode_record(&self, raw: &[u8]) -> Result<Row> {
        let mut row = Row::with_capacity(self.fields.len());
        let mut offset = 1;
        for field in &self.fields {
            let end = offset + field.length as usize;
            let bytes = raw
                .get(offset..end)
                .ok_or_else(|| Error::InvalidDbf("truncated record".to_string()))?;
            row.insert(field.name.clone(), decode_value(field, bytes)?);
            offset = end;
        }
        Ok(row)
    }

    /// Fixed-width record bytes for `row`, deletion flag included
    pub(crate) fn encode_record(fields: &[FieldDef], row: &Row) -> Result<Vec<u8>> {
        for name in row.keys() {
            if !fields.iter().any(|f| &f.name == name) {
                warn!("Ignoring attribute `{name}` without field declaration");
            }
        }
        let mut record = vec![RECORD_ACTIVE];
        for field in fields {
            let value = row.get(&field.name).unwrap_or(&FieldValue::Null);
            record.extend_from_slice(&encode_value(field, value)?);
        }
        Ok(record)
    }

    /// Complete file bytes for `fields` and already encoded `records`
    pub(crate) fn encode_table(fields: &[FieldDef], records: &[Vec<u8>]) -> Result<Vec<u8>> {
        for field in fields {
            field.validate()?;
        }
        let header_len = DBF_HEADER_SIZE + fields.len() * FIELD_DESCRIPTOR_SIZE + 1;
        let record_len = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
        if header_len > u16::MAX as usize || record_len > u16::MAX as usize {
            return Err(Error::InvalidDbf("too many fields".to_string()));
        }
        let mut buf = Vec::with_capacity(header_len + records.len() * record_len + 1);
        buf.extend_from_slice(&header_bytes(records.len(), header_len, record_len));
        for field in fields {
            let mut desc = [0u8; FIELD_DESCRIPTOR_SIZE];
            desc[..field.name.len()].copy_from_slice(field.name.as_bytes());
            desc[11] = field.field_type.code();
            desc[16] = field.length;
            desc[17] = field.decimal;
            buf.extend_from_slice(&desc);
        }
        buf.push(HEADER_TERMINATOR);
        for record in records {
            if record.len() != record_len {
                return Err(Error::InvalidDbf(format!(
                    "record of {} bytes in table with record length {record_len}",
                    record.len()
                )));
            }
            buf.extend_from_slice(record);
        }
        buf.push(EOF_MARKER);
        Ok(buf)
    }
}

fn header_bytes(
    record_count: usize,
    header_len: usize,
    record_len: usize,
) -> [u8; DBF_HEADER_SIZE] {
    let today = Local::now().date_naive();
    let mut head = [0u8; DBF_HEADER_SIZE];
    head[0] = DBF_VERSION;
    head[1] = (today.year() - 1900).clamp(0, 255) as u8;
    head[2] = today.month() as u8;
    head[3] = today.day() as u8;
    LittleEndian::write_u32(&mut head[4..8], record_count as u32);
    LittleEndian::write_u16(&mut head[8..10], header_len as u16);
    LittleEndian::write_u16(&mut head[10..12], record_len as u16);
    head
}

impl AttributeStore for Dbf {
    fn field_defs(&self) -> &[FieldDef] {
        &self.fields
    }

    fn row(&self, i: usize) -> Result<Row> {
        let raw = self.raw_record(i)?;
        self.decode_record(&raw)
    }

    /// Append in place and update the header record count
    fn append(&mut self, row: &Row) -> Result<()> {
        let record = Dbf::encode_record(&self.fields, row)?;
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(
            (self.header_len + self.record_count * self.record_len) as u64,
        ))?;
        file.write_all(&record)?;
        file.write_all(&[EOF_MARKER])?;
        let head = header_bytes(self.record_count + 1, self.header_len, self.record_len);
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&head[..12])?;
        file.flush()?;
        self.record_count += 1;
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.record_count
    }
}

fn invalid(field: &FieldDef, text: &str) -> Error {
    Error::InvalidAttribute(format!(
        "`{text}` is not a valid {:?} value for field `{}`",
        field.field_type, field.name
    ))
}

fn decode_value(field: &FieldDef, bytes: &[u8]) -> Result<FieldValue> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_matches(|c: char| c == ' ' || c == '\0');
    if text.is_empty() {
        return Ok(FieldValue::Null);
    }
    let value = match field.field_type {
        FieldType::Character => FieldValue::Character(text.to_string()),
        FieldType::Numeric | FieldType::Float => {
            if text.chars().all(|c| c == '*') {
                return Ok(FieldValue::Null);
            }
            match text.parse::<i64>() {
                Ok(i) if field.field_type == FieldType::Numeric && field.decimal == 0 => {
                    FieldValue::Integer(i)
                }
                _ => FieldValue::Float(text.parse().map_err(|_| invalid(field, text))?),
            }
        }
        FieldType::Logical => match text {
            "Y" | "y" | "T" | "t" => FieldValue::Logical(true),
            "N" | "n" | "F" | "f" => FieldValue::Logical(false),
            "?" => FieldValue::Null,
            _ => return Err(invalid(field, text)),
        },
        FieldType::Date => {
            if text == "00000000" {
                return Ok(FieldValue::Null);
            }
            FieldValue::Date(
                NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|_| invalid(field, text))?,
            )
        }
    };
    Ok(value)
}

/// Left-aligned text cut to the field width
fn pad_text(field: &FieldDef, text: &str) -> Vec<u8> {
    let width = field.length as usize;
    let mut end = text.len().min(width);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    if end < text.len() {
        warn!(
            "Truncating value of field `{}` to {width} bytes",
            field.name
        );
    }
    let mut bytes = text.as_bytes()[..end].to_vec();
    bytes.resize(width, b' ');
    bytes
}

/// Right-aligned number, an error when it does not fit
fn pad_number(field: &FieldDef, text: String) -> Result<Vec<u8>> {
    let width = field.length as usize;
    if text.len() > width {
        return Err(Error::InvalidAttribute(format!(
            "`{text}` does not fit the {width} bytes of field `{}`",
            field.name
        )));
    }
    Ok(format!("{text:>width$}").into_bytes())
}

fn encode_value(field: &FieldDef, value: &FieldValue) -> Result<Vec<u8>> {
    let decimal = field.decimal as usize;
    match (field.field_type, value) {
        (FieldType::Logical, FieldValue::Null) => Ok(pad_text(field, "?")),
        (_, FieldValue::Null) => Ok(vec![b' '; field.length as usize]),
        (FieldType::Character, FieldValue::Character(s)) => Ok(pad_text(field, s)),
        (FieldType::Character, FieldValue::Integer(i)) => Ok(pad_text(field, &i.to_string())),
        (FieldType::Character, FieldValue::Float(f)) => Ok(pad_text(field, &f.to_string())),
        (FieldType::Character, FieldValue::Logical(b)) => {
            Ok(pad_text(field, if *b { "T" } else { "F" }))
        }
        (FieldType::Character, FieldValue::Date(d)) => {
            Ok(pad_text(field, &d.format(DATE_FORMAT).to_string()))
        }
        (FieldType::Numeric | FieldType::Float, FieldValue::Integer(i)) => {
            if decimal == 0 {
                pad_number(field, i.to_string())
            } else {
                pad_number(field, format!("{:.decimal$}", *i as f64))
            }
        }
        (FieldType::Numeric | FieldType::Float, FieldValue::Float(f)) => {
            if !f.is_finite() {
                return Err(invalid(field, &f.to_string()));
            }
            pad_number(field, format!("{f:.decimal$}"))
        }
        (FieldType::Logical, FieldValue::Logical(b)) => {
            Ok(pad_text(field, if *b { "T" } else { "F" }))
        }
        (FieldType::Date, FieldValue::Date(d)) => {
            Ok(pad_text(field, &d.format(DATE_FORMAT).to_string()))
        }
        (_, other) => Err(Error::InvalidAttribute(format!(
            "{other:?} cannot be stored in {:?} field `{}`",
            field.field_type, field.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<FieldDef> {
        vec![
            FieldDef::character("Hello", 8),
            FieldDef::integer("Hoyoyo", 4),
            FieldDef::numeric("Chipoto", 10, 3),
            FieldDef::logical("Flag"),
            FieldDef::date("Since"),
        ]
    }

    #[test]
    fn create_and_append() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("table.dbf");
        let mut dbf = Dbf::create(&path, fields())?;
        assert_eq!(dbf.record_count(), 0);
        assert_eq!(dbf.field_defs().len(), 5);
        assert!(dbf.last_update().is_some());

        let mut row = Row::new();
        row.insert("Hello".to_string(), "Bouyoul!".into());
        row.insert("Hoyoyo".to_string(), 6i64.into());
        row.insert("Chipoto".to_string(), 5.678.into());
        row.insert("Flag".to_string(), true.into());
        row.insert(
            "Since".to_string(),
            NaiveDate::from_ymd_opt(2007, 3, 9).map_or(FieldValue::Null, FieldValue::Date),
        );
        dbf.append(&row)?;
        dbf.append(&Row::new())?;
        assert_eq!(dbf.record_count(), 2);

        let reopened = Dbf::open(&path)?;
        assert_eq!(reopened.record_count(), 2);
        assert_eq!(reopened.fields(), &fields()[..]);
        assert_eq!(reopened.row(0)?, row);
        let empty = reopened.row(1)?;
        assert!(empty.values().all(|v| *v == FieldValue::Null));
        assert!(!reopened.is_deleted(0)?);
        assert!(matches!(
            reopened.row(2),
            Err(Error::OutOfRange { index: 2, count: 2 })
        ));

        let bytes = std::fs::read(&path)?;
        assert_eq!(bytes[0], DBF_VERSION);
        assert_eq!(bytes.last(), Some(&EOF_MARKER));
        assert_eq!(bytes.len(), 32 + 5 * 32 + 1 + 2 * (1 + 8 + 4 + 10 + 1 + 8) + 1);
        Ok(())
    }

    #[test]
    fn value_encoding() -> Result<()> {
        let f = FieldDef::integer("n", 4);
        assert_eq!(encode_value(&f, &FieldValue::Integer(-7))?, b"  -7");
        assert!(matches!(
            encode_value(&f, &FieldValue::Integer(123456)),
            Err(Error::InvalidAttribute(_))
        ));
        let f = FieldDef::numeric("x", 8, 2);
        assert_eq!(encode_value(&f, &FieldValue::Float(5.6778))?, b"    5.68");
        assert_eq!(encode_value(&f, &FieldValue::Integer(3))?, b"    3.00");
        assert!(encode_value(&f, &FieldValue::Character("abc".into())).is_err());

        let f = FieldDef::character("s", 4);
        assert_eq!(encode_value(&f, &"AEZAEZ".into())?, b"AEZA");
        assert_eq!(encode_value(&f, &"é€".into())?, "é  ".as_bytes());
        Ok(())
    }

    #[test]
    fn value_decoding() -> Result<()> {
        let f = FieldDef::integer("n", 4);
        assert_eq!(decode_value(&f, b"   9")?, FieldValue::Integer(9));
        assert_eq!(decode_value(&f, b"    ")?, FieldValue::Null);
        assert_eq!(decode_value(&f, b"****")?, FieldValue::Null);
        assert_eq!(decode_value(&f, b" 1.5")?, FieldValue::Float(1.5));
        assert!(matches!(
            decode_value(&f, b"abcd"),
            Err(Error::InvalidAttribute(_))
        ));
        let f = FieldDef::numeric("x", 8, 3);
        assert_eq!(decode_value(&f, b"       5")?, FieldValue::Float(5.0));
        let f = FieldDef::logical("l");
        assert_eq!(decode_value(&f, b"y")?, FieldValue::Logical(true));
        assert_eq!(decode_value(&f, b"?")?, FieldValue::Null);
        let f = FieldDef::date("d");
        assert_eq!(
            decode_value(&f, b"20070309")?,
            NaiveDate::from_ymd_opt(2007, 3, 9).map_or(FieldValue::Null, FieldValue::Date)
        );
        assert_eq!(decode_value(&f, b"00000000")?, FieldValue::Null);
        Ok(())
    }

    #[test]
    fn invalid_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.dbf");
        assert!(matches!(
            Dbf::create(&path, vec![FieldDef::character("much_too_long", 5)]),
            Err(Error::InvalidDbf(_))
        ));
        assert!(matches!(
            Dbf::create(&path, vec![FieldDef::character("", 5)]),
            Err(Error::InvalidDbf(_))
        ));
    }
}

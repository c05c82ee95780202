use crate::shape_type::ShapeType;
use geozero::error::GeozeroError;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum Error {
    /// Truncated or inconsistent WKB or shape record content
    MalformedBinary(String),
    /// Parse failure in the WKT/EWKT grammar
    MalformedText(String),
    /// Coordinate slice does not match the requested dimensions
    DimensionMismatch { expected: usize, found: usize },
    /// Geometry or record type incompatible with the shapefile type. `found`
    /// is the record type code, or the code a geometry would be stored under
    /// (`-1` for geometry collections).
    UnsupportedShapeType { expected: ShapeType, found: i32 },
    UnknownShapeType(i32),
    OutOfRange { index: usize, count: usize },
    InvalidFileCode(i32),
    InvalidDbf(String),
    InvalidAttribute(String),
    IO(std::io::Error),
}
pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedBinary(msg) => write!(f, "Malformed binary data: {msg}"),
            Error::MalformedText(msg) => write!(f, "Malformed text: {msg}"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "Expected {expected} ordinates, found {found}")
            }
            Error::UnsupportedShapeType { expected, found } => {
                write!(f, "Shape type {found} not supported in a {expected:?} file")
            }
            Error::UnknownShapeType(code) => write!(f, "Unknown shape type: {code}"),
            Error::OutOfRange { index, count } => {
                write!(f, "Record index {index} out of range ({count} records)")
            }
            Error::InvalidFileCode(code) => {
                write!(f, "Invalid file code {code}. Is this a shapefile?")
            }
            Error::InvalidDbf(msg) => write!(f, "Invalid dBase file: {msg}"),
            Error::InvalidAttribute(msg) => write!(f, "Invalid attribute: {msg}"),
            Error::IO(io) => io.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(io) => Some(io),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::IO(value)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Self::IO(value.error)
    }
}

impl From<Error> for GeozeroError {
    fn from(value: Error) -> Self {
        match value {
            Error::IO(io) => io.into(),
            Error::InvalidAttribute(msg) | Error::InvalidDbf(msg) => GeozeroError::Property(msg),
            other => GeozeroError::Geometry(other.to_string()),
        }
    }
}

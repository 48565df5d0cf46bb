use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

/// A vendor-specific temporal value as returned by a driver's generic fetch.
///
/// `type_name` is the vendor's own name for the representation (for example
/// `TIMESTAMP`, `TIMESTAMPTZ` or `DATE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorValue {
    pub type_name: String,
    pub value: NaiveDateTime,
}

impl VendorValue {
    #[must_use]
    pub fn new(type_name: impl Into<String>, value: NaiveDateTime) -> Self {
        Self {
            type_name: type_name.into(),
            value,
        }
    }
}

/// An application value crossing the driver boundary, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    String(String),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    BigInt(i128),
    Real32(f32),
    Real64(f64),
    Decimal(Decimal),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// A generic point in time with no driver-native shape.
    Instant(DateTime<Utc>),
    /// A calendar-like value whose zone must travel with it to the driver.
    Calendar(DateTime<FixedOffset>),
    /// Binary large object as handed out by a driver.
    Blob(Vec<u8>),
    /// Character large object as handed out by a driver.
    Clob(String),
    Vendor(VendorValue),
    /// A multi-value container, expanded into repeated bind slots by the
    /// positional-typed binder.
    List(Vec<SqlValue>),
    /// A fixed tuple of sub-values inside a [`SqlValue::List`].
    Tuple(Vec<SqlValue>),
}

impl SqlValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Int8(_)
                | Self::Int16(_)
                | Self::Int32(_)
                | Self::Int64(_)
                | Self::BigInt(_)
                | Self::Real32(_)
                | Self::Real64(_)
                | Self::Decimal(_)
        )
    }

    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8(_) | Self::Int16(_) | Self::Int32(_) | Self::Int64(_) | Self::BigInt(_)
        )
    }

    /// Text-like values bind as text when no type hint is available.
    #[must_use]
    pub const fn is_text_like(&self) -> bool {
        matches!(self, Self::String(_) | Self::Clob(_))
    }

    /// Name of the runtime shape, used in conversion error messages.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
            Self::Int8(_) => "i8",
            Self::Int16(_) => "i16",
            Self::Int32(_) => "i32",
            Self::Int64(_) => "i64",
            Self::BigInt(_) => "i128",
            Self::Real32(_) => "f32",
            Self::Real64(_) => "f64",
            Self::Decimal(_) => "decimal",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Instant(_) => "instant",
            Self::Calendar(_) => "calendar",
            Self::Blob(_) => "blob",
            Self::Clob(_) => "clob",
            Self::Vendor(_) => "vendor",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
        }
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) | Self::Clob(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(value) => Some(i64::from(*value)),
            Self::Int16(value) => Some(i64::from(*value)),
            Self::Int32(value) => Some(i64::from(*value)),
            Self::Int64(value) => Some(*value),
            Self::BigInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, values: &[SqlValue]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(value) | Self::Clob(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int8(value) => write!(f, "{value}"),
            Self::Int16(value) => write!(f, "{value}"),
            Self::Int32(value) => write!(f, "{value}"),
            Self::Int64(value) => write!(f, "{value}"),
            Self::BigInt(value) => write!(f, "{value}"),
            Self::Real32(value) => write!(f, "{value}"),
            Self::Real64(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Bytes(value) | Self::Blob(value) => {
                f.write_str(&String::from_utf8_lossy(value))
            }
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::Time(value) => write!(f, "{}", value.format("%H:%M:%S%.f")),
            Self::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
            Self::Instant(value) => write!(f, "{}", value.to_rfc3339()),
            Self::Calendar(value) => write!(f, "{}", value.to_rfc3339()),
            Self::Vendor(value) => {
                write!(f, "{}", value.value.format("%Y-%m-%d %H:%M:%S%.f"))
            }
            Self::List(values) => {
                f.write_str("[")?;
                write_joined(f, values)?;
                f.write_str("]")
            }
            Self::Tuple(values) => {
                f.write_str("(")?;
                write_joined(f, values)?;
                f.write_str(")")
            }
        }
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(val: Option<T>) -> Self {
        val.map_or(Self::Null, Into::into)
    }
}

impl From<bool> for SqlValue {
    fn from(val: bool) -> Self {
        Self::Bool(val)
    }
}

impl From<&str> for SqlValue {
    fn from(val: &str) -> Self {
        Self::String(val.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(val: &String) -> Self {
        Self::String(val.clone())
    }
}

impl From<String> for SqlValue {
    fn from(val: String) -> Self {
        Self::String(val)
    }
}

impl From<f32> for SqlValue {
    fn from(val: f32) -> Self {
        Self::Real32(val)
    }
}

impl From<f64> for SqlValue {
    fn from(val: f64) -> Self {
        Self::Real64(val)
    }
}

impl From<i8> for SqlValue {
    fn from(val: i8) -> Self {
        Self::Int8(val)
    }
}

impl From<i16> for SqlValue {
    fn from(val: i16) -> Self {
        Self::Int16(val)
    }
}

impl From<i32> for SqlValue {
    fn from(val: i32) -> Self {
        Self::Int32(val)
    }
}

impl From<i64> for SqlValue {
    fn from(val: i64) -> Self {
        Self::Int64(val)
    }
}

impl From<i128> for SqlValue {
    fn from(val: i128) -> Self {
        Self::BigInt(val)
    }
}

impl From<u8> for SqlValue {
    fn from(val: u8) -> Self {
        Self::Int16(i16::from(val))
    }
}

impl From<u16> for SqlValue {
    fn from(val: u16) -> Self {
        Self::Int32(i32::from(val))
    }
}

impl From<u32> for SqlValue {
    fn from(val: u32) -> Self {
        Self::Int64(i64::from(val))
    }
}

impl From<u64> for SqlValue {
    fn from(val: u64) -> Self {
        Self::BigInt(i128::from(val))
    }
}

impl From<Decimal> for SqlValue {
    fn from(val: Decimal) -> Self {
        Self::Decimal(val)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(val: Vec<u8>) -> Self {
        Self::Bytes(val)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(val: &[u8]) -> Self {
        Self::Bytes(val.to_vec())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(val: NaiveDate) -> Self {
        Self::Date(val)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(val: NaiveTime) -> Self {
        Self::Time(val)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(val: NaiveDateTime) -> Self {
        Self::Timestamp(val)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(val: DateTime<Utc>) -> Self {
        Self::Instant(val)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(val: DateTime<FixedOffset>) -> Self {
        Self::Calendar(val)
    }
}

impl From<VendorValue> for SqlValue {
    fn from(val: VendorValue) -> Self {
        Self::Vendor(val)
    }
}

impl From<Vec<Self>> for SqlValue {
    fn from(val: Vec<Self>) -> Self {
        Self::List(val)
    }
}

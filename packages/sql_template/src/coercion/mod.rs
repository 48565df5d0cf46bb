//! Type coercion between application values and driver values.
//!
//! The bind side turns one [`crate::ParameterValue`] into exactly one driver
//! bind call. The fetch side reads one column, either generically or through
//! the accessor matching a [`RequiredType`], and the conversion helpers
//! widen, narrow and parse values into the requested shape.

use std::fmt;

use thiserror::Error;

use crate::value::SqlValue;

pub mod bind;
pub mod convert;
pub mod fetch;
pub mod from_value;

pub use bind::{bind_parameter, set_parameter_value};
pub use convert::{convert_number_to_target, convert_value_to_required_type, parse_number};
pub use fetch::extract_value;
pub use from_value::FromSqlValue;

/// Runtime descriptor of the application type a column is read into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredType {
    String,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    BigInt,
    Real32,
    Real64,
    /// Any numeric shape. Fetched through the double accessor.
    Number,
    Bytes,
    Date,
    Time,
    Timestamp,
    Decimal,
    Blob,
    Clob,
    /// No specific type: fetch generically.
    Any,
}

impl RequiredType {
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::BigInt
                | Self::Real32
                | Self::Real64
                | Self::Number
                | Self::Decimal
        )
    }

    /// Types the driver hands back as primitives, zeroed on a SQL NULL.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(
            self,
            Self::Bool
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Real32
                | Self::Real64
                | Self::Number
        )
    }

    /// Whether `value` already has this shape. A null satisfies every type.
    #[must_use]
    pub const fn is_satisfied_by(self, value: &SqlValue) -> bool {
        match (self, value) {
            (_, SqlValue::Null)
            | (Self::Any, _)
            | (Self::String, SqlValue::String(_))
            | (Self::Bool, SqlValue::Bool(_))
            | (Self::Int8, SqlValue::Int8(_))
            | (Self::Int16, SqlValue::Int16(_))
            | (Self::Int32, SqlValue::Int32(_))
            | (Self::Int64, SqlValue::Int64(_))
            | (Self::BigInt, SqlValue::BigInt(_))
            | (Self::Real32, SqlValue::Real32(_))
            | (Self::Real64, SqlValue::Real64(_))
            | (Self::Decimal, SqlValue::Decimal(_))
            | (Self::Bytes, SqlValue::Bytes(_))
            | (Self::Date, SqlValue::Date(_))
            | (Self::Time, SqlValue::Time(_))
            | (Self::Timestamp, SqlValue::Timestamp(_))
            | (Self::Blob, SqlValue::Blob(_))
            | (Self::Clob, SqlValue::Clob(_)) => true,
            (Self::Number, value) => value.is_numeric(),
            _ => false,
        }
    }
}

impl fmt::Display for RequiredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::BigInt => "i128",
            Self::Real32 => "f32",
            Self::Real64 => "f64",
            Self::Number => "number",
            Self::Bytes => "bytes",
            Self::Date => "date",
            Self::Time => "time",
            Self::Timestamp => "timestamp",
            Self::Decimal => "decimal",
            Self::Blob => "blob",
            Self::Clob => "clob",
            Self::Any => "any",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error(
        "Could not convert number [{value}] of type [{source_type}] to target type [{target}]: overflow"
    )]
    Overflow {
        value: String,
        source_type: &'static str,
        target: RequiredType,
    },
    #[error("Cannot convert string [{text}] to target type [{target}]: {message}")]
    Parse {
        text: String,
        target: RequiredType,
        message: String,
    },
    #[error(
        "Could not convert number [{value}] of type [{source_type}] to unknown target type [{target}]"
    )]
    Unsupported {
        value: String,
        source_type: &'static str,
        target: RequiredType,
    },
    #[error("Unexpected null value for required type [{target}]")]
    UnexpectedNull { target: RequiredType },
    #[error(
        "Value [{value}] is of type [{source_type}] and cannot be converted to required type [{target}]"
    )]
    ConvertType {
        value: String,
        source_type: &'static str,
        target: RequiredType,
    },
}

impl ConversionError {
    pub(crate) fn convert_type(value: &SqlValue, target: RequiredType) -> Self {
        Self::ConvertType {
            value: value.to_string(),
            source_type: value.type_label(),
            target,
        }
    }

    pub(crate) fn overflow(value: &SqlValue, target: RequiredType) -> Self {
        Self::Overflow {
            value: value.to_string(),
            source_type: value.type_label(),
            target,
        }
    }
}

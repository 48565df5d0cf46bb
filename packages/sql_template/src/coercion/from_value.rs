use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::{ConversionError, RequiredType, convert_value_to_required_type};
use crate::value::SqlValue;

/// Rust types a column can be read into.
///
/// `required_type` picks the accessor used to fetch the column and
/// `from_sql_value` turns the fetched value into `Self`.
pub trait FromSqlValue: Sized {
    fn required_type() -> RequiredType;

    /// # Errors
    ///
    /// * If the value cannot be represented as `Self`
    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError>;
}

fn non_null(value: SqlValue, target: RequiredType) -> Result<SqlValue, ConversionError> {
    if value.is_null() {
        return Err(ConversionError::UnexpectedNull { target });
    }
    Ok(value)
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn required_type() -> RequiredType {
        T::required_type()
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_sql_value(value).map(Some)
    }
}

impl FromSqlValue for SqlValue {
    fn required_type() -> RequiredType {
        RequiredType::Any
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromSqlValue for String {
    fn required_type() -> RequiredType {
        RequiredType::String
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::String)? {
            SqlValue::String(text) | SqlValue::Clob(text) => Ok(text),
            value => Ok(value.to_string()),
        }
    }
}

impl FromSqlValue for bool {
    fn required_type() -> RequiredType {
        RequiredType::Bool
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Bool)? {
            SqlValue::Bool(value) => Ok(value),
            value if value.is_integer() => Ok(value.as_i64() != Some(0)),
            value => Err(ConversionError::convert_type(&value, RequiredType::Bool)),
        }
    }
}

macro_rules! numeric_from_sql_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromSqlValue for $ty {
                fn required_type() -> RequiredType {
                    RequiredType::$variant
                }

                fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
                    let value = non_null(value, RequiredType::$variant)?;
                    match convert_value_to_required_type(value, RequiredType::$variant)? {
                        SqlValue::$variant(number) => Ok(number),
                        other => Err(ConversionError::convert_type(&other, RequiredType::$variant)),
                    }
                }
            }
        )*
    };
}

numeric_from_sql_value!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => BigInt,
    f32 => Real32,
    f64 => Real64,
    Decimal => Decimal,
);

impl FromSqlValue for Vec<u8> {
    fn required_type() -> RequiredType {
        RequiredType::Bytes
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Bytes)? {
            SqlValue::Bytes(bytes) | SqlValue::Blob(bytes) => Ok(bytes),
            SqlValue::String(text) | SqlValue::Clob(text) => Ok(text.into_bytes()),
            value => Err(ConversionError::convert_type(&value, RequiredType::Bytes)),
        }
    }
}

impl FromSqlValue for NaiveDate {
    fn required_type() -> RequiredType {
        RequiredType::Date
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Date)? {
            SqlValue::Date(date) => Ok(date),
            SqlValue::Timestamp(timestamp) => Ok(timestamp.date()),
            value => Err(ConversionError::convert_type(&value, RequiredType::Date)),
        }
    }
}

impl FromSqlValue for NaiveTime {
    fn required_type() -> RequiredType {
        RequiredType::Time
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Time)? {
            SqlValue::Time(time) => Ok(time),
            SqlValue::Timestamp(timestamp) => Ok(timestamp.time()),
            value => Err(ConversionError::convert_type(&value, RequiredType::Time)),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn required_type() -> RequiredType {
        RequiredType::Timestamp
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Timestamp)? {
            SqlValue::Timestamp(timestamp) => Ok(timestamp),
            SqlValue::Date(date) => Ok(date.and_time(NaiveTime::MIN)),
            SqlValue::Instant(instant) => Ok(instant.naive_utc()),
            SqlValue::Calendar(calendar) => Ok(calendar.naive_local()),
            value => Err(ConversionError::convert_type(&value, RequiredType::Timestamp)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn required_type() -> RequiredType {
        RequiredType::Timestamp
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ConversionError> {
        match non_null(value, RequiredType::Timestamp)? {
            SqlValue::Instant(instant) => Ok(instant),
            SqlValue::Calendar(calendar) => Ok(calendar.with_timezone(&Utc)),
            SqlValue::Timestamp(timestamp) => Ok(timestamp.and_utc()),
            value => Err(ConversionError::convert_type(&value, RequiredType::Timestamp)),
        }
    }
}

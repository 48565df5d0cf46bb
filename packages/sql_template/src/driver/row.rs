use std::{cell::Cell, sync::Arc};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::{DriverError, ResultMetadata, ResultRow};
use crate::{
    coercion::{ConversionError, RequiredType, convert_number_to_target, parse_number},
    value::SqlValue,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// One materialized result row.
///
/// Drivers that read a whole row at once (both drivers shipped with this
/// crate do) hand these out from their cursors.
#[derive(Debug)]
pub struct BufferedRow {
    metadata: Arc<ResultMetadata>,
    values: Vec<SqlValue>,
    last_was_null: Cell<bool>,
}

impl BufferedRow {
    #[must_use]
    pub const fn new(metadata: Arc<ResultMetadata>, values: Vec<SqlValue>) -> Self {
        Self {
            metadata,
            values,
            last_was_null: Cell::new(false),
        }
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    fn value(&self, index: usize) -> Result<&SqlValue, DriverError> {
        let value = self.values.get(index).ok_or_else(|| DriverError::Sql {
            sql_state: "07009".to_string(),
            code: 0,
            message: format!(
                "Invalid column index {index}: row has {} column(s)",
                self.values.len()
            ),
        })?;
        self.last_was_null.set(value.is_null());
        Ok(value)
    }

    /// Reads a numeric column as `target`, `None` on a SQL NULL.
    fn number(&self, index: usize, target: RequiredType) -> Result<Option<SqlValue>, DriverError> {
        let value = self.value(index)?;
        Ok(match value {
            SqlValue::Null => None,
            SqlValue::Bool(flag) => Some(convert_number_to_target(
                &SqlValue::Int8(i8::from(*flag)),
                target,
            )?),
            value if value.is_numeric() => Some(convert_number_to_target(value, target)?),
            SqlValue::String(text) | SqlValue::Clob(text) => Some(parse_number(text, target)?),
            value => return Err(ConversionError::convert_type(value, target).into()),
        })
    }
}

fn mismatch(value: &SqlValue, target: RequiredType) -> DriverError {
    ConversionError::convert_type(value, target).into()
}

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|value| value.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(text).map(|timestamp| timestamp.date()))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .or_else(|| parse_timestamp(text).map(|timestamp| timestamp.time()))
}

macro_rules! primitive_getter {
    ($name:ident, $ty:ty, $variant:ident) => {
        fn $name(&self, index: usize) -> Result<$ty, DriverError> {
            match self.number(index, RequiredType::$variant)? {
                None => Ok(<$ty>::default()),
                Some(SqlValue::$variant(number)) => Ok(number),
                Some(other) => Err(mismatch(&other, RequiredType::$variant)),
            }
        }
    };
}

impl ResultRow for BufferedRow {
    fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    fn get_object(&self, index: usize) -> Result<SqlValue, DriverError> {
        self.value(index).cloned()
    }

    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError> {
        Ok(match self.value(index)? {
            SqlValue::Null => None,
            SqlValue::String(text) | SqlValue::Clob(text) => Some(text.clone()),
            value => Some(value.to_string()),
        })
    }

    fn get_bool(&self, index: usize) -> Result<bool, DriverError> {
        match self.value(index)? {
            SqlValue::Null => Ok(false),
            SqlValue::Bool(flag) => Ok(*flag),
            SqlValue::Real32(number) => Ok(*number != 0.0),
            SqlValue::Real64(number) => Ok(*number != 0.0),
            SqlValue::Decimal(number) => Ok(!number.is_zero()),
            value if value.is_integer() => Ok(value.as_i64() != Some(0)),
            SqlValue::String(text) | SqlValue::Clob(text) => match text.trim() {
                "1" => Ok(true),
                "0" => Ok(false),
                text if text.eq_ignore_ascii_case("true") => Ok(true),
                text if text.eq_ignore_ascii_case("false") => Ok(false),
                _ => Err(mismatch(&SqlValue::String(text.clone()), RequiredType::Bool)),
            },
            value => Err(mismatch(value, RequiredType::Bool)),
        }
    }

    primitive_getter!(get_i8, i8, Int8);
    primitive_getter!(get_i16, i16, Int16);
    primitive_getter!(get_i32, i32, Int32);
    primitive_getter!(get_i64, i64, Int64);
    primitive_getter!(get_f32, f32, Real32);
    primitive_getter!(get_f64, f64, Real64);

    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>, DriverError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Bytes(bytes) | SqlValue::Blob(bytes) => Ok(Some(bytes.clone())),
            SqlValue::String(text) | SqlValue::Clob(text) => Ok(Some(text.as_bytes().to_vec())),
            value => Err(mismatch(value, RequiredType::Bytes)),
        }
    }

    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DriverError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Date(date) => Ok(Some(*date)),
            SqlValue::Timestamp(timestamp) => Ok(Some(timestamp.date())),
            SqlValue::Vendor(vendor) => Ok(Some(vendor.value.date())),
            SqlValue::Instant(instant) => Ok(Some(instant.naive_utc().date())),
            SqlValue::Calendar(calendar) => Ok(Some(calendar.naive_local().date())),
            value @ (SqlValue::String(text) | SqlValue::Clob(text)) => parse_date(text)
                .map(Some)
                .ok_or_else(|| mismatch(value, RequiredType::Date)),
            value => Err(mismatch(value, RequiredType::Date)),
        }
    }

    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DriverError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Time(time) => Ok(Some(*time)),
            SqlValue::Timestamp(timestamp) => Ok(Some(timestamp.time())),
            SqlValue::Vendor(vendor) => Ok(Some(vendor.value.time())),
            SqlValue::Instant(instant) => Ok(Some(instant.naive_utc().time())),
            SqlValue::Calendar(calendar) => Ok(Some(calendar.naive_local().time())),
            value @ (SqlValue::String(text) | SqlValue::Clob(text)) => parse_time(text)
                .map(Some)
                .ok_or_else(|| mismatch(value, RequiredType::Time)),
            value => Err(mismatch(value, RequiredType::Time)),
        }
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>, DriverError> {
        match self.value(index)? {
            SqlValue::Null => Ok(None),
            SqlValue::Timestamp(timestamp) => Ok(Some(*timestamp)),
            SqlValue::Date(date) => Ok(Some(date.and_time(NaiveTime::MIN))),
            SqlValue::Vendor(vendor) => Ok(Some(vendor.value)),
            SqlValue::Instant(instant) => Ok(Some(instant.naive_utc())),
            SqlValue::Calendar(calendar) => Ok(Some(calendar.naive_local())),
            value @ (SqlValue::String(text) | SqlValue::Clob(text)) => parse_timestamp(text)
                .map(Some)
                .ok_or_else(|| mismatch(value, RequiredType::Timestamp)),
            value => Err(mismatch(value, RequiredType::Timestamp)),
        }
    }

    fn get_decimal(&self, index: usize) -> Result<Option<Decimal>, DriverError> {
        match self.number(index, RequiredType::Decimal)? {
            None => Ok(None),
            Some(SqlValue::Decimal(number)) => Ok(Some(number)),
            Some(other) => Err(mismatch(&other, RequiredType::Decimal)),
        }
    }

    fn get_blob(&self, index: usize) -> Result<Option<Vec<u8>>, DriverError> {
        self.get_bytes(index)
    }

    fn get_clob(&self, index: usize) -> Result<Option<String>, DriverError> {
        self.get_string(index)
    }

    fn was_null(&self) -> bool {
        self.last_was_null.get()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::driver::ColumnMetadata;

    fn row(values: Vec<SqlValue>) -> BufferedRow {
        let columns = (0..values.len())
            .map(|i| ColumnMetadata::new(format!("c{i}")))
            .collect();
        BufferedRow::new(Arc::new(ResultMetadata::new(columns)), values)
    }

    #[test_log::test]
    fn primitive_getter_returns_zero_and_sets_was_null() {
        let row = row(vec![SqlValue::Null, SqlValue::Int64(3)]);

        assert_eq!(row.get_i32(0).unwrap(), 0);
        assert!(row.was_null());
        assert_eq!(row.get_i32(1).unwrap(), 3);
        assert!(!row.was_null());
    }

    #[test_log::test]
    fn narrowing_getter_rejects_out_of_range_values() {
        let row = row(vec![SqlValue::Int64(40000)]);

        assert!(matches!(
            row.get_i16(0),
            Err(DriverError::Conversion(ConversionError::Overflow { .. }))
        ));
    }

    #[test_log::test]
    fn text_temporals_are_parsed() {
        let row = row(vec![
            SqlValue::from("2009-04-24"),
            SqlValue::from("13:05:10.5"),
            SqlValue::from("2009-04-24 13:05:10"),
            SqlValue::from("2009-04-24T13:05:10"),
        ]);

        assert_eq!(row.get_date(0).unwrap(), NaiveDate::from_ymd_opt(2009, 4, 24));
        assert_eq!(
            row.get_time(1).unwrap(),
            NaiveTime::from_hms_milli_opt(13, 5, 10, 500)
        );
        let expected = NaiveDate::from_ymd_opt(2009, 4, 24)
            .unwrap()
            .and_hms_opt(13, 5, 10);
        assert_eq!(row.get_timestamp(2).unwrap(), expected);
        assert_eq!(row.get_timestamp(3).unwrap(), expected);
    }

    #[test_log::test]
    fn text_decimals_are_parsed() {
        let row = row(vec![SqlValue::from("12.50"), SqlValue::Real64(0.25)]);

        assert_eq!(row.get_decimal(0).unwrap(), Some(dec!(12.50)));
        assert_eq!(row.get_decimal(1).unwrap(), Some(dec!(0.25)));
    }

    #[test_log::test]
    fn bool_getter_accepts_integers_and_text() {
        let row = row(vec![SqlValue::Int64(1), SqlValue::from("false")]);

        assert!(row.get_bool(0).unwrap());
        assert!(!row.get_bool(1).unwrap());
    }

    #[test_log::test]
    fn invalid_column_index_is_reported() {
        let row = row(vec![SqlValue::Int64(1)]);

        assert!(matches!(row.get_object(1), Err(DriverError::Sql { .. })));
    }
}

//! Fetch side of the coercion kernel.

use chrono::NaiveTime;

use super::RequiredType;
use crate::{
    driver::{ColumnClass, ColumnMetadata, DriverError, ResultRow},
    value::SqlValue,
};

/// Reads the column at the 0-based `index` of the current row exactly once.
///
/// Without a required type (or with [`RequiredType::Any`]) the column is
/// fetched generically and normalized into a portable shape. Otherwise the
/// accessor matching the required type is used, and primitive accessors are
/// checked against `was_null` so a SQL NULL comes back as
/// [`SqlValue::Null`] instead of a zero value.
///
/// # Errors
///
/// * If the driver fails to read or convert the column
pub fn extract_value(
    row: &dyn ResultRow,
    index: usize,
    required: Option<RequiredType>,
) -> Result<SqlValue, DriverError> {
    let Some(required) = required else {
        return extract_generic(row, index);
    };

    let value: SqlValue = match required {
        RequiredType::String => row.get_string(index)?.into(),
        RequiredType::Bool => row.get_bool(index)?.into(),
        RequiredType::Int8 => row.get_i8(index)?.into(),
        RequiredType::Int16 => row.get_i16(index)?.into(),
        RequiredType::Int32 => row.get_i32(index)?.into(),
        RequiredType::Int64 => row.get_i64(index)?.into(),
        RequiredType::Real32 => row.get_f32(index)?.into(),
        RequiredType::Real64 | RequiredType::Number => row.get_f64(index)?.into(),
        RequiredType::Bytes => row.get_bytes(index)?.into(),
        RequiredType::Date => row.get_date(index)?.into(),
        RequiredType::Time => row.get_time(index)?.into(),
        RequiredType::Timestamp => row.get_timestamp(index)?.into(),
        RequiredType::Decimal => row.get_decimal(index)?.into(),
        RequiredType::Blob => row.get_blob(index)?.map_or(SqlValue::Null, SqlValue::Blob),
        RequiredType::Clob => row.get_clob(index)?.map_or(SqlValue::Null, SqlValue::Clob),
        RequiredType::BigInt | RequiredType::Any => return extract_generic(row, index),
    };

    if required.is_primitive() && row.was_null() {
        return Ok(SqlValue::Null);
    }

    Ok(value)
}

fn extract_generic(row: &dyn ResultRow, index: usize) -> Result<SqlValue, DriverError> {
    let value = row.get_object(index)?;
    Ok(normalize(value, row.metadata().column(index)))
}

/// Rewrites driver large-object and vendor shapes into portable ones.
fn normalize(value: SqlValue, column: Option<&ColumnMetadata>) -> SqlValue {
    let timestamp_class =
        column.is_some_and(|column| column.class == Some(ColumnClass::Timestamp));

    match value {
        SqlValue::Blob(bytes) => SqlValue::Bytes(bytes),
        SqlValue::Clob(text) => SqlValue::String(text),
        SqlValue::Vendor(vendor) => {
            if vendor.type_name == "TIMESTAMP" || vendor.type_name == "TIMESTAMPTZ" {
                SqlValue::Timestamp(vendor.value)
            } else if vendor.type_name.starts_with("DATE") {
                if timestamp_class {
                    SqlValue::Timestamp(vendor.value)
                } else {
                    SqlValue::Date(vendor.value.date())
                }
            } else {
                SqlValue::Vendor(vendor)
            }
        }
        SqlValue::Date(date) if timestamp_class => {
            SqlValue::Timestamp(date.and_time(NaiveTime::MIN))
        }
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        driver::{BufferedRow, ResultMetadata},
        value::VendorValue,
    };

    fn row(columns: Vec<ColumnMetadata>, values: Vec<SqlValue>) -> BufferedRow {
        BufferedRow::new(Arc::new(ResultMetadata::new(columns)), values)
    }

    fn timestamp() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 4, 24)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test_log::test]
    fn generic_fetch_normalizes_large_objects() {
        let row = row(
            vec![ColumnMetadata::new("b"), ColumnMetadata::new("c")],
            vec![SqlValue::Blob(vec![1, 2]), SqlValue::Clob("text".into())],
        );

        assert_eq!(extract_value(&row, 0, None).unwrap(), SqlValue::Bytes(vec![1, 2]));
        assert_eq!(
            extract_value(&row, 1, None).unwrap(),
            SqlValue::String("text".into())
        );
    }

    #[test_log::test]
    fn generic_fetch_normalizes_vendor_timestamps() {
        let row = row(
            vec![ColumnMetadata::new("ts")],
            vec![VendorValue::new("TIMESTAMPTZ", timestamp()).into()],
        );

        assert_eq!(
            extract_value(&row, 0, None).unwrap(),
            SqlValue::Timestamp(timestamp())
        );
    }

    #[test_log::test]
    fn vendor_date_is_routed_through_column_class() {
        let date_row = row(
            vec![ColumnMetadata::new("d")],
            vec![VendorValue::new("DATE", timestamp()).into()],
        );
        let timestamp_row = row(
            vec![ColumnMetadata::new("d").with_class(ColumnClass::Timestamp)],
            vec![VendorValue::new("DATE", timestamp()).into()],
        );

        assert_eq!(
            extract_value(&date_row, 0, None).unwrap(),
            SqlValue::Date(timestamp().date())
        );
        assert_eq!(
            extract_value(&timestamp_row, 0, None).unwrap(),
            SqlValue::Timestamp(timestamp())
        );
    }

    #[test_log::test]
    fn primitive_accessors_report_null_instead_of_zero() {
        let row = row(vec![ColumnMetadata::new("n")], vec![SqlValue::Null]);

        assert_eq!(
            extract_value(&row, 0, Some(RequiredType::Int32)).unwrap(),
            SqlValue::Null
        );
        assert_eq!(
            extract_value(&row, 0, Some(RequiredType::Bool)).unwrap(),
            SqlValue::Null
        );
    }

    #[test_log::test]
    fn typed_fetch_uses_matching_accessor() {
        let row = row(vec![ColumnMetadata::new("n")], vec![SqlValue::Int64(7)]);

        assert_eq!(
            extract_value(&row, 0, Some(RequiredType::Int16)).unwrap(),
            SqlValue::Int16(7)
        );
        assert_eq!(
            extract_value(&row, 0, Some(RequiredType::Number)).unwrap(),
            SqlValue::Real64(7.0)
        );
        assert_eq!(
            extract_value(&row, 0, Some(RequiredType::String)).unwrap(),
            SqlValue::String("7".into())
        );
    }
}

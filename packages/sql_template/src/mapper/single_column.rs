use std::marker::PhantomData;

use super::RowMapper;
use crate::{
    SqlTemplateError,
    coercion::{
        ConversionError, FromSqlValue, RequiredType, convert_value_to_required_type,
        extract_value,
    },
    driver::{DriverError, ResultMetadata, ResultRow},
};

/// Maps a single-column row to one value of `T`.
///
/// The column is fetched with the accessor for `T`'s required type and then
/// converted (stringified, widened, narrowed or parsed) if its shape still
/// does not match.
pub struct SingleColumnRowMapper<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for SingleColumnRowMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleColumnRowMapper").finish()
    }
}

impl<T> Default for SingleColumnRowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SingleColumnRowMapper<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

fn check_column_count(metadata: &ResultMetadata) -> Result<(), SqlTemplateError> {
    let actual = metadata.column_count();
    if actual != 1 {
        return Err(SqlTemplateError::IncorrectColumnCount {
            expected: 1,
            actual,
        });
    }
    Ok(())
}

impl<T: FromSqlValue> RowMapper<T> for SingleColumnRowMapper<T> {
    fn validate(&self, metadata: &ResultMetadata) -> Result<(), SqlTemplateError> {
        check_column_count(metadata)
    }

    fn map_row(&self, row: &dyn ResultRow, row_num: usize) -> Result<T, SqlTemplateError> {
        let metadata = row.metadata();
        check_column_count(metadata)?;

        let type_mismatch = |source: ConversionError| SqlTemplateError::TypeMismatch {
            row_num,
            column_type: metadata
                .column_type_name(0)
                .unwrap_or("unknown")
                .to_string(),
            source,
        };

        let required = T::required_type();
        let fetch_type = (required != RequiredType::Any).then_some(required);

        let value = extract_value(row, 0, fetch_type).map_err(|e| match e {
            DriverError::Conversion(source) => type_mismatch(source),
            e => e.into(),
        })?;

        let value = convert_value_to_required_type(value, required).map_err(type_mismatch)?;

        T::from_sql_value(value).map_err(type_mismatch)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        driver::{BufferedRow, ColumnMetadata},
        mapper::map_row,
        value::SqlValue,
    };

    fn row(values: Vec<SqlValue>) -> BufferedRow {
        let columns = (0..values.len())
            .map(|i| ColumnMetadata::new(format!("c{i}")).with_type_name("INTEGER"))
            .collect();
        BufferedRow::new(Arc::new(ResultMetadata::new(columns)), values)
    }

    #[test_log::test]
    fn two_columns_are_rejected() {
        let result = map_row(
            &row(vec![SqlValue::Int64(1), SqlValue::Int64(2)]),
            0,
            &SingleColumnRowMapper::<i64>::new(),
        );

        assert!(matches!(
            result,
            Err(SqlTemplateError::IncorrectColumnCount {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test_log::test]
    fn overflowing_value_is_a_type_mismatch() {
        let result = map_row(
            &row(vec![SqlValue::Int64(40000)]),
            3,
            &SingleColumnRowMapper::<i16>::new(),
        );

        let Err(SqlTemplateError::TypeMismatch {
            row_num,
            column_type,
            source,
        }) = result
        else {
            panic!("expected type mismatch, got {result:?}");
        };
        assert_eq!(row_num, 3);
        assert_eq!(column_type, "INTEGER");
        assert!(matches!(source, ConversionError::Overflow { .. }));
    }

    #[test_log::test]
    fn in_range_value_is_narrowed() {
        let value = map_row(
            &row(vec![SqlValue::Int64(30000)]),
            0,
            &SingleColumnRowMapper::<i16>::new(),
        )
        .unwrap();

        assert_eq!(value, 30000);
    }

    #[test_log::test]
    fn text_column_is_parsed_for_numeric_target() {
        let value = map_row(
            &row(vec![SqlValue::from("0x1A")]),
            0,
            &SingleColumnRowMapper::<i32>::new(),
        )
        .unwrap();

        assert_eq!(value, 26);
    }

    #[test_log::test]
    fn big_integer_target_applies_octal_rule() {
        let mapper = SingleColumnRowMapper::<i128>::new();

        assert_eq!(map_row(&row(vec!["017".into()]), 0, &mapper).unwrap(), 15);
        assert_eq!(map_row(&row(vec!["0500".into()]), 0, &mapper).unwrap(), 320);
    }

    #[test_log::test]
    fn numeric_column_is_stringified_for_text_target() {
        let value = map_row(
            &row(vec![SqlValue::Int64(12)]),
            0,
            &SingleColumnRowMapper::<String>::new(),
        )
        .unwrap();

        assert_eq!(value, "12");
    }

    #[test_log::test]
    fn null_maps_to_none() {
        let value = map_row(
            &row(vec![SqlValue::Null]),
            0,
            &SingleColumnRowMapper::<Option<i64>>::new(),
        )
        .unwrap();

        assert_eq!(value, None);
    }

    #[test_log::test]
    fn generic_target_returns_normalized_value() {
        let value = map_row(
            &row(vec![SqlValue::Clob("text".into())]),
            0,
            &SingleColumnRowMapper::<SqlValue>::new(),
        )
        .unwrap();

        assert_eq!(value, SqlValue::String("text".into()));
    }
}

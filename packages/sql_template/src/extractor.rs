//! Drives result cursors through row mappers and row callbacks.

use std::marker::PhantomData;

use crate::{
    SqlTemplateError,
    driver::{ResultCursor, ResultRow},
    mapper::RowMapper,
};

/// Consumes a whole result and produces one value from it.
pub trait ResultSetExtractor<T> {
    /// # Errors
    ///
    /// * If reading or mapping a row fails
    fn extract_data(&mut self, cursor: &mut dyn ResultCursor) -> Result<T, SqlTemplateError>;
}

impl<T, F> ResultSetExtractor<T> for F
where
    F: FnMut(&mut dyn ResultCursor) -> Result<T, SqlTemplateError>,
{
    fn extract_data(&mut self, cursor: &mut dyn ResultCursor) -> Result<T, SqlTemplateError> {
        self(cursor)
    }
}

/// Processes rows one at a time without collecting them.
pub trait RowCallbackHandler {
    /// # Errors
    ///
    /// * If processing the row fails
    fn process_row(&mut self, row: &dyn ResultRow) -> Result<(), SqlTemplateError>;
}

impl<F> RowCallbackHandler for F
where
    F: FnMut(&dyn ResultRow) -> Result<(), SqlTemplateError>,
{
    fn process_row(&mut self, row: &dyn ResultRow) -> Result<(), SqlTemplateError> {
        self(row)
    }
}

/// Maps every row with a [`RowMapper`] into a `Vec`.
pub struct RowMapperResultSetExtractor<M, T> {
    mapper: M,
    rows_expected: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

impl<M, T> RowMapperResultSetExtractor<M, T> {
    pub const fn new(mapper: M) -> Self {
        Self {
            mapper,
            rows_expected: None,
            _marker: PhantomData,
        }
    }

    /// Pre-sizes the output for `rows_expected` rows.
    pub const fn with_rows_expected(mapper: M, rows_expected: usize) -> Self {
        Self {
            mapper,
            rows_expected: Some(rows_expected),
            _marker: PhantomData,
        }
    }
}

impl<M: RowMapper<T>, T> ResultSetExtractor<Vec<T>> for RowMapperResultSetExtractor<M, T> {
    fn extract_data(&mut self, cursor: &mut dyn ResultCursor) -> Result<Vec<T>, SqlTemplateError> {
        extract_rows(cursor, &self.mapper, self.rows_expected)
    }
}

/// Feeds every row to a [`RowCallbackHandler`].
pub struct RowCallbackHandlerResultSetExtractor<'a, H: ?Sized> {
    handler: &'a mut H,
}

impl<'a, H: RowCallbackHandler + ?Sized> RowCallbackHandlerResultSetExtractor<'a, H> {
    pub const fn new(handler: &'a mut H) -> Self {
        Self { handler }
    }
}

impl<H: RowCallbackHandler + ?Sized> ResultSetExtractor<usize>
    for RowCallbackHandlerResultSetExtractor<'_, H>
{
    fn extract_data(&mut self, cursor: &mut dyn ResultCursor) -> Result<usize, SqlTemplateError> {
        process_rows(cursor, self.handler)
    }
}

fn log_row_count(count: usize) {
    log::trace!("Got {count} row{}", if count == 1 { "" } else { "s" });
}

/// Maps every remaining row of `cursor`, in cursor order.
///
/// The mapper validates the column layout before the first row is read.
///
/// # Errors
///
/// * If the mapper rejects the column layout
/// * If reading or mapping a row fails
pub fn extract_rows<T, M>(
    cursor: &mut dyn ResultCursor,
    mapper: &M,
    rows_expected: Option<usize>,
) -> Result<Vec<T>, SqlTemplateError>
where
    M: RowMapper<T> + ?Sized,
{
    mapper.validate(cursor.metadata())?;

    let mut results = rows_expected.map_or_else(Vec::new, Vec::with_capacity);
    let mut row_num = 0;

    while cursor.next()? {
        results.push(mapper.map_row(cursor.row()?, row_num)?);
        row_num += 1;
    }

    log_row_count(results.len());

    Ok(results)
}

/// Maps the result and requires exactly one row.
///
/// # Errors
///
/// * [`SqlTemplateError::EmptyResult`] if there are no rows
/// * [`SqlTemplateError::IncorrectResultSize`] if there is more than one row
/// * If reading or mapping a row fails
pub fn extract_single<T, M>(cursor: &mut dyn ResultCursor, mapper: &M) -> Result<T, SqlTemplateError>
where
    M: RowMapper<T> + ?Sized,
{
    required_single_result(extract_rows(cursor, mapper, Some(1))?)
}

/// # Errors
///
/// * [`SqlTemplateError::EmptyResult`] if `results` is empty
/// * [`SqlTemplateError::IncorrectResultSize`] if `results` has more than one
///   element
pub fn required_single_result<T>(mut results: Vec<T>) -> Result<T, SqlTemplateError> {
    match results.len() {
        0 => Err(SqlTemplateError::EmptyResult),
        1 => results.pop().ok_or(SqlTemplateError::EmptyResult),
        actual => Err(SqlTemplateError::IncorrectResultSize {
            expected: 1,
            actual,
        }),
    }
}

/// Hands every remaining row to `handler`. Returns the number of rows seen.
///
/// # Errors
///
/// * If reading a row fails or the handler fails
pub fn process_rows<H>(cursor: &mut dyn ResultCursor, handler: &mut H) -> Result<usize, SqlTemplateError>
where
    H: RowCallbackHandler + ?Sized,
{
    let mut count = 0;

    while cursor.next()? {
        handler.process_row(cursor.row()?)?;
        count += 1;
    }

    log_row_count(count);

    Ok(count)
}

#[cfg(all(test, feature = "simulator"))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        coercion::FromSqlValue as _,
        driver::{Connection as _, DataSource as _},
        mapper::{ColumnMapRowMapper, SingleColumnRowMapper},
        simulator::{SimulatedResult, SimulationDataSource},
        value::SqlValue,
    };

    fn with_cursor<T>(
        result: SimulatedResult,
        f: impl FnOnce(&mut dyn ResultCursor) -> Result<T, SqlTemplateError>,
    ) -> (Result<T, SqlTemplateError>, SimulationDataSource) {
        let source = SimulationDataSource::new();
        source.push_result("select", result);
        let outcome = (|| -> Result<T, SqlTemplateError> {
            let connection = source.connection()?;
            let mut statement = connection.prepare("select")?;
            let mut cursor = statement.execute_query()?;
            f(cursor.as_mut())
        })();
        (outcome, source)
    }

    #[test_log::test]
    fn extracts_rows_in_cursor_order() {
        let (result, _) = with_cursor(
            SimulatedResult::rows(&["n"], vec![vec![3.into()], vec![1.into()], vec![2.into()]]),
            |cursor| extract_rows(cursor, &SingleColumnRowMapper::<i64>::new(), None),
        );

        assert_eq!(result.unwrap(), vec![3, 1, 2]);
    }

    #[test_log::test]
    fn two_column_scalar_mapping_fails_even_without_rows() {
        let (result, _) = with_cursor(SimulatedResult::rows(&["a", "b"], vec![]), |cursor| {
            extract_rows(cursor, &SingleColumnRowMapper::<i64>::new(), None)
        });

        assert!(matches!(
            result,
            Err(SqlTemplateError::IncorrectColumnCount {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test_log::test]
    fn single_result_rejects_empty_result() {
        let (result, _) = with_cursor(SimulatedResult::rows(&["n"], vec![]), |cursor| {
            extract_single(cursor, &SingleColumnRowMapper::<i64>::new())
        });

        assert!(matches!(result, Err(SqlTemplateError::EmptyResult)));
        assert!(result.unwrap_err().is_cardinality_error());
    }

    #[test_log::test]
    fn single_result_rejects_multiple_rows() {
        let (result, _) = with_cursor(
            SimulatedResult::rows(&["n"], vec![vec![1.into()], vec![2.into()]]),
            |cursor| extract_single(cursor, &SingleColumnRowMapper::<i64>::new()),
        );

        assert!(matches!(
            result,
            Err(SqlTemplateError::IncorrectResultSize {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test_log::test]
    fn row_callback_sees_every_row_without_collecting() {
        let mut seen = vec![];
        let (result, _) = with_cursor(
            SimulatedResult::rows(&["n"], vec![vec![1.into()], vec![2.into()]]),
            |cursor| {
                process_rows(cursor, &mut |row: &dyn ResultRow| -> Result<(), SqlTemplateError> {
                    seen.push(i64::from_sql_value(row.get_object(0)?)?);
                    Ok(())
                })
            },
        );

        assert_eq!(result.unwrap(), 2);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test_log::test]
    fn mapping_error_mid_iteration_still_releases_cursor() {
        let (result, source) = with_cursor(
            SimulatedResult::rows(
                &["n"],
                vec![vec![1.into()], vec![SqlValue::from("x")], vec![3.into()]],
            ),
            |cursor| extract_rows(cursor, &SingleColumnRowMapper::<i64>::new(), None),
        );

        assert!(matches!(result, Err(SqlTemplateError::TypeMismatch { row_num: 1, .. })));
        assert_eq!(source.released_cursors(), 1);
        assert_eq!(source.released_statements(), 1);
        assert_eq!(source.released_connections(), 1);
    }

    #[test_log::test]
    fn column_map_extraction_keeps_labels() {
        let (result, _) = with_cursor(
            SimulatedResult::rows(&["id", "name"], vec![vec![1.into(), "a".into()]]),
            |cursor| extract_rows(cursor, &ColumnMapRowMapper, None),
        );

        let maps = result.unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].get("NAME"), Some(&SqlValue::from("a")));
    }
}

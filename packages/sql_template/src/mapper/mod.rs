//! Row mapping strategies: one result row in, one value out.

use crate::{
    SqlTemplateError,
    driver::{ResultMetadata, ResultRow},
};

pub mod column_map;
pub mod record;
pub mod single_column;

pub use column_map::{ColumnMap, ColumnMapRowMapper};
pub use record::{FieldDescriptor, FieldTable, RecordRowMapper, RowRecord, underscore_name};
pub use single_column::SingleColumnRowMapper;

pub trait RowMapper<T> {
    /// Checks the result's column layout once, before any row is mapped.
    ///
    /// # Errors
    ///
    /// * If the layout cannot be mapped by this strategy
    fn validate(&self, _metadata: &ResultMetadata) -> Result<(), SqlTemplateError> {
        Ok(())
    }

    /// Maps the current row. `row_num` is 0-based.
    ///
    /// # Errors
    ///
    /// * If a column cannot be read or converted
    fn map_row(&self, row: &dyn ResultRow, row_num: usize) -> Result<T, SqlTemplateError>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&dyn ResultRow, usize) -> Result<T, SqlTemplateError>,
{
    fn map_row(&self, row: &dyn ResultRow, row_num: usize) -> Result<T, SqlTemplateError> {
        self(row, row_num)
    }
}

/// Validates and maps a single row outside of any extractor.
///
/// # Errors
///
/// * If the strategy rejects the row layout or fails to map the row
pub fn map_row<T, M>(row: &dyn ResultRow, row_num: usize, mapper: &M) -> Result<T, SqlTemplateError>
where
    M: RowMapper<T> + ?Sized,
{
    mapper.validate(row.metadata())?;
    mapper.map_row(row, row_num)
}

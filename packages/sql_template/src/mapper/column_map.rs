use super::RowMapper;
use crate::{
    SqlTemplateError,
    coercion::{ConversionError, FromSqlValue, extract_value},
    driver::ResultRow,
    value::SqlValue,
};

/// Ordered column name to value mapping for one row.
///
/// Lookups ignore case. Inserting a name that already exists (ignoring case)
/// replaces the value in place, keeping the original position and spelling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    pub columns: Vec<(String, SqlValue)>,
}

impl ColumnMap {
    #[must_use]
    pub const fn new() -> Self {
        Self { columns: vec![] }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, column_name: impl Into<String>, value: SqlValue) {
        let column_name = column_name.into();
        if let Some(existing) = self
            .columns
            .iter_mut()
            .find(|c| c.0.eq_ignore_ascii_case(&column_name))
        {
            existing.1 = value;
        } else {
            self.columns.push((column_name, value));
        }
    }

    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|c| c.0.eq_ignore_ascii_case(column_name))
            .map(|c| &c.1)
    }

    /// Converts the named column into `T`. `Ok(None)` if the column is absent.
    ///
    /// # Errors
    ///
    /// * If the column's value cannot be converted into `T`
    pub fn get_as<T: FromSqlValue>(&self, column_name: &str) -> Result<Option<T>, ConversionError> {
        self.get(column_name)
            .cloned()
            .map(T::from_sql_value)
            .transpose()
    }

    #[must_use]
    pub fn id(&self) -> Option<&SqlValue> {
        self.get("id")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.0.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|c| (c.0.as_str(), &c.1))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for ColumnMap {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Maps each row to a [`ColumnMap`] keyed by column label.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnMapRowMapper;

impl RowMapper<ColumnMap> for ColumnMapRowMapper {
    fn map_row(&self, row: &dyn ResultRow, _row_num: usize) -> Result<ColumnMap, SqlTemplateError> {
        let metadata = row.metadata();
        let count = metadata.column_count();
        let mut map = ColumnMap::with_capacity(count);

        for index in 0..count {
            let key = metadata.lookup_column_name(index).unwrap_or_default();
            let value = extract_value(row, index, None)?;
            map.insert(key, value);
        }

        Ok(map)
    }
}

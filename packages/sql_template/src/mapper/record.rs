//! Structured-record mapping.
//!
//! A record type describes its settable fields once through [`RowRecord`]
//! (usually generated by `#[derive(RowRecord)]`). The resulting
//! [`FieldTable`] resolves column labels by lower-cased property name and by
//! the underscored alias of that name, so `LAST_IP` and `lastip` both reach
//! the `lastIp` property.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use super::RowMapper;
use crate::{
    SqlTemplateError,
    coercion::{ConversionError, FromSqlValue, RequiredType, extract_value},
    driver::{DriverError, ResultRow},
    value::SqlValue,
};

pub type FieldSetter<T> = fn(&mut T, SqlValue) -> Result<(), ConversionError>;

/// One settable property of a record type.
pub struct FieldDescriptor<T> {
    name: &'static str,
    required_type: RequiredType,
    set: FieldSetter<T>,
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldDescriptor<T> {}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("required_type", &self.required_type)
            .finish_non_exhaustive()
    }
}

impl<T> FieldDescriptor<T> {
    #[must_use]
    pub const fn new(name: &'static str, required_type: RequiredType, set: FieldSetter<T>) -> Self {
        Self {
            name,
            required_type,
            set,
        }
    }

    /// Descriptor for a field of type `V`, fetched with `V`'s required type.
    #[must_use]
    pub fn of<V: FromSqlValue>(name: &'static str, set: FieldSetter<T>) -> Self {
        Self::new(name, V::required_type(), set)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn required_type(&self) -> RequiredType {
        self.required_type
    }

    /// # Errors
    ///
    /// * If `value` cannot be converted into the field's type
    pub fn assign(&self, record: &mut T, value: SqlValue) -> Result<(), ConversionError> {
        (self.set)(record, value)
    }
}

/// A record type that rows can be mapped into.
pub trait RowRecord: Sized + 'static {
    fn new_record() -> Self;

    fn fields() -> Vec<FieldDescriptor<Self>>;
}

/// `lastLoginTime` becomes `last_login_time`.
#[must_use]
pub fn underscore_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut chars = name.chars();

    if let Some(first) = chars.next() {
        result.extend(first.to_lowercase());
    }
    for c in chars {
        if c.is_uppercase() {
            result.push('_');
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }

    result
}

/// Column-alias lookup table for one record type.
#[derive(Debug)]
pub struct FieldTable<T> {
    fields: Vec<FieldDescriptor<T>>,
    by_alias: HashMap<String, usize>,
}

type TableCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

static FIELD_TABLES: LazyLock<TableCache> = LazyLock::new(|| RwLock::new(HashMap::new()));

impl<T> FieldTable<T> {
    #[must_use]
    pub fn new(fields: Vec<FieldDescriptor<T>>) -> Self {
        let mut by_alias = HashMap::with_capacity(fields.len() * 2);

        for (i, field) in fields.iter().enumerate() {
            let lower = field.name.to_lowercase();
            let underscored = underscore_name(field.name);
            if underscored != lower {
                by_alias.insert(underscored, i);
            }
            by_alias.insert(lower, i);
        }

        Self { fields, by_alias }
    }

    /// Field for an already lower-cased column label.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldDescriptor<T>> {
        self.by_alias.get(column).map(|i| &self.fields[*i])
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }
}

impl<T: RowRecord> FieldTable<T> {
    /// The process-wide table for `T`, built on first use.
    #[must_use]
    pub fn for_type() -> Arc<Self> {
        let key = TypeId::of::<T>();

        let cached = FIELD_TABLES
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(table) = cached.and_then(|table| table.downcast::<Self>().ok()) {
            return table;
        }

        let mut tables = FIELD_TABLES.write().unwrap_or_else(PoisonError::into_inner);
        let entry = tables
            .entry(key)
            .or_insert_with(|| -> Arc<dyn Any + Send + Sync> { Arc::new(Self::new(T::fields())) });

        Arc::clone(entry)
            .downcast::<Self>()
            .unwrap_or_else(|_| Arc::new(Self::new(T::fields())))
    }
}

/// Maps each row into a new `T`, column by column.
///
/// Columns without a matching field are ignored.
pub struct RecordRowMapper<T> {
    table: Arc<FieldTable<T>>,
}

impl<T> fmt::Debug for RecordRowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRowMapper")
            .field("fields", &self.table.fields)
            .finish()
    }
}

impl<T: RowRecord> Default for RecordRowMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RowRecord> RecordRowMapper<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: FieldTable::for_type(),
        }
    }
}

impl<T: RowRecord> RowMapper<T> for RecordRowMapper<T> {
    fn map_row(&self, row: &dyn ResultRow, row_num: usize) -> Result<T, SqlTemplateError> {
        let mut record = T::new_record();
        let metadata = row.metadata();

        for index in 0..metadata.column_count() {
            let column = metadata
                .lookup_column_name(index)
                .unwrap_or_default()
                .to_lowercase();
            let Some(field) = self.table.get(&column) else {
                continue;
            };

            let mapping_error = |source: ConversionError| SqlTemplateError::RecordMapping {
                column: column.clone(),
                field: field.name().to_string(),
                source,
            };

            let required = field.required_type();
            let fetch_type = (required != RequiredType::Any).then_some(required);
            let value = extract_value(row, index, fetch_type).map_err(|e| match e {
                DriverError::Conversion(source) => mapping_error(source),
                e => e.into(),
            })?;

            if row_num == 0 {
                log::debug!(
                    "Mapping column '{column}' to property '{}' of type {required}",
                    field.name()
                );
            }

            field.assign(&mut record, value).map_err(mapping_error)?;
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::driver::{BufferedRow, ColumnMetadata, ResultMetadata};

    #[derive(Debug, Default, PartialEq)]
    struct Admin {
        id: i64,
        username: String,
        last_ip: Option<String>,
        login_count: i16,
    }

    impl RowRecord for Admin {
        fn new_record() -> Self {
            Self::default()
        }

        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                FieldDescriptor::of::<i64>("id", |record, value| {
                    record.id = i64::from_sql_value(value)?;
                    Ok(())
                }),
                FieldDescriptor::of::<String>("username", |record, value| {
                    record.username = String::from_sql_value(value)?;
                    Ok(())
                }),
                FieldDescriptor::of::<Option<String>>("lastIp", |record, value| {
                    record.last_ip = Option::from_sql_value(value)?;
                    Ok(())
                }),
                FieldDescriptor::of::<i16>("loginCount", |record, value| {
                    record.login_count = i16::from_sql_value(value)?;
                    Ok(())
                }),
            ]
        }
    }

    fn row(labels: &[&str], values: Vec<SqlValue>) -> BufferedRow {
        BufferedRow::new(
            Arc::new(ResultMetadata::new(
                labels.iter().map(|label| ColumnMetadata::new(*label)).collect(),
            )),
            values,
        )
    }

    #[test_log::test]
    fn underscore_name_inserts_underscore_before_uppercase() {
        assert_eq!(underscore_name("lastLoginTime"), "last_login_time");
        assert_eq!(underscore_name("LastIp"), "last_ip");
        assert_eq!(underscore_name("id"), "id");
        assert_eq!(underscore_name("ip4Address"), "ip4_address");
    }

    #[test_log::test]
    fn field_table_resolves_both_aliases_to_the_same_field() {
        let table = FieldTable::<Admin>::for_type();

        assert_eq!(table.get("lastip").map(FieldDescriptor::name), Some("lastIp"));
        assert_eq!(table.get("last_ip").map(FieldDescriptor::name), Some("lastIp"));
        assert_eq!(table.get("id").map(FieldDescriptor::name), Some("id"));
        assert!(table.get("lastIp").is_none());
    }

    #[test_log::test]
    fn field_table_is_built_once_per_type() {
        let first = FieldTable::<Admin>::for_type();
        let second = FieldTable::<Admin>::for_type();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test_log::test]
    fn maps_columns_case_and_underscore_insensitively() {
        let mapper = RecordRowMapper::<Admin>::new();

        let upper = mapper
            .map_row(
                &row(
                    &["ID", "USERNAME", "LAST_IP", "unmapped"],
                    vec![1.into(), "root".into(), "10.0.0.1".into(), 5.into()],
                ),
                0,
            )
            .unwrap();
        let lower = mapper
            .map_row(
                &row(&["id", "lastip"], vec![2.into(), "10.0.0.2".into()]),
                1,
            )
            .unwrap();

        assert_eq!(
            upper,
            Admin {
                id: 1,
                username: "root".to_string(),
                last_ip: Some("10.0.0.1".to_string()),
                login_count: 0,
            }
        );
        assert_eq!(lower.last_ip.as_deref(), Some("10.0.0.2"));
    }

    #[test_log::test]
    fn failed_assignment_names_column_and_field() {
        let mapper = RecordRowMapper::<Admin>::new();

        let result = mapper.map_row(&row(&["login_count"], vec![40000.into()]), 0);

        let Err(SqlTemplateError::RecordMapping { column, field, .. }) = result else {
            panic!("expected record mapping error, got {result:?}");
        };
        assert_eq!(column, "login_count");
        assert_eq!(field, "loginCount");
    }
}

//! Driver capability contract.
//!
//! Everything the template needs from a database driver: connections,
//! prepared statements with positional binds, forward-only result cursors
//! and typed column accessors. Resources are owned boxes and are released
//! when dropped.

use std::{fmt::Debug, time::Duration};

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{coercion::ConversionError, types::SqlType, value::SqlValue};

pub mod row;

pub use row::BufferedRow;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("SQL error [{sql_state}] (vendor code {code}): {message}")]
    Sql {
        sql_state: String,
        code: i32,
        message: String,
    },
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Resource is not positioned on a row or was already released")]
    Closed,
    #[error("Connection busy: {0}")]
    Busy(String),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[cfg(feature = "sqlite-rusqlite")]
    #[error(transparent)]
    Rusqlite(#[from] ::rusqlite::Error),
}

/// What a connection reports about the database and driver behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverMetadata {
    pub product_name: String,
    pub driver_name: String,
    pub supports_batch_updates: bool,
}

impl DriverMetadata {
    #[must_use]
    pub fn new(product_name: impl Into<String>, driver_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            driver_name: driver_name.into(),
            supports_batch_updates: false,
        }
    }

    #[must_use]
    pub const fn with_batch_updates(mut self, supports_batch_updates: bool) -> Self {
        self.supports_batch_updates = supports_batch_updates;
        self
    }
}

/// A non-fatal diagnostic attached to a statement by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlWarning {
    pub sql_state: Option<String>,
    pub code: i32,
    pub message: String,
}

impl SqlWarning {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sql_state: None,
            code: 0,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    #[must_use]
    pub const fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }
}

/// The driver's own classification of a column's runtime representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnClass {
    Date,
    Timestamp,
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMetadata {
    pub label: String,
    pub name: String,
    pub type_name: Option<String>,
    pub class: Option<ColumnClass>,
}

impl ColumnMetadata {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            name: label.clone(),
            label,
            type_name: None,
            class: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: ColumnClass) -> Self {
        self.class = Some(class);
        self
    }
}

/// Column layout of one result, fixed for the lifetime of the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMetadata {
    columns: Vec<ColumnMetadata>,
}

impl ResultMetadata {
    #[must_use]
    pub const fn new(columns: Vec<ColumnMetadata>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnMetadata> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Display label of the column at `index`, falling back to the underlying
    /// column name when the label is empty.
    #[must_use]
    pub fn lookup_column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|column| {
            if column.label.is_empty() {
                column.name.as_str()
            } else {
                column.label.as_str()
            }
        })
    }

    #[must_use]
    pub fn column_type_name(&self, index: usize) -> Option<&str> {
        self.columns
            .get(index)
            .and_then(|column| column.type_name.as_deref())
    }
}

pub trait DataSource: Send + Sync + Debug {
    /// # Errors
    ///
    /// * If a connection could not be acquired
    fn connection(&self) -> Result<Box<dyn Connection + '_>, DriverError>;
}

pub trait Connection {
    /// # Errors
    ///
    /// * If the driver cannot describe itself
    fn metadata(&self) -> Result<DriverMetadata, DriverError>;

    /// # Errors
    ///
    /// * If the driver fails to prepare the statement
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement + '_>, DriverError>;

    /// Executes each statement in order, returning the affected row counts.
    ///
    /// # Errors
    ///
    /// * If any statement fails to prepare or execute
    fn execute_batch(&self, statements: &[&str]) -> Result<Vec<u64>, DriverError> {
        let mut counts = Vec::with_capacity(statements.len());
        for sql in statements {
            let mut statement = self.prepare(sql)?;
            counts.push(statement.execute_update()?);
        }
        Ok(counts)
    }
}

/// A prepared statement with 1-based bind positions.
///
/// `zone` on the temporal binds carries the caller's calendar context; the
/// value itself is the wall-clock reading in that zone.
pub trait PreparedStatement {
    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_null(
        &mut self,
        index: usize,
        sql_type: SqlType,
        type_name: Option<&str>,
    ) -> Result<(), DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_string(&mut self, index: usize, value: &str) -> Result<(), DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_decimal(&mut self, index: usize, value: Decimal) -> Result<(), DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_date(
        &mut self,
        index: usize,
        value: NaiveDate,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_time(
        &mut self,
        index: usize,
        value: NaiveTime,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_timestamp(
        &mut self,
        index: usize,
        value: NaiveDateTime,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError>;

    /// Generic bind. `sql_type` of `None` lets the driver infer the type.
    ///
    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_object(
        &mut self,
        index: usize,
        value: &SqlValue,
        sql_type: Option<SqlType>,
        scale: Option<u32>,
    ) -> Result<(), DriverError>;

    /// Number of columns the statement produces when executed as a query.
    fn result_column_count(&self) -> usize;

    /// # Errors
    ///
    /// * If the statement fails to execute
    fn execute_query(&mut self) -> Result<Box<dyn ResultCursor + '_>, DriverError>;

    /// # Errors
    ///
    /// * If the statement fails to execute
    fn execute_update(&mut self) -> Result<u64, DriverError>;

    /// # Errors
    ///
    /// * If the driver rejects the setting
    fn set_fetch_size(&mut self, _rows: usize) -> Result<(), DriverError> {
        Ok(())
    }

    /// # Errors
    ///
    /// * If the driver rejects the setting
    fn set_max_rows(&mut self, _rows: usize) -> Result<(), DriverError> {
        Ok(())
    }

    /// # Errors
    ///
    /// * If the driver rejects the setting
    fn set_query_timeout(&mut self, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    fn warnings(&self) -> Vec<SqlWarning> {
        vec![]
    }
}

/// Forward-only, single-pass cursor.
pub trait ResultCursor {
    fn metadata(&self) -> &ResultMetadata;

    /// Advances to the next row. Returns `false` once the rows are exhausted.
    ///
    /// # Errors
    ///
    /// * If the driver fails to read the next row
    fn next(&mut self) -> Result<bool, DriverError>;

    /// # Errors
    ///
    /// * [`DriverError::Closed`] if the cursor is not positioned on a row
    fn row(&self) -> Result<&dyn ResultRow, DriverError>;
}

/// Column accessors for the current row. Column indices are 0-based.
///
/// Primitive accessors return the zero value on a SQL NULL; `was_null`
/// reports whether the most recent read hit a NULL.
pub trait ResultRow {
    fn metadata(&self) -> &ResultMetadata;

    /// # Errors
    ///
    /// * If the column index is out of range
    fn get_object(&self, index: usize) -> Result<SqlValue, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not text-like
    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not boolean-like
    fn get_bool(&self, index: usize) -> Result<bool, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value does not fit
    fn get_i8(&self, index: usize) -> Result<i8, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value does not fit
    fn get_i16(&self, index: usize) -> Result<i16, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value does not fit
    fn get_i32(&self, index: usize) -> Result<i32, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value does not fit
    fn get_i64(&self, index: usize) -> Result<i64, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not numeric
    fn get_f32(&self, index: usize) -> Result<f32, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not numeric
    fn get_f64(&self, index: usize) -> Result<f64, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not binary
    fn get_bytes(&self, index: usize) -> Result<Option<Vec<u8>>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not a date
    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not a time
    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not a timestamp
    fn get_timestamp(&self, index: usize) -> Result<Option<NaiveDateTime>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not numeric
    fn get_decimal(&self, index: usize) -> Result<Option<Decimal>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not binary
    fn get_blob(&self, index: usize) -> Result<Option<Vec<u8>>, DriverError>;

    /// # Errors
    ///
    /// * If the column index is out of range or the value is not text-like
    fn get_clob(&self, index: usize) -> Result<Option<String>, DriverError>;

    fn was_null(&self) -> bool;
}

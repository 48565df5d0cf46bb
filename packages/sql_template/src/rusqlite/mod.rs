//! `SQLite` driver backed by a single `rusqlite` connection.
//!
//! Text, decimal and temporal values are stored as TEXT. Columns declared
//! `DATE`, `TIMESTAMP` or `DATETIME` are read back as the matching temporal
//! value when their text parses.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
    thread::{self, ThreadId},
};

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use ::rusqlite::{
    ToSql,
    types::{Null, ValueRef},
};
use rust_decimal::Decimal;

use crate::{
    driver::{
        BufferedRow, ColumnClass, ColumnMetadata, Connection, DataSource, DriverError,
        DriverMetadata, PreparedStatement, ResultCursor, ResultMetadata, ResultRow,
        row::{parse_date, parse_timestamp},
    },
    types::SqlType,
    value::SqlValue,
};

/// One shared `SQLite` connection.
///
/// Other threads wait for the connection while it is in use. Asking for it
/// again from the thread that already holds it (for example from a row
/// callback) fails with [`DriverError::Busy`] instead of blocking forever.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct RusqliteDataSource {
    connection: Mutex<::rusqlite::Connection>,
    holder: Mutex<Option<ThreadId>>,
}

impl RusqliteDataSource {
    #[must_use]
    pub const fn new(connection: ::rusqlite::Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
            holder: Mutex::new(None),
        }
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ::rusqlite::Connection>, DriverError> {
        let guard = match self.connection.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                if *self.holder() == Some(thread::current().id()) {
                    return Err(DriverError::Busy(
                        "SQLite connection is already in use by this thread".to_string(),
                    ));
                }
                log::trace!("Waiting for the SQLite connection");
                self.connection
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
            }
        };

        *self.holder() = Some(thread::current().id());

        Ok(guard)
    }

    /// # Errors
    ///
    /// * If the database file could not be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        Ok(Self::new(::rusqlite::Connection::open(path)?))
    }

    /// # Errors
    ///
    /// * If the in-memory database could not be created
    pub fn open_in_memory() -> Result<Self, DriverError> {
        Ok(Self::new(::rusqlite::Connection::open_in_memory()?))
    }
}

impl DataSource for RusqliteDataSource {
    fn connection(&self) -> Result<Box<dyn Connection + '_>, DriverError> {
        Ok(Box::new(RusqliteConnection {
            connection: self.lock()?,
            source: self,
        }))
    }
}

struct RusqliteConnection<'a> {
    connection: MutexGuard<'a, ::rusqlite::Connection>,
    source: &'a RusqliteDataSource,
}

impl Drop for RusqliteConnection<'_> {
    fn drop(&mut self) {
        // cleared while the connection guard is still held
        *self.source.holder() = None;
    }
}

impl Connection for RusqliteConnection<'_> {
    fn metadata(&self) -> Result<DriverMetadata, DriverError> {
        Ok(DriverMetadata::new("SQLite", "rusqlite"))
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement + '_>, DriverError> {
        Ok(Box::new(RusqliteStatement {
            statement: self.connection.prepare(sql)?,
            max_rows: None,
        }))
    }
}

struct RusqliteStatement<'conn> {
    statement: ::rusqlite::Statement<'conn>,
    max_rows: Option<usize>,
}

impl RusqliteStatement<'_> {
    fn bind<T: ToSql>(&mut self, index: usize, value: T) -> Result<(), DriverError> {
        self.statement.raw_bind_parameter(index, value)?;
        Ok(())
    }

    fn bind_value(
        &mut self,
        index: usize,
        value: &SqlValue,
        scale: Option<u32>,
    ) -> Result<(), DriverError> {
        match value {
            SqlValue::Null => self.bind(index, Null),
            SqlValue::String(text) | SqlValue::Clob(text) => self.bind(index, text),
            SqlValue::Bool(flag) => self.bind(index, i64::from(*flag)),
            SqlValue::Int8(number) => self.bind(index, i64::from(*number)),
            SqlValue::Int16(number) => self.bind(index, i64::from(*number)),
            SqlValue::Int32(number) => self.bind(index, i64::from(*number)),
            SqlValue::Int64(number) => self.bind(index, *number),
            SqlValue::BigInt(number) => match i64::try_from(*number) {
                Ok(number) => self.bind(index, number),
                Err(_) => self.bind(index, number.to_string()),
            },
            SqlValue::Real32(number) => self.bind(index, f64::from(*number)),
            SqlValue::Real64(number) => self.bind(index, *number),
            SqlValue::Decimal(number) => {
                let number = scale.map_or(*number, |scale| number.round_dp(scale));
                self.bind(index, number.to_string())
            }
            SqlValue::Bytes(bytes) | SqlValue::Blob(bytes) => self.bind(index, bytes),
            SqlValue::Date(_)
            | SqlValue::Time(_)
            | SqlValue::Timestamp(_)
            | SqlValue::Instant(_)
            | SqlValue::Calendar(_)
            | SqlValue::Vendor(_) => self.bind(index, value.to_string()),
            SqlValue::List(_) | SqlValue::Tuple(_) => Err(DriverError::Unsupported(format!(
                "Cannot bind a {} value at index {index}",
                value.type_label()
            ))),
        }
    }
}

impl PreparedStatement for RusqliteStatement<'_> {
    fn set_null(
        &mut self,
        index: usize,
        _sql_type: SqlType,
        _type_name: Option<&str>,
    ) -> Result<(), DriverError> {
        self.bind(index, Null)
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<(), DriverError> {
        self.bind(index, value)
    }

    fn set_decimal(&mut self, index: usize, value: Decimal) -> Result<(), DriverError> {
        self.bind(index, value.to_string())
    }

    fn set_date(
        &mut self,
        index: usize,
        value: NaiveDate,
        _zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.bind(index, value.format("%Y-%m-%d").to_string())
    }

    fn set_time(
        &mut self,
        index: usize,
        value: NaiveTime,
        _zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.bind(index, value.format("%H:%M:%S%.f").to_string())
    }

    fn set_timestamp(
        &mut self,
        index: usize,
        value: NaiveDateTime,
        _zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.bind(index, value.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }

    fn set_object(
        &mut self,
        index: usize,
        value: &SqlValue,
        _sql_type: Option<SqlType>,
        scale: Option<u32>,
    ) -> Result<(), DriverError> {
        self.bind_value(index, value, scale)
    }

    fn result_column_count(&self) -> usize {
        self.statement.column_count()
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultCursor + '_>, DriverError> {
        let metadata = Arc::new(result_metadata(&self.statement));
        let remaining = self.max_rows;

        Ok(Box::new(RusqliteCursor {
            metadata,
            rows: self.statement.raw_query(),
            remaining,
            current: None,
        }))
    }

    fn execute_update(&mut self) -> Result<u64, DriverError> {
        let count = self.statement.raw_execute()?;
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn set_max_rows(&mut self, rows: usize) -> Result<(), DriverError> {
        self.max_rows = Some(rows);
        Ok(())
    }
}

fn column_class(type_name: &str) -> ColumnClass {
    match type_name {
        "DATE" => ColumnClass::Date,
        "TIMESTAMP" | "DATETIME" => ColumnClass::Timestamp,
        other => ColumnClass::Other(other.to_string()),
    }
}

fn result_metadata(statement: &::rusqlite::Statement<'_>) -> ResultMetadata {
    ResultMetadata::new(
        statement
            .columns()
            .iter()
            .map(|column| {
                let metadata = ColumnMetadata::new(column.name());
                match column.decl_type() {
                    Some(decl_type) => {
                        let type_name = decl_type.to_ascii_uppercase();
                        metadata
                            .with_class(column_class(&type_name))
                            .with_type_name(type_name)
                    }
                    None => metadata,
                }
            })
            .collect(),
    )
}

fn text_value(text: String, class: Option<&ColumnClass>) -> SqlValue {
    match class {
        Some(ColumnClass::Date) => parse_date(&text).map_or(SqlValue::String(text), SqlValue::Date),
        Some(ColumnClass::Timestamp) => {
            parse_timestamp(&text).map_or(SqlValue::String(text), SqlValue::Timestamp)
        }
        _ => SqlValue::String(text),
    }
}

fn materialize(
    row: &::rusqlite::Row<'_>,
    metadata: &ResultMetadata,
) -> Result<Vec<SqlValue>, DriverError> {
    (0..metadata.column_count())
        .map(|index| -> Result<SqlValue, DriverError> {
            Ok(match row.get_ref(index)? {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(number) => SqlValue::Int64(number),
                ValueRef::Real(number) => SqlValue::Real64(number),
                ValueRef::Text(text) => text_value(
                    String::from_utf8_lossy(text).into_owned(),
                    metadata.column(index).and_then(|column| column.class.as_ref()),
                ),
                ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
            })
        })
        .collect()
}

struct RusqliteCursor<'stmt> {
    metadata: Arc<ResultMetadata>,
    rows: ::rusqlite::Rows<'stmt>,
    remaining: Option<usize>,
    current: Option<BufferedRow>,
}

impl ResultCursor for RusqliteCursor<'_> {
    fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    fn next(&mut self) -> Result<bool, DriverError> {
        self.current = None;

        if self.remaining == Some(0) {
            return Ok(false);
        }
        let Some(row) = self.rows.next()? else {
            return Ok(false);
        };

        let values = materialize(row, &self.metadata)?;
        self.current = Some(BufferedRow::new(Arc::clone(&self.metadata), values));
        if let Some(remaining) = &mut self.remaining {
            *remaining -= 1;
        }

        Ok(true)
    }

    fn row(&self) -> Result<&dyn ResultRow, DriverError> {
        self.current
            .as_ref()
            .map(|row| row as &dyn ResultRow)
            .ok_or(DriverError::Closed)
    }
}

//! Scripted in-memory driver.
//!
//! Results are queued per SQL text and handed out in order, one per prepared
//! statement. Every bind, statement setting and execution is recorded, and
//! released connections, statements and cursors are counted, so tests can
//! inspect exactly what reached the driver.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::{
    driver::{
        BufferedRow, ColumnMetadata, Connection, DataSource, DriverError, DriverMetadata,
        PreparedStatement, ResultCursor, ResultMetadata, ResultRow, SqlWarning,
    },
    types::SqlType,
    value::SqlValue,
};

/// One bind operation as the driver received it.
#[derive(Debug, Clone, PartialEq)]
pub enum BindCall {
    Null {
        index: usize,
        sql_type: SqlType,
        type_name: Option<String>,
    },
    String {
        index: usize,
        value: String,
    },
    Decimal {
        index: usize,
        value: Decimal,
    },
    Date {
        index: usize,
        value: NaiveDate,
        zone: Option<FixedOffset>,
    },
    Time {
        index: usize,
        value: NaiveTime,
        zone: Option<FixedOffset>,
    },
    Timestamp {
        index: usize,
        value: NaiveDateTime,
        zone: Option<FixedOffset>,
    },
    Object {
        index: usize,
        value: SqlValue,
        sql_type: Option<SqlType>,
        scale: Option<u32>,
    },
}

impl BindCall {
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Null { index, .. }
            | Self::String { index, .. }
            | Self::Decimal { index, .. }
            | Self::Date { index, .. }
            | Self::Time { index, .. }
            | Self::Timestamp { index, .. }
            | Self::Object { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementSetting {
    FetchSize(usize),
    MaxRows(usize),
    QueryTimeout(Duration),
}

/// The scripted outcome of executing one statement.
#[derive(Debug, Clone, Default)]
pub struct SimulatedResult {
    metadata: ResultMetadata,
    rows: Vec<Vec<SqlValue>>,
    update_count: u64,
    warnings: Vec<SqlWarning>,
    failure: Option<String>,
}

impl SimulatedResult {
    /// A query result with the given column labels and rows.
    #[must_use]
    pub fn rows(labels: &[&str], rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            metadata: ResultMetadata::new(
                labels.iter().map(|label| ColumnMetadata::new(*label)).collect(),
            ),
            rows,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn update_count(count: u64) -> Self {
        Self {
            update_count: count,
            ..Default::default()
        }
    }

    /// A result whose execution fails with `message`.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_warning(mut self, warning: SqlWarning) -> Self {
        self.warnings.push(warning);
        self
    }
}

#[derive(Debug, Default)]
struct SimulationState {
    results: BTreeMap<String, VecDeque<SimulatedResult>>,
    bind_calls: Vec<BindCall>,
    executed: Vec<String>,
    settings: Vec<StatementSetting>,
    batches: Vec<Vec<String>>,
    released_connections: usize,
    released_statements: usize,
    released_cursors: usize,
}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct SimulationDataSource {
    metadata: Option<DriverMetadata>,
    bind_failure_at: Option<usize>,
    state: Mutex<SimulationState>,
}

impl Default for SimulationDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationDataSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: Some(DriverMetadata::new("Simulator", "simulator")),
            bind_failure_at: None,
            state: Mutex::new(SimulationState::default()),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: DriverMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Makes every metadata lookup fail.
    #[must_use]
    pub fn with_unavailable_metadata(mut self) -> Self {
        self.metadata = None;
        self
    }

    /// Makes every bind at the 1-based `index` fail.
    #[must_use]
    pub const fn with_bind_failure_at(mut self, index: usize) -> Self {
        self.bind_failure_at = Some(index);
        self
    }

    /// Queues `result` for the next statement prepared with exactly `sql`.
    ///
    /// Statements with nothing queued produce an empty result with no
    /// columns and an update count of 0.
    pub fn push_result(&self, sql: impl Into<String>, result: SimulatedResult) {
        self.state()
            .results
            .entry(sql.into())
            .or_default()
            .push_back(result);
    }

    #[must_use]
    pub fn bind_calls(&self) -> Vec<BindCall> {
        self.state().bind_calls.clone()
    }

    /// SQL text of every executed statement, in execution order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    #[must_use]
    pub fn settings(&self) -> Vec<StatementSetting> {
        self.state().settings.clone()
    }

    /// Statement lists sent through the connection's batch capability.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.state().batches.clone()
    }

    #[must_use]
    pub fn released_connections(&self) -> usize {
        self.state().released_connections
    }

    #[must_use]
    pub fn released_statements(&self) -> usize {
        self.state().released_statements
    }

    #[must_use]
    pub fn released_cursors(&self) -> usize {
        self.state().released_cursors
    }

    fn state(&self) -> MutexGuard<'_, SimulationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_result(&self, sql: &str) -> SimulatedResult {
        self.state()
            .results
            .get_mut(sql)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default()
    }
}

impl DataSource for SimulationDataSource {
    fn connection(&self) -> Result<Box<dyn Connection + '_>, DriverError> {
        Ok(Box::new(SimulationConnection { source: self }))
    }
}

struct SimulationConnection<'a> {
    source: &'a SimulationDataSource,
}

impl Drop for SimulationConnection<'_> {
    fn drop(&mut self) {
        self.source.state().released_connections += 1;
    }
}

impl Connection for SimulationConnection<'_> {
    fn metadata(&self) -> Result<DriverMetadata, DriverError> {
        self.source
            .metadata
            .clone()
            .ok_or_else(|| DriverError::Unsupported("Driver metadata is unavailable".to_string()))
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement + '_>, DriverError> {
        Ok(Box::new(SimulationStatement {
            source: self.source,
            sql: sql.to_string(),
            result: self.source.next_result(sql),
        }))
    }

    fn execute_batch(&self, statements: &[&str]) -> Result<Vec<u64>, DriverError> {
        self.source
            .state()
            .batches
            .push(statements.iter().map(ToString::to_string).collect());

        statements
            .iter()
            .map(|sql| {
                let result = self.source.next_result(sql);
                self.source.state().executed.push((*sql).to_string());
                result.failure.map_or(Ok(result.update_count), |message| {
                    Err(execution_failure(message))
                })
            })
            .collect()
    }
}

fn execution_failure(message: String) -> DriverError {
    DriverError::Sql {
        sql_state: "HY000".to_string(),
        code: 0,
        message,
    }
}

struct SimulationStatement<'a> {
    source: &'a SimulationDataSource,
    sql: String,
    result: SimulatedResult,
}

impl SimulationStatement<'_> {
    fn record(&self, call: BindCall) -> Result<(), DriverError> {
        let index = call.index();
        if self.source.bind_failure_at == Some(index) {
            return Err(DriverError::Sql {
                sql_state: "07009".to_string(),
                code: 0,
                message: format!("Simulated bind failure at index {index}"),
            });
        }
        self.source.state().bind_calls.push(call);
        Ok(())
    }

    fn record_setting(&self, setting: StatementSetting) {
        self.source.state().settings.push(setting);
    }

    fn execute(&self) -> Result<(), DriverError> {
        self.source.state().executed.push(self.sql.clone());
        match &self.result.failure {
            Some(message) => Err(execution_failure(message.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for SimulationStatement<'_> {
    fn drop(&mut self) {
        self.source.state().released_statements += 1;
    }
}

impl PreparedStatement for SimulationStatement<'_> {
    fn set_null(
        &mut self,
        index: usize,
        sql_type: SqlType,
        type_name: Option<&str>,
    ) -> Result<(), DriverError> {
        self.record(BindCall::Null {
            index,
            sql_type,
            type_name: type_name.map(ToString::to_string),
        })
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<(), DriverError> {
        self.record(BindCall::String {
            index,
            value: value.to_string(),
        })
    }

    fn set_decimal(&mut self, index: usize, value: Decimal) -> Result<(), DriverError> {
        self.record(BindCall::Decimal { index, value })
    }

    fn set_date(
        &mut self,
        index: usize,
        value: NaiveDate,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.record(BindCall::Date { index, value, zone })
    }

    fn set_time(
        &mut self,
        index: usize,
        value: NaiveTime,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.record(BindCall::Time { index, value, zone })
    }

    fn set_timestamp(
        &mut self,
        index: usize,
        value: NaiveDateTime,
        zone: Option<FixedOffset>,
    ) -> Result<(), DriverError> {
        self.record(BindCall::Timestamp { index, value, zone })
    }

    fn set_object(
        &mut self,
        index: usize,
        value: &SqlValue,
        sql_type: Option<SqlType>,
        scale: Option<u32>,
    ) -> Result<(), DriverError> {
        self.record(BindCall::Object {
            index,
            value: value.clone(),
            sql_type,
            scale,
        })
    }

    fn result_column_count(&self) -> usize {
        self.result.metadata.column_count()
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultCursor + '_>, DriverError> {
        self.execute()?;

        Ok(Box::new(SimulationCursor {
            source: self.source,
            metadata: Arc::new(self.result.metadata.clone()),
            rows: std::mem::take(&mut self.result.rows).into_iter(),
            current: None,
        }))
    }

    fn execute_update(&mut self) -> Result<u64, DriverError> {
        self.execute()?;
        Ok(self.result.update_count)
    }

    fn set_fetch_size(&mut self, rows: usize) -> Result<(), DriverError> {
        self.record_setting(StatementSetting::FetchSize(rows));
        Ok(())
    }

    fn set_max_rows(&mut self, rows: usize) -> Result<(), DriverError> {
        self.record_setting(StatementSetting::MaxRows(rows));
        Ok(())
    }

    fn set_query_timeout(&mut self, timeout: Duration) -> Result<(), DriverError> {
        self.record_setting(StatementSetting::QueryTimeout(timeout));
        Ok(())
    }

    fn warnings(&self) -> Vec<SqlWarning> {
        self.result.warnings.clone()
    }
}

struct SimulationCursor<'a> {
    source: &'a SimulationDataSource,
    metadata: Arc<ResultMetadata>,
    rows: std::vec::IntoIter<Vec<SqlValue>>,
    current: Option<BufferedRow>,
}

impl Drop for SimulationCursor<'_> {
    fn drop(&mut self) {
        self.source.state().released_cursors += 1;
    }
}

impl ResultCursor for SimulationCursor<'_> {
    fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    fn next(&mut self) -> Result<bool, DriverError> {
        self.current = self
            .rows
            .next()
            .map(|values| BufferedRow::new(Arc::clone(&self.metadata), values));
        Ok(self.current.is_some())
    }

    fn row(&self) -> Result<&dyn ResultRow, DriverError> {
        self.current
            .as_ref()
            .map(|row| row as &dyn ResultRow)
            .ok_or(DriverError::Closed)
    }
}

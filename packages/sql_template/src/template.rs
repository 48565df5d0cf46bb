//! The execution orchestrator.
//!
//! [`SqlTemplate`] acquires a connection, prepares the statement, applies the
//! configured statement settings, binds arguments through a
//! [`PreparedStatementSetter`], runs the statement and hands the cursor to a
//! [`ResultSetExtractor`]. Cursors, statements and connections are dropped on
//! every exit path.

use std::sync::Arc;

use crate::{
    SqlTemplateError,
    binder::PreparedStatementSetter,
    coercion::FromSqlValue,
    config::TemplateConfig,
    driver::{Connection, DataSource, DriverError, PreparedStatement},
    extractor::{
        ResultSetExtractor, RowCallbackHandler, RowCallbackHandlerResultSetExtractor,
        RowMapperResultSetExtractor, required_single_result,
    },
    mapper::{ColumnMap, ColumnMapRowMapper, RowMapper, SingleColumnRowMapper},
    quirks::DriverQuirks,
};

/// Creates the statement an operation runs on.
///
/// SQL text (`str` and `String`) is prepared as is. Implement this to build
/// the statement differently, for example to reuse one SQL text with
/// extra per-statement driver settings.
pub trait PreparedStatementCreator {
    /// # Errors
    ///
    /// * If the statement could not be created
    fn create_statement<'c>(
        &self,
        connection: &'c dyn Connection,
    ) -> Result<Box<dyn PreparedStatement + 'c>, DriverError>;

    /// The SQL text, used for logging.
    fn sql(&self) -> Option<&str> {
        None
    }
}

impl PreparedStatementCreator for str {
    fn create_statement<'c>(
        &self,
        connection: &'c dyn Connection,
    ) -> Result<Box<dyn PreparedStatement + 'c>, DriverError> {
        connection.prepare(self)
    }

    fn sql(&self) -> Option<&str> {
        Some(self)
    }
}

impl PreparedStatementCreator for String {
    fn create_statement<'c>(
        &self,
        connection: &'c dyn Connection,
    ) -> Result<Box<dyn PreparedStatement + 'c>, DriverError> {
        connection.prepare(self)
    }

    fn sql(&self) -> Option<&str> {
        Some(self)
    }
}

#[derive(Debug, Clone)]
pub struct SqlTemplate {
    data_source: Arc<dyn DataSource>,
    config: TemplateConfig,
}

impl SqlTemplate {
    #[must_use]
    pub fn new(data_source: Arc<dyn DataSource>) -> Self {
        Self {
            data_source,
            config: TemplateConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    #[must_use]
    pub const fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Runs `action` with a freshly acquired connection.
    ///
    /// # Errors
    ///
    /// * If a connection could not be acquired
    /// * If `action` fails
    pub fn execute<T>(
        &self,
        action: impl FnOnce(&dyn Connection) -> Result<T, SqlTemplateError>,
    ) -> Result<T, SqlTemplateError> {
        let connection = self.data_source.connection()?;
        action(connection.as_ref())
    }

    /// Creates a statement with `creator`, applies the statement settings and
    /// runs `action` with the statement and the connection's driver quirks.
    ///
    /// Warnings left on the statement are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// * If the statement could not be created or configured
    /// * If `action` fails
    pub fn execute_with<C, T>(
        &self,
        creator: &C,
        action: impl FnOnce(&mut dyn PreparedStatement, &DriverQuirks) -> Result<T, SqlTemplateError>,
    ) -> Result<T, SqlTemplateError>
    where
        C: PreparedStatementCreator + ?Sized,
    {
        match creator.sql() {
            Some(sql) => log::debug!("Executing prepared SQL statement [{sql}]"),
            None => log::debug!("Executing prepared SQL statement from a statement creator"),
        }

        let connection = self.data_source.connection()?;
        let quirks = DriverQuirks::resolve(connection.as_ref());
        let mut statement = creator.create_statement(connection.as_ref())?;
        self.apply_settings(statement.as_mut())?;

        let result = action(statement.as_mut(), &quirks)?;
        handle_warnings(statement.as_ref());

        Ok(result)
    }

    /// [`Self::execute_with`] for SQL text.
    ///
    /// # Errors
    ///
    /// * If the statement could not be prepared or configured
    /// * If `action` fails
    pub fn execute_prepared<T>(
        &self,
        sql: &str,
        action: impl FnOnce(&mut dyn PreparedStatement, &DriverQuirks) -> Result<T, SqlTemplateError>,
    ) -> Result<T, SqlTemplateError> {
        self.execute_with(sql, action)
    }

    /// Executes a statement without arguments, returning the affected row
    /// count.
    ///
    /// # Errors
    ///
    /// * If the statement fails
    pub fn execute_sql(&self, sql: &str) -> Result<u64, SqlTemplateError> {
        log::debug!("Executing SQL statement [{sql}]");

        self.execute_prepared(sql, |statement, _quirks| Ok(statement.execute_update()?))
    }

    /// # Errors
    ///
    /// * If binding, execution or extraction fails
    pub fn query<T, S, E>(
        &self,
        sql: &str,
        setter: &S,
        mut extractor: E,
    ) -> Result<T, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
        E: ResultSetExtractor<T>,
    {
        log::debug!("Executing prepared SQL query [{sql}]");

        self.query_with(sql, setter, extractor)
    }

    /// [`Self::query`] on a statement created by `creator`.
    ///
    /// # Errors
    ///
    /// * If creating, binding, execution or extraction fails
    pub fn query_with<T, C, S, E>(
        &self,
        creator: &C,
        setter: &S,
        mut extractor: E,
    ) -> Result<T, SqlTemplateError>
    where
        C: PreparedStatementCreator + ?Sized,
        S: PreparedStatementSetter + ?Sized,
        E: ResultSetExtractor<T>,
    {
        self.execute_with(creator, |statement, quirks| {
            setter.set_values(statement, quirks)?;
            let mut cursor = statement.execute_query()?;
            extractor.extract_data(cursor.as_mut())
        })
    }

    /// Maps every row with `mapper`.
    ///
    /// # Errors
    ///
    /// * If binding, execution or mapping fails
    pub fn query_rows<T, S, M>(
        &self,
        sql: &str,
        setter: &S,
        mapper: M,
    ) -> Result<Vec<T>, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
        M: RowMapper<T>,
    {
        self.query(sql, setter, RowMapperResultSetExtractor::new(mapper))
    }

    /// Hands every row to `handler`. Returns the number of rows processed.
    ///
    /// # Errors
    ///
    /// * If binding or execution fails
    /// * If `handler` fails
    pub fn query_each<S, H>(
        &self,
        sql: &str,
        setter: &S,
        handler: &mut H,
    ) -> Result<usize, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
        H: RowCallbackHandler + ?Sized,
    {
        self.query(sql, setter, RowCallbackHandlerResultSetExtractor::new(handler))
    }

    /// Maps the single row of the result with `mapper`.
    ///
    /// # Errors
    ///
    /// * [`SqlTemplateError::EmptyResult`] if there are no rows
    /// * [`SqlTemplateError::IncorrectResultSize`] if there is more than one row
    /// * If binding, execution or mapping fails
    pub fn query_for_object<T, S, M>(
        &self,
        sql: &str,
        setter: &S,
        mapper: M,
    ) -> Result<T, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
        M: RowMapper<T>,
    {
        required_single_result(self.query(
            sql,
            setter,
            RowMapperResultSetExtractor::with_rows_expected(mapper, 1),
        )?)
    }

    /// Reads the single column of the single row as `T`.
    ///
    /// # Errors
    ///
    /// * If the result does not have exactly one row and one column
    /// * If the value cannot be converted into `T`
    pub fn query_for_value<T, S>(&self, sql: &str, setter: &S) -> Result<T, SqlTemplateError>
    where
        T: FromSqlValue,
        S: PreparedStatementSetter + ?Sized,
    {
        self.query_for_object(sql, setter, SingleColumnRowMapper::<T>::new())
    }

    /// Reads the single column of every row as `T`.
    ///
    /// # Errors
    ///
    /// * If the result does not have exactly one column
    /// * If a value cannot be converted into `T`
    pub fn query_for_list<T, S>(&self, sql: &str, setter: &S) -> Result<Vec<T>, SqlTemplateError>
    where
        T: FromSqlValue,
        S: PreparedStatementSetter + ?Sized,
    {
        self.query_rows(sql, setter, SingleColumnRowMapper::<T>::new())
    }

    /// # Errors
    ///
    /// * If binding, execution or column reads fail
    pub fn query_for_maps<S>(&self, sql: &str, setter: &S) -> Result<Vec<ColumnMap>, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
    {
        self.query_rows(sql, setter, ColumnMapRowMapper)
    }

    /// # Errors
    ///
    /// * If the result does not have exactly one row
    /// * If binding, execution or column reads fail
    pub fn query_for_map<S>(&self, sql: &str, setter: &S) -> Result<ColumnMap, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
    {
        self.query_for_object(sql, setter, ColumnMapRowMapper)
    }

    /// Single `i64` value. A SQL NULL reads as 0.
    ///
    /// # Errors
    ///
    /// * If the result does not have exactly one row and one column
    /// * If the value does not fit in an `i64`
    pub fn query_for_i64<S>(&self, sql: &str, setter: &S) -> Result<i64, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
    {
        Ok(self
            .query_for_value::<Option<i64>, S>(sql, setter)?
            .unwrap_or(0))
    }

    /// Single `i32` value. A SQL NULL reads as 0.
    ///
    /// # Errors
    ///
    /// * If the result does not have exactly one row and one column
    /// * If the value does not fit in an `i32`
    pub fn query_for_i32<S>(&self, sql: &str, setter: &S) -> Result<i32, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
    {
        Ok(self
            .query_for_value::<Option<i32>, S>(sql, setter)?
            .unwrap_or(0))
    }

    /// Binds and executes an insert, update or delete. Returns the affected
    /// row count.
    ///
    /// # Errors
    ///
    /// * If binding or execution fails
    pub fn update<S>(&self, sql: &str, setter: &S) -> Result<u64, SqlTemplateError>
    where
        S: PreparedStatementSetter + ?Sized,
    {
        log::debug!("Executing SQL update [{sql}]");

        self.update_with(sql, setter)
    }

    /// [`Self::update`] on a statement created by `creator`.
    ///
    /// # Errors
    ///
    /// * If creating, binding or execution fails
    pub fn update_with<C, S>(&self, creator: &C, setter: &S) -> Result<u64, SqlTemplateError>
    where
        C: PreparedStatementCreator + ?Sized,
        S: PreparedStatementSetter + ?Sized,
    {
        self.execute_with(creator, |statement, quirks| {
            setter.set_values(statement, quirks)?;
            let rows = statement.execute_update()?;
            log::debug!("SQL update affected {rows} rows");
            Ok(rows)
        })
    }

    /// Executes `statements` as a batch, returning each statement's affected
    /// row count.
    ///
    /// Drivers without batch support run the statements one at a time, and a
    /// statement that would return rows is rejected.
    ///
    /// # Errors
    ///
    /// * [`SqlTemplateError::Configuration`] if a statement would return rows
    /// * If a statement fails
    pub fn batch_update(&self, statements: &[&str]) -> Result<Vec<u64>, SqlTemplateError> {
        log::debug!(
            "Executing SQL batch update of {} statement{}",
            statements.len(),
            if statements.len() == 1 { "" } else { "s" }
        );

        self.execute(|connection| {
            if supports_batch_updates(connection) {
                return Ok(connection.execute_batch(statements)?);
            }

            let mut counts = Vec::with_capacity(statements.len());
            for sql in statements {
                let mut statement = connection.prepare(sql)?;
                if statement.result_column_count() > 0 {
                    return Err(SqlTemplateError::Configuration(format!(
                        "Invalid batch SQL statement: {sql}"
                    )));
                }
                counts.push(statement.execute_update()?);
                handle_warnings(statement.as_ref());
            }
            Ok(counts)
        })
    }

    fn apply_settings(&self, statement: &mut dyn PreparedStatement) -> Result<(), DriverError> {
        if let Some(rows) = self.config.fetch_size() {
            statement.set_fetch_size(rows)?;
        }
        if let Some(rows) = self.config.max_rows() {
            statement.set_max_rows(rows)?;
        }
        if let Some(timeout) = self.config.query_timeout() {
            statement.set_query_timeout(timeout)?;
        }
        Ok(())
    }
}

fn supports_batch_updates(connection: &dyn Connection) -> bool {
    match connection.metadata() {
        Ok(metadata) => metadata.supports_batch_updates,
        Err(e) => {
            log::debug!("Could not check whether the driver supports batch updates: {e:?}");
            false
        }
    }
}

fn handle_warnings(statement: &dyn PreparedStatement) {
    for warning in statement.warnings() {
        log::debug!(
            "SQL warning ignored: SQL state '{}', error code '{}', message [{}]",
            warning.sql_state.as_deref().unwrap_or_default(),
            warning.code,
            warning.message
        );
    }
}

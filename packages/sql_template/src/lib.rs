#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod binder;
pub mod coercion;
pub mod config;
pub mod driver;
pub mod extractor;
pub mod mapper;
pub mod parameter;
pub mod quirks;
#[cfg(feature = "sqlite-rusqlite")]
pub mod rusqlite;
#[cfg(feature = "simulator")]
pub mod simulator;
pub mod template;
pub mod types;
pub mod value;

use thiserror::Error;

pub use binder::{PreparedStatementSetter, TypedArguments};
pub use coercion::{ConversionError, FromSqlValue, RequiredType};
pub use config::{ConfigError, TemplateConfig};
pub use driver::{DataSource, DriverError};
pub use extractor::{ResultSetExtractor, RowCallbackHandler};
pub use mapper::{
    ColumnMap, ColumnMapRowMapper, RecordRowMapper, RowMapper, RowRecord, SingleColumnRowMapper,
};
pub use parameter::{DeclaredParameter, ParameterValue, SqlTypeValue};
pub use quirks::{DriverQuirks, NullBinding};
pub use template::{PreparedStatementCreator, SqlTemplate};
pub use types::SqlType;
pub use value::{SqlValue, VendorValue};

#[cfg(feature = "macros")]
pub use switchy_sql_template_macros::RowRecord;

#[derive(Debug, Error)]
pub enum SqlTemplateError {
    #[error("Invalid usage: {0}")]
    Configuration(String),
    #[error("Failed to bind parameter at index {index}: {source}")]
    Binding {
        index: usize,
        #[source]
        source: DriverError,
    },
    #[error(transparent)]
    Driver(DriverError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Type mismatch in row {row_num} (column type {column_type}): {source}")]
    TypeMismatch {
        row_num: usize,
        column_type: String,
        #[source]
        source: ConversionError,
    },
    #[error("Unable to map column '{column}' to property '{field}': {source}")]
    RecordMapping {
        column: String,
        field: String,
        #[source]
        source: ConversionError,
    },
    #[error("Incorrect column count: expected {expected}, actual {actual}")]
    IncorrectColumnCount { expected: usize, actual: usize },
    #[error("Incorrect result size: expected 1, actual 0")]
    EmptyResult,
    #[error("Incorrect result size: expected {expected}, actual {actual}")]
    IncorrectResultSize { expected: usize, actual: usize },
}

impl From<DriverError> for SqlTemplateError {
    fn from(value: DriverError) -> Self {
        match value {
            DriverError::Conversion(e) => Self::Conversion(e),
            e => Self::Driver(e),
        }
    }
}

impl SqlTemplateError {
    /// Whether the result had the wrong number of rows or columns.
    #[must_use]
    pub const fn is_cardinality_error(&self) -> bool {
        matches!(
            self,
            Self::IncorrectColumnCount { .. } | Self::EmptyResult | Self::IncorrectResultSize { .. }
        )
    }

    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

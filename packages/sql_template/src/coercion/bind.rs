//! Bind side of the coercion kernel.

use chrono::{NaiveDate, NaiveTime};

use crate::{
    driver::{DriverError, PreparedStatement},
    parameter::{DeclaredParameter, ParameterValue},
    quirks::{DriverQuirks, NullBinding},
    types::SqlType,
    value::SqlValue,
};

/// Binds one parameter at the 1-based `index`.
///
/// `sql_type` is the type declared for the position, or
/// [`SqlType::UNKNOWN`]. A declaration carried by a
/// [`ParameterValue::TypeOverride`] or [`ParameterValue::SelfBinding`]
/// replaces it unless that declaration is itself unknown.
///
/// # Errors
///
/// * If the driver rejects the bind
pub fn bind_parameter(
    statement: &mut dyn PreparedStatement,
    index: usize,
    sql_type: SqlType,
    parameter: &ParameterValue,
    quirks: &DriverQuirks,
) -> Result<(), DriverError> {
    match parameter {
        ParameterValue::Plain(value) => {
            set_parameter_value(statement, index, sql_type, None, None, value, quirks)
        }
        ParameterValue::TypeOverride(declared, value) => set_parameter_value(
            statement,
            index,
            declared_type(declared, sql_type),
            declared.type_name(),
            declared.scale(),
            value,
            quirks,
        ),
        ParameterValue::SelfBinding(declared, binder) => {
            let sql_type = declared
                .as_ref()
                .map_or(sql_type, |declared| declared_type(declared, sql_type));
            let type_name = declared.as_ref().and_then(DeclaredParameter::type_name);
            log::debug!(
                "Setting SQL statement parameter value: column index {index}, self-binding value {binder:?}, SQL type {sql_type}"
            );
            binder.set_type_value(statement, index, sql_type, type_name)
        }
    }
}

const fn declared_type(declared: &DeclaredParameter, positional: SqlType) -> SqlType {
    if declared.sql_type().is_unknown() {
        positional
    } else {
        declared.sql_type()
    }
}

/// Issues exactly one driver bind call for `value`.
///
/// # Errors
///
/// * If the driver rejects the bind
pub fn set_parameter_value(
    statement: &mut dyn PreparedStatement,
    index: usize,
    sql_type: SqlType,
    type_name: Option<&str>,
    scale: Option<u32>,
    value: &SqlValue,
    quirks: &DriverQuirks,
) -> Result<(), DriverError> {
    log::debug!(
        "Setting SQL statement parameter value: column index {index}, parameter value [{value}], value type [{}], SQL type {sql_type}",
        value.type_label(),
    );

    if value.is_null() {
        return set_null(statement, index, sql_type, type_name, quirks);
    }

    if sql_type.is_string_family() || (sql_type.is_character_lob() && value.is_text_like()) {
        return statement.set_string(index, &value.to_string());
    }

    if sql_type.is_exact_decimal() {
        return match value {
            SqlValue::Decimal(decimal) => statement.set_decimal(index, *decimal),
            _ => statement.set_object(index, value, Some(sql_type), scale),
        };
    }

    match sql_type {
        SqlType::DATE => set_date(statement, index, value),
        SqlType::TIME => set_time(statement, index, value),
        SqlType::TIMESTAMP => set_timestamp(statement, index, value),
        sql_type if sql_type.is_unknown() => set_inferred(statement, index, value),
        sql_type => statement.set_object(index, value, Some(sql_type), None),
    }
}

fn set_null(
    statement: &mut dyn PreparedStatement,
    index: usize,
    sql_type: SqlType,
    type_name: Option<&str>,
    quirks: &DriverQuirks,
) -> Result<(), DriverError> {
    if !sql_type.is_unknown() {
        return statement.set_null(index, sql_type, type_name);
    }

    match quirks.null_binding {
        NullBinding::TypedNull => statement.set_null(index, SqlType::NULL, None),
        NullBinding::VarcharNull => statement.set_null(index, SqlType::VARCHAR, None),
        NullBinding::UntypedObject => statement.set_object(index, &SqlValue::Null, None, None),
    }
}

fn set_date(
    statement: &mut dyn PreparedStatement,
    index: usize,
    value: &SqlValue,
) -> Result<(), DriverError> {
    match value {
        SqlValue::Date(date) => statement.set_date(index, *date, None),
        SqlValue::Timestamp(timestamp) => statement.set_date(index, timestamp.date(), None),
        SqlValue::Instant(instant) => statement.set_date(index, instant.naive_utc().date(), None),
        SqlValue::Calendar(calendar) => {
            statement.set_date(index, calendar.naive_local().date(), Some(*calendar.offset()))
        }
        _ => statement.set_object(index, value, Some(SqlType::DATE), None),
    }
}

fn set_time(
    statement: &mut dyn PreparedStatement,
    index: usize,
    value: &SqlValue,
) -> Result<(), DriverError> {
    match value {
        SqlValue::Time(time) => statement.set_time(index, *time, None),
        SqlValue::Timestamp(timestamp) => statement.set_time(index, timestamp.time(), None),
        SqlValue::Instant(instant) => statement.set_time(index, instant.naive_utc().time(), None),
        SqlValue::Calendar(calendar) => {
            statement.set_time(index, calendar.naive_local().time(), Some(*calendar.offset()))
        }
        _ => statement.set_object(index, value, Some(SqlType::TIME), None),
    }
}

fn set_timestamp(
    statement: &mut dyn PreparedStatement,
    index: usize,
    value: &SqlValue,
) -> Result<(), DriverError> {
    match value {
        SqlValue::Timestamp(timestamp) => statement.set_timestamp(index, *timestamp, None),
        SqlValue::Date(date) => statement.set_timestamp(index, date.and_time(NaiveTime::MIN), None),
        SqlValue::Time(time) => {
            statement.set_timestamp(index, NaiveDate::default().and_time(*time), None)
        }
        SqlValue::Instant(instant) => statement.set_timestamp(index, instant.naive_utc(), None),
        SqlValue::Calendar(calendar) => {
            statement.set_timestamp(index, calendar.naive_local(), Some(*calendar.offset()))
        }
        _ => statement.set_object(index, value, Some(SqlType::TIMESTAMP), None),
    }
}

fn set_inferred(
    statement: &mut dyn PreparedStatement,
    index: usize,
    value: &SqlValue,
) -> Result<(), DriverError> {
    match value {
        SqlValue::String(text) | SqlValue::Clob(text) => statement.set_string(index, text),
        SqlValue::Instant(instant) => statement.set_timestamp(index, instant.naive_utc(), None),
        SqlValue::Calendar(calendar) => statement.set_timestamp(index, calendar.naive_utc(), None),
        _ => statement.set_object(index, value, None, None),
    }
}

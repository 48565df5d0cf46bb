//! Binding argument lists onto prepared statements.
//!
//! Two modes: self-describing (each [`ParameterValue`] carries its own type,
//! if any) and positional-typed ([`TypedArguments`], parallel value and type
//! lists with collection expansion).

use crate::{
    SqlTemplateError,
    coercion::{bind_parameter, set_parameter_value},
    driver::PreparedStatement,
    parameter::ParameterValue,
    quirks::DriverQuirks,
    types::SqlType,
    value::SqlValue,
};

/// Binds the arguments of one statement execution.
pub trait PreparedStatementSetter {
    /// # Errors
    ///
    /// * [`SqlTemplateError::Binding`] if the driver rejects a bind
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError>;
}

impl PreparedStatementSetter for () {
    fn set_values(
        &self,
        _statement: &mut dyn PreparedStatement,
        _quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        Ok(())
    }
}

impl PreparedStatementSetter for [ParameterValue] {
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        bind_all(statement, self, quirks)
    }
}

impl<const N: usize> PreparedStatementSetter for [ParameterValue; N] {
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        bind_all(statement, self, quirks)
    }
}

impl PreparedStatementSetter for Vec<ParameterValue> {
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        bind_all(statement, self, quirks)
    }
}

impl<F> PreparedStatementSetter for F
where
    F: Fn(&mut dyn PreparedStatement, &DriverQuirks) -> Result<(), SqlTemplateError>,
{
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        self(statement, quirks)
    }
}

/// Binds `parameters` in order at positions `1..=parameters.len()`.
///
/// # Errors
///
/// * [`SqlTemplateError::Binding`] if the driver rejects a bind
pub fn bind_all(
    statement: &mut dyn PreparedStatement,
    parameters: &[ParameterValue],
    quirks: &DriverQuirks,
) -> Result<(), SqlTemplateError> {
    for (i, parameter) in parameters.iter().enumerate() {
        let index = i + 1;
        bind_parameter(statement, index, SqlType::UNKNOWN, parameter, quirks)
            .map_err(|source| SqlTemplateError::Binding { index, source })?;
    }
    Ok(())
}

/// Parallel argument values and SQL type codes.
#[derive(Debug, Clone)]
pub struct TypedArguments {
    values: Vec<ParameterValue>,
    types: Vec<SqlType>,
}

impl TypedArguments {
    /// # Errors
    ///
    /// * [`SqlTemplateError::Configuration`] if the two lists differ in length
    pub fn new(values: Vec<ParameterValue>, types: Vec<SqlType>) -> Result<Self, SqlTemplateError> {
        if values.len() != types.len() {
            return Err(SqlTemplateError::Configuration(format!(
                "Argument values and argument types must match: {} value(s), {} type(s)",
                values.len(),
                types.len()
            )));
        }
        Ok(Self { values, types })
    }

    #[must_use]
    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    #[must_use]
    pub fn types(&self) -> &[SqlType] {
        &self.types
    }
}

impl PreparedStatementSetter for TypedArguments {
    fn set_values(
        &self,
        statement: &mut dyn PreparedStatement,
        quirks: &DriverQuirks,
    ) -> Result<(), SqlTemplateError> {
        bind_all_typed(statement, &self.values, &self.types, quirks)
    }
}

/// Binds values with their positional types.
///
/// A plain [`SqlValue::List`] whose type is not [`SqlType::ARRAY`] expands
/// into one position per element, and a [`SqlValue::Tuple`] element expands
/// into one position per item. Every expanded position is bound with the
/// list's declared type.
///
/// # Errors
///
/// * [`SqlTemplateError::Configuration`] if the two lists differ in length
/// * [`SqlTemplateError::Binding`] if the driver rejects a bind
pub fn bind_all_typed(
    statement: &mut dyn PreparedStatement,
    values: &[ParameterValue],
    types: &[SqlType],
    quirks: &DriverQuirks,
) -> Result<(), SqlTemplateError> {
    if values.len() != types.len() {
        return Err(SqlTemplateError::Configuration(format!(
            "Argument values and argument types must match: {} value(s), {} type(s)",
            values.len(),
            types.len()
        )));
    }

    let mut index = 1;

    for (parameter, sql_type) in values.iter().zip(types.iter().copied()) {
        match parameter {
            ParameterValue::Plain(SqlValue::List(entries)) if sql_type != SqlType::ARRAY => {
                for entry in entries {
                    if let SqlValue::Tuple(items) = entry {
                        for item in items {
                            bind_next(statement, &mut index, sql_type, item, quirks)?;
                        }
                    } else {
                        bind_next(statement, &mut index, sql_type, entry, quirks)?;
                    }
                }
            }
            ParameterValue::Plain(value) => {
                bind_next(statement, &mut index, sql_type, value, quirks)?;
            }
            parameter => {
                bind_parameter(statement, index, sql_type, parameter, quirks)
                    .map_err(|source| SqlTemplateError::Binding { index, source })?;
                index += 1;
            }
        }
    }

    Ok(())
}

fn bind_next(
    statement: &mut dyn PreparedStatement,
    index: &mut usize,
    sql_type: SqlType,
    value: &SqlValue,
    quirks: &DriverQuirks,
) -> Result<(), SqlTemplateError> {
    let position = *index;
    set_parameter_value(statement, position, sql_type, None, None, value, quirks).map_err(
        |source| SqlTemplateError::Binding {
            index: position,
            source,
        },
    )?;
    *index += 1;
    Ok(())
}

#[cfg(all(test, feature = "simulator"))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        driver::{Connection as _, DataSource as _},
        simulator::{BindCall, SimulationDataSource},
    };

    fn bind_with(setter: &dyn PreparedStatementSetter) -> Result<Vec<BindCall>, SqlTemplateError> {
        let source = SimulationDataSource::new();
        {
            let connection = source.connection()?;
            let mut statement = connection.prepare("select 1")?;
            setter.set_values(statement.as_mut(), &DriverQuirks::default())?;
        }
        Ok(source.bind_calls())
    }

    #[test_log::test]
    fn mismatched_lengths_are_rejected_before_binding() {
        let result = TypedArguments::new(vec![1.into(), 2.into()], vec![SqlType::INTEGER]);

        assert!(matches!(result, Err(SqlTemplateError::Configuration(_))));
    }

    #[test_log::test]
    fn self_describing_mode_uses_consecutive_positions() {
        let calls = bind_with(&vec![ParameterValue::from("a"), ParameterValue::from(2_i32)]).unwrap();

        assert_eq!(
            calls,
            vec![
                BindCall::String {
                    index: 1,
                    value: "a".to_string()
                },
                BindCall::Object {
                    index: 2,
                    value: SqlValue::Int32(2),
                    sql_type: None,
                    scale: None
                },
            ]
        );
    }

    #[test_log::test]
    fn list_argument_expands_into_consecutive_positions() {
        let arguments = TypedArguments::new(
            vec![
                "x".into(),
                SqlValue::List(vec![1.into(), 2.into(), 3.into()]).into(),
                "y".into(),
            ],
            vec![SqlType::VARCHAR, SqlType::INTEGER, SqlType::VARCHAR],
        )
        .unwrap();

        let indices = bind_with(&arguments)
            .unwrap()
            .iter()
            .map(BindCall::index)
            .collect::<Vec<_>>();

        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test_log::test]
    fn tuple_entries_expand_each_item() {
        let arguments = TypedArguments::new(
            vec![
                SqlValue::List(vec![
                    SqlValue::Tuple(vec![1.into(), "a".into()]),
                    SqlValue::Tuple(vec![2.into(), "b".into()]),
                ])
                .into(),
            ],
            vec![SqlType::VARCHAR],
        )
        .unwrap();

        let calls = bind_with(&arguments).unwrap();

        assert_eq!(
            calls,
            ["1", "a", "2", "b"]
                .iter()
                .enumerate()
                .map(|(i, value)| BindCall::String {
                    index: i + 1,
                    value: (*value).to_string()
                })
                .collect::<Vec<_>>()
        );
    }

    #[test_log::test]
    fn array_typed_list_is_bound_as_one_value() {
        let list = SqlValue::List(vec![1.into(), 2.into()]);
        let arguments =
            TypedArguments::new(vec![list.clone().into()], vec![SqlType::ARRAY]).unwrap();

        assert_eq!(
            bind_with(&arguments).unwrap(),
            vec![BindCall::Object {
                index: 1,
                value: list,
                sql_type: Some(SqlType::ARRAY),
                scale: None
            }]
        );
    }

    #[test_log::test]
    fn binding_failure_reports_the_position() {
        let source = SimulationDataSource::new().with_bind_failure_at(2);
        let connection = source.connection().unwrap();
        let mut statement = connection.prepare("select ?, ?").unwrap();

        let result = bind_all(
            statement.as_mut(),
            &[1.into(), 2.into()],
            &DriverQuirks::default(),
        );

        assert!(matches!(result, Err(SqlTemplateError::Binding { index: 2, .. })));
    }
}

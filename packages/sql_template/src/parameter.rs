use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::{
    driver::{DriverError, PreparedStatement},
    types::SqlType,
    value::SqlValue,
};

/// A caller's static description of one bind position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredParameter {
    name: Option<String>,
    sql_type: SqlType,
    type_name: Option<String>,
    scale: Option<u32>,
}

impl DeclaredParameter {
    #[must_use]
    pub const fn new(sql_type: SqlType) -> Self {
        Self {
            name: None,
            sql_type,
            type_name: None,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    #[must_use]
    pub const fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// Pairs this declaration with a concrete value for one invocation.
    #[must_use]
    pub fn value(&self, value: impl Into<SqlValue>) -> ParameterValue {
        ParameterValue::TypeOverride(self.clone(), value.into())
    }

    /// Pairs this declaration with a value that binds itself. The declared
    /// type and type name are handed to [`SqlTypeValue::set_type_value`].
    #[must_use]
    pub fn self_binding(&self, value: impl SqlTypeValue + 'static) -> ParameterValue {
        ParameterValue::SelfBinding(Some(self.clone()), Arc::new(value))
    }
}

/// A value that knows how to bind itself.
pub trait SqlTypeValue: Debug + Send + Sync {
    /// Binds this value at `index`. `sql_type` is [`SqlType::UNKNOWN`] when
    /// no type was declared for the position.
    ///
    /// # Errors
    ///
    /// * If the driver rejects the bind
    fn set_type_value(
        &self,
        statement: &mut dyn PreparedStatement,
        index: usize,
        sql_type: SqlType,
        type_name: Option<&str>,
    ) -> Result<(), DriverError>;
}

/// One argument for one bind position.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    /// Bound with the type inferred from the value.
    Plain(SqlValue),
    /// Bound with the declared type, type name and scale.
    TypeOverride(DeclaredParameter, SqlValue),
    /// Binds itself, optionally with a declared type and type name.
    SelfBinding(Option<DeclaredParameter>, Arc<dyn SqlTypeValue>),
}

impl ParameterValue {
    #[must_use]
    pub fn plain(value: impl Into<SqlValue>) -> Self {
        Self::Plain(value.into())
    }

    #[must_use]
    pub fn typed(sql_type: SqlType, value: impl Into<SqlValue>) -> Self {
        Self::TypeOverride(DeclaredParameter::new(sql_type), value.into())
    }

    #[must_use]
    pub fn self_binding(value: impl SqlTypeValue + 'static) -> Self {
        Self::SelfBinding(None, Arc::new(value))
    }

    /// The carried value, if the parameter is not self-binding.
    #[must_use]
    pub const fn sql_value(&self) -> Option<&SqlValue> {
        match self {
            Self::Plain(value) | Self::TypeOverride(_, value) => Some(value),
            Self::SelfBinding(..) => None,
        }
    }
}

impl From<SqlValue> for ParameterValue {
    fn from(value: SqlValue) -> Self {
        Self::Plain(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        Self::Plain(value.into())
    }
}

macro_rules! plain_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ParameterValue {
                fn from(value: $ty) -> Self {
                    Self::Plain(value.into())
                }
            }
        )*
    };
}

plain_from!(
    bool,
    &str,
    &String,
    String,
    i8,
    i16,
    i32,
    i64,
    i128,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    Decimal,
    Vec<u8>,
    &[u8],
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    DateTime<FixedOffset>,
    Vec<SqlValue>,
);

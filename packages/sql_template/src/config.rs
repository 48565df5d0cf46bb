use std::{num::ParseIntError, str::FromStr, time::Duration};

use thiserror::Error;

pub const FETCH_SIZE_ENV: &str = "SQL_TEMPLATE_FETCH_SIZE";
pub const MAX_ROWS_ENV: &str = "SQL_TEMPLATE_MAX_ROWS";
pub const QUERY_TIMEOUT_SECS_ENV: &str = "SQL_TEMPLATE_QUERY_TIMEOUT_SECS";

fn read_setting<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = ParseIntError> + Default + PartialEq,
{
    match lookup(name) {
        Some(value) => {
            let value = value
                .trim()
                .parse::<T>()
                .map_err(|source| ConfigError::ParseInt { name, source })?;
            Ok((value != T::default()).then_some(value))
        }
        None => Ok(None),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {source}")]
    ParseInt {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
}

/// Statement settings applied to every prepared statement.
///
/// `None` leaves the driver's default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateConfig {
    fetch_size: Option<usize>,
    max_rows: Option<usize>,
    query_timeout: Option<Duration>,
}

impl TemplateConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fetch_size: None,
            max_rows: None,
            query_timeout: None,
        }
    }

    /// Reads the settings from the `SQL_TEMPLATE_*` environment variables.
    ///
    /// Unset variables and zero values leave the driver default in place.
    ///
    /// # Errors
    ///
    /// * If a variable is set to something other than an unsigned integer
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// * If a variable is set to something other than an unsigned integer
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            fetch_size: read_setting(&lookup, FETCH_SIZE_ENV)?,
            max_rows: read_setting(&lookup, MAX_ROWS_ENV)?,
            query_timeout: read_setting::<u64>(&lookup, QUERY_TIMEOUT_SECS_ENV)?
                .map(Duration::from_secs),
        })
    }

    /// `0` leaves the driver default in place.
    #[must_use]
    pub const fn with_fetch_size(mut self, rows: usize) -> Self {
        self.fetch_size = if rows == 0 { None } else { Some(rows) };
        self
    }

    /// `0` leaves the driver default in place.
    #[must_use]
    pub const fn with_max_rows(mut self, rows: usize) -> Self {
        self.max_rows = if rows == 0 { None } else { Some(rows) };
        self
    }

    /// A zero timeout leaves the driver default in place.
    #[must_use]
    pub const fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = if timeout.is_zero() {
            None
        } else {
            Some(timeout)
        };
        self
    }

    #[must_use]
    pub const fn fetch_size(&self) -> Option<usize> {
        self.fetch_size
    }

    #[must_use]
    pub const fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test_log::test]
    fn unset_variables_leave_driver_defaults() {
        assert_eq!(TemplateConfig::from_lookup(lookup(&[])).unwrap(), TemplateConfig::new());
    }

    #[test_log::test]
    fn reads_all_settings() {
        let config = TemplateConfig::from_lookup(lookup(&[
            (FETCH_SIZE_ENV, "100"),
            (MAX_ROWS_ENV, " 5 "),
            (QUERY_TIMEOUT_SECS_ENV, "30"),
        ]))
        .unwrap();

        assert_eq!(
            config,
            TemplateConfig::new()
                .with_fetch_size(100)
                .with_max_rows(5)
                .with_query_timeout(Duration::from_secs(30))
        );
    }

    #[test_log::test]
    fn zero_means_driver_default() {
        let config = TemplateConfig::from_lookup(lookup(&[(MAX_ROWS_ENV, "0")])).unwrap();

        assert_eq!(config.max_rows(), None);
    }

    #[test_log::test]
    fn zero_builder_values_mean_driver_default() {
        let config = TemplateConfig::new()
            .with_fetch_size(0)
            .with_max_rows(0)
            .with_query_timeout(Duration::ZERO);

        assert_eq!(config, TemplateConfig::new());
    }

    #[test_log::test]
    fn zero_builder_value_clears_an_earlier_setting() {
        let config = TemplateConfig::new().with_max_rows(10).with_max_rows(0);

        assert_eq!(config.max_rows(), None);
    }

    #[test_log::test]
    fn unparsable_value_names_the_variable() {
        let result = TemplateConfig::from_lookup(lookup(&[(FETCH_SIZE_ENV, "lots")]));

        assert!(matches!(
            result,
            Err(ConfigError::ParseInt { name: FETCH_SIZE_ENV, .. })
        ));
    }
}

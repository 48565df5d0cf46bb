//! Per-vendor deviations in null binding, resolved once per connection.

use crate::driver::{Connection, DriverMetadata};

/// How a null is bound when the position has no declared type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullBinding {
    /// Null marker with the generic `NULL` type code.
    #[default]
    TypedNull,
    /// Null marker with the `VARCHAR` type code.
    VarcharNull,
    /// Null passed through the generic object bind with no type.
    UntypedObject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverQuirks {
    pub null_binding: NullBinding,
}

impl DriverQuirks {
    #[must_use]
    pub const fn new(null_binding: NullBinding) -> Self {
        Self { null_binding }
    }

    #[must_use]
    pub fn from_metadata(metadata: &DriverMetadata) -> Self {
        let product = metadata.product_name.as_str();
        let driver = metadata.driver_name.as_str();

        let null_binding =
            if product.starts_with("Informix") || driver.starts_with("Microsoft SQL Server") {
                NullBinding::UntypedObject
            } else if product.starts_with("DB2")
                || driver.starts_with("jConnect")
                || driver.starts_with("SQLServer")
                || driver.starts_with("Apache Derby Embedded")
            {
                NullBinding::VarcharNull
            } else {
                NullBinding::TypedNull
            };

        Self { null_binding }
    }

    /// Reads the connection's metadata. Falls back to the defaults when the
    /// metadata is unavailable.
    #[must_use]
    pub fn resolve(connection: &dyn Connection) -> Self {
        match connection.metadata() {
            Ok(metadata) => Self::from_metadata(&metadata),
            Err(e) => {
                log::debug!("Could not check database or driver name: {e:?}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn quirks(product: &str, driver: &str) -> NullBinding {
        DriverQuirks::from_metadata(&DriverMetadata::new(product, driver)).null_binding
    }

    #[test_log::test]
    fn untyped_object_for_informix_and_microsoft_driver() {
        assert_eq!(quirks("Informix Dynamic Server", "x"), NullBinding::UntypedObject);
        assert_eq!(
            quirks("x", "Microsoft SQL Server JDBC Driver"),
            NullBinding::UntypedObject
        );
    }

    #[test_log::test]
    fn varchar_null_for_declared_vendor_names() {
        assert_eq!(quirks("DB2/LINUX", "x"), NullBinding::VarcharNull);
        assert_eq!(quirks("x", "jConnect (TM) for JDBC"), NullBinding::VarcharNull);
        assert_eq!(quirks("x", "SQLServer"), NullBinding::VarcharNull);
        assert_eq!(quirks("x", "Apache Derby Embedded JDBC Driver"), NullBinding::VarcharNull);
    }

    #[test_log::test]
    fn matching_is_prefix_only() {
        assert_eq!(quirks("IBM DB2", "x"), NullBinding::TypedNull);
        assert_eq!(quirks("SQLite", "rusqlite"), NullBinding::TypedNull);
    }
}

//! SQL type codes.
//!
//! The codes follow the X/Open SQL type numbering that database drivers
//! commonly report, so a declared type can be handed to a driver unchanged.

use std::fmt;

/// An integer SQL type code attached to a bind position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SqlType(i32);

impl SqlType {
    pub const BIT: Self = Self(-7);
    pub const TINYINT: Self = Self(-6);
    pub const SMALLINT: Self = Self(5);
    pub const INTEGER: Self = Self(4);
    pub const BIGINT: Self = Self(-5);
    pub const FLOAT: Self = Self(6);
    pub const REAL: Self = Self(7);
    pub const DOUBLE: Self = Self(8);
    pub const NUMERIC: Self = Self(2);
    pub const DECIMAL: Self = Self(3);
    pub const CHAR: Self = Self(1);
    pub const VARCHAR: Self = Self(12);
    pub const LONGVARCHAR: Self = Self(-1);
    pub const NCHAR: Self = Self(-15);
    pub const NVARCHAR: Self = Self(-9);
    pub const LONGNVARCHAR: Self = Self(-16);
    pub const DATE: Self = Self(91);
    pub const TIME: Self = Self(92);
    pub const TIMESTAMP: Self = Self(93);
    pub const BINARY: Self = Self(-2);
    pub const VARBINARY: Self = Self(-3);
    pub const LONGVARBINARY: Self = Self(-4);
    pub const NULL: Self = Self(0);
    pub const OTHER: Self = Self(1111);
    pub const ARRAY: Self = Self(2003);
    pub const BLOB: Self = Self(2004);
    pub const CLOB: Self = Self(2005);
    pub const NCLOB: Self = Self(2011);
    pub const BOOLEAN: Self = Self(16);

    /// "No type hint supplied". Sits outside the range of every real code.
    pub const UNKNOWN: Self = Self(i32::MIN);

    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_unknown(self) -> bool {
        self.0 == Self::UNKNOWN.0
    }

    /// Types that always bind as text.
    ///
    /// `CLOB`/`NCLOB` are not included since they only bind as text when the
    /// value itself is text-like.
    #[must_use]
    pub const fn is_string_family(self) -> bool {
        matches!(
            self,
            Self::CHAR | Self::VARCHAR | Self::LONGVARCHAR | Self::NCHAR | Self::NVARCHAR
                | Self::LONGNVARCHAR
        )
    }

    #[must_use]
    pub const fn is_character_lob(self) -> bool {
        matches!(self, Self::CLOB | Self::NCLOB)
    }

    #[must_use]
    pub const fn is_exact_decimal(self) -> bool {
        matches!(self, Self::DECIMAL | Self::NUMERIC)
    }

    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::DATE | Self::TIME | Self::TIMESTAMP)
    }

    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::BIT => "BIT",
            Self::TINYINT => "TINYINT",
            Self::SMALLINT => "SMALLINT",
            Self::INTEGER => "INTEGER",
            Self::BIGINT => "BIGINT",
            Self::FLOAT => "FLOAT",
            Self::REAL => "REAL",
            Self::DOUBLE => "DOUBLE",
            Self::NUMERIC => "NUMERIC",
            Self::DECIMAL => "DECIMAL",
            Self::CHAR => "CHAR",
            Self::VARCHAR => "VARCHAR",
            Self::LONGVARCHAR => "LONGVARCHAR",
            Self::NCHAR => "NCHAR",
            Self::NVARCHAR => "NVARCHAR",
            Self::LONGNVARCHAR => "LONGNVARCHAR",
            Self::DATE => "DATE",
            Self::TIME => "TIME",
            Self::TIMESTAMP => "TIMESTAMP",
            Self::BINARY => "BINARY",
            Self::VARBINARY => "VARBINARY",
            Self::LONGVARBINARY => "LONGVARBINARY",
            Self::NULL => "NULL",
            Self::OTHER => "OTHER",
            Self::ARRAY => "ARRAY",
            Self::BLOB => "BLOB",
            Self::CLOB => "CLOB",
            Self::NCLOB => "NCLOB",
            Self::BOOLEAN => "BOOLEAN",
            _ => return None,
        })
    }
}

impl Default for SqlType {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<i32> for SqlType {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

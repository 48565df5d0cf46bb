//! Best-effort conversion of an already fetched value into a required type.

use std::str::FromStr as _;

use rust_decimal::{Decimal, prelude::ToPrimitive as _};

use super::{ConversionError, RequiredType};
use crate::value::SqlValue;

/// Converts `value` into `required` when it does not already have that
/// shape.
///
/// Text targets take the string representation. Numeric targets widen or
/// narrow numeric sources with overflow checks and parse textual sources.
///
/// # Errors
///
/// * If no conversion path exists between the two types
/// * If the value does not fit in the target
/// * If textual input cannot be parsed as the target number type
pub fn convert_value_to_required_type(
    value: SqlValue,
    required: RequiredType,
) -> Result<SqlValue, ConversionError> {
    if required.is_satisfied_by(&value) {
        return Ok(value);
    }

    if required == RequiredType::String {
        return Ok(SqlValue::String(value.to_string()));
    }

    if required.is_numeric() {
        return if value.is_numeric() {
            convert_number_to_target(&value, required)
        } else {
            parse_number(&value.to_string(), required)
        };
    }

    Err(ConversionError::convert_type(&value, required))
}

/// Integral part of a numeric value, truncated toward zero.
fn integral_value(value: &SqlValue, target: RequiredType) -> Result<i128, ConversionError> {
    #[allow(clippy::cast_possible_truncation)]
    fn from_real(real: f64) -> Option<i128> {
        // i128::MAX as f64 rounds up to 2^127, which is out of range
        const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
        let real = real.trunc();
        (real.is_finite() && real < LIMIT && real >= -LIMIT).then(|| real as i128)
    }

    let integral = match value {
        SqlValue::Int8(number) => Some(i128::from(*number)),
        SqlValue::Int16(number) => Some(i128::from(*number)),
        SqlValue::Int32(number) => Some(i128::from(*number)),
        SqlValue::Int64(number) => Some(i128::from(*number)),
        SqlValue::BigInt(number) => Some(*number),
        SqlValue::Real32(number) => from_real(f64::from(*number)),
        SqlValue::Real64(number) => from_real(*number),
        SqlValue::Decimal(number) => number.trunc().to_i128(),
        _ => return Err(ConversionError::convert_type(value, target)),
    };

    integral.ok_or_else(|| ConversionError::overflow(value, target))
}

fn narrow<T: TryFrom<i128>>(
    value: &SqlValue,
    target: RequiredType,
) -> Result<T, ConversionError> {
    T::try_from(integral_value(value, target)?).map_err(|_| ConversionError::overflow(value, target))
}

/// Converts a numeric value into the numeric `target` shape.
///
/// Integer targets take the integral part of the value and fail with
/// [`ConversionError::Overflow`] when it falls outside the target's range.
///
/// # Errors
///
/// * If the value does not fit in the target
/// * If `target` is not a numeric type
pub fn convert_number_to_target(
    value: &SqlValue,
    target: RequiredType,
) -> Result<SqlValue, ConversionError> {
    if target.is_satisfied_by(value) {
        return Ok(value.clone());
    }

    Ok(match target {
        RequiredType::Int8 => SqlValue::Int8(narrow(value, target)?),
        RequiredType::Int16 => SqlValue::Int16(narrow(value, target)?),
        RequiredType::Int32 => SqlValue::Int32(narrow(value, target)?),
        RequiredType::Int64 => SqlValue::Int64(narrow(value, target)?),
        RequiredType::BigInt => SqlValue::BigInt(integral_value(value, target)?),
        RequiredType::Real32 => SqlValue::Real32(real_value(value, target)?),
        RequiredType::Real64 => SqlValue::Real64(real_value(value, target)?),
        RequiredType::Decimal => {
            let text = value.to_string();
            SqlValue::Decimal(
                Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map_err(|_| ConversionError::overflow(value, target))?,
            )
        }
        _ => {
            return Err(ConversionError::Unsupported {
                value: value.to_string(),
                source_type: value.type_label(),
                target,
            });
        }
    })
}

trait FromReal: Sized {
    fn from_f64(value: f64) -> Self;
    fn from_decimal(value: &Decimal) -> Option<Self>;
}

impl FromReal for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn from_decimal(value: &Decimal) -> Option<Self> {
        value.to_f32()
    }
}

impl FromReal for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn from_decimal(value: &Decimal) -> Option<Self> {
        value.to_f64()
    }
}

#[allow(clippy::cast_precision_loss)]
fn real_value<T: FromReal>(value: &SqlValue, target: RequiredType) -> Result<T, ConversionError> {
    Ok(match value {
        SqlValue::Int8(number) => T::from_f64(f64::from(*number)),
        SqlValue::Int16(number) => T::from_f64(f64::from(*number)),
        SqlValue::Int32(number) => T::from_f64(f64::from(*number)),
        SqlValue::Int64(number) => T::from_f64(*number as f64),
        SqlValue::BigInt(number) => T::from_f64(*number as f64),
        SqlValue::Real32(number) => T::from_f64(f64::from(*number)),
        SqlValue::Real64(number) => T::from_f64(*number),
        SqlValue::Decimal(number) => {
            T::from_decimal(number).ok_or_else(|| ConversionError::overflow(value, target))?
        }
        _ => return Err(ConversionError::convert_type(value, target)),
    })
}

fn trim_all_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether `value` carries a hexadecimal prefix (`0x`, `0X` or `#`), after
/// an optional leading minus.
#[must_use]
pub fn is_hex_number(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    digits.starts_with("0x") || digits.starts_with("0X") || digits.starts_with('#')
}

/// Splits an optional leading minus off `value`.
fn split_sign(value: &str) -> (bool, &str) {
    value
        .strip_prefix('-')
        .map_or((false, value), |rest| (true, rest))
}

fn parse_radix(digits: &str, radix: u32) -> Result<i128, String> {
    // from_str_radix would accept a second sign here
    if digits.starts_with(['-', '+']) {
        return Err("Sign character in wrong position".to_string());
    }
    i128::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn decode_hex(value: &str) -> Result<i128, String> {
    let (negative, rest) = split_sign(value);
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
        .unwrap_or(rest);

    let result = parse_radix(digits, 16)?;
    Ok(if negative { -result } else { result })
}

/// Decodes a big integer literal.
///
/// Hexadecimal prefixes select base 16. A leading `0` followed by further
/// digits selects base 8, so zero-padded decimal input such as `"0500"`
/// decodes as octal (`320`).
fn decode_big_integer(value: &str) -> Result<i128, String> {
    let (negative, rest) = split_sign(value);

    let (digits, radix) = if let Some(digits) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (digits, 16)
    } else if rest.len() > 1
        && let Some(digits) = rest.strip_prefix('0')
    {
        (digits, 8)
    } else if negative {
        (rest, 10)
    } else {
        // keep a leading plus sign valid for plain decimal input
        return value.parse::<i128>().map_err(|e| e.to_string());
    };

    let result = parse_radix(digits, radix)?;
    Ok(if negative { -result } else { result })
}

fn parse_integer<T>(trimmed: &str) -> Result<T, String>
where
    T: TryFrom<i128> + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    if is_hex_number(trimmed) {
        T::try_from(decode_hex(trimmed)?).map_err(|_| "Value out of range".to_string())
    } else {
        trimmed.parse::<T>().map_err(|e| e.to_string())
    }
}

/// Parses `text` into the numeric `target` shape.
///
/// All whitespace is removed first. Integer targets honor hexadecimal
/// prefixes and big integers additionally honor the octal rule described on
/// [`decode_big_integer`].
///
/// # Errors
///
/// * If the text is not a valid number for the target
/// * If `target` is not a numeric type
pub fn parse_number(text: &str, target: RequiredType) -> Result<SqlValue, ConversionError> {
    let trimmed = trim_all_whitespace(text);
    let error = |message: String| ConversionError::Parse {
        text: text.to_string(),
        target,
        message,
    };

    Ok(match target {
        RequiredType::Int8 => SqlValue::Int8(parse_integer(&trimmed).map_err(error)?),
        RequiredType::Int16 => SqlValue::Int16(parse_integer(&trimmed).map_err(error)?),
        RequiredType::Int32 => SqlValue::Int32(parse_integer(&trimmed).map_err(error)?),
        RequiredType::Int64 => SqlValue::Int64(parse_integer(&trimmed).map_err(error)?),
        RequiredType::BigInt => SqlValue::BigInt(decode_big_integer(&trimmed).map_err(error)?),
        RequiredType::Real32 => {
            SqlValue::Real32(trimmed.parse().map_err(|e| error(format!("{e}")))?)
        }
        RequiredType::Real64 => {
            SqlValue::Real64(trimmed.parse().map_err(|e| error(format!("{e}")))?)
        }
        RequiredType::Decimal | RequiredType::Number => SqlValue::Decimal(
            Decimal::from_str(&trimmed)
                .or_else(|_| Decimal::from_scientific(&trimmed))
                .map_err(|e| error(e.to_string()))?,
        ),
        _ => return Err(error("unsupported target type".to_string())),
    })
}

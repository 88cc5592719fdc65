//! Unit conversion and rounding helpers.
//!
//! Every helper here yields [`HelperOutput::Absent`] for a missing value and
//! an error for text that is not a number.

use serde_json::Value;

use super::{integer_param, integer_value, HelperOutput, Invocation};
use crate::decimal::Decimal;
use crate::error::{RenderError, RenderResult};
use crate::record::scalar_text;

/// Inputs at or above this many kbit/s get a third significant digit.
const MBIT_WIDE_THRESHOLD_KBIT: i64 = 100_000;

/// Bound value as an exact decimal; `None` when absent or blank.
fn decimal_param(inv: &Invocation<'_>, position: usize) -> RenderResult<Option<Decimal>> {
    let value = inv.param(position);
    let text = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.clone(),
        other => {
            return Err(RenderError::malformed_number(
                inv.name,
                scalar_text(other).into_owned(),
            ))
        }
    };
    text.parse()
        .map(Some)
        .map_err(|_| RenderError::malformed_number(inv.name, text))
}

/// Half-up to `digits` significant digits, trailing zeros dropped.
pub fn significant(value: &Decimal, digits: u32) -> String {
    value
        .round_significant(digits)
        .strip_trailing_zeros()
        .to_plain_string()
}

/// Rescaling the bound value left the supported range; reported as bad input.
fn out_of_range(inv: &Invocation<'_>) -> RenderError {
    RenderError::malformed_number(inv.name, scalar_text(inv.param(0)).into_owned())
}

fn formatted(
    inv: &Invocation<'_>,
    format: impl FnOnce(Decimal) -> Option<String>,
) -> RenderResult<HelperOutput> {
    match decimal_param(inv, 0)? {
        Some(value) => format(value)
            .map(HelperOutput::Text)
            .ok_or_else(|| out_of_range(inv)),
        None => Ok(HelperOutput::Absent),
    }
}

/// `{{add n inc}}`: integer sum.
pub fn add(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    if inv.param(0).is_null() {
        return Ok(HelperOutput::Absent);
    }
    let base = integer_value(inv.name, inv.param(0))?;
    let increment = integer_param(inv, 1)?;
    let sum = base.checked_add(increment).ok_or_else(|| {
        RenderError::invalid_argument(inv.name, format!("{} + {} overflows", base, increment))
    })?;
    Ok(HelperOutput::Text(sum.to_string()))
}

/// `{{toMbit kbit}}`: kbit/s to Mbit/s, two significant digits (three from
/// 100 Mbit/s up).
pub fn to_mbit(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    let threshold = Decimal::from(MBIT_WIDE_THRESHOLD_KBIT);
    formatted(inv, |kbit| {
        let digits = if kbit.compare(&threshold).is_ge() { 3 } else { 2 };
        Some(significant(&kbit.shift_right(3)?, digits))
    })
}

/// `{{toMbitRaw kbit}}`: kbit/s to Mbit/s as a number, unformatted.
pub fn to_mbit_raw(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    Ok(match decimal_param(inv, 0)? {
        Some(kbit) => {
            let mbit = kbit.shift_right(3).ok_or_else(|| out_of_range(inv))?;
            HelperOutput::Value(Value::from(mbit.to_f64()))
        }
        None => HelperOutput::Absent,
    })
}

/// `{{toMB bytes}}`
pub fn to_mb(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    formatted(inv, |bytes| Some(significant(&bytes.shift_right(6)?, 2)))
}

pub fn two_significant_digits(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    formatted(inv, |value| Some(significant(&value, 2)))
}

/// `{{roundNumber value decimals}}`: half-up, fraction kept at exactly
/// `decimals` digits.
pub fn round_number(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    let Some(value) = decimal_param(inv, 0)? else {
        return Ok(HelperOutput::Absent);
    };
    let decimals = integer_param(inv, 1)?;
    let rounded = i32::try_from(decimals)
        .ok()
        .and_then(|places| value.round_half_up(places))
        .ok_or_else(|| {
            RenderError::invalid_argument(
                inv.name,
                format!("{} decimals is out of range", decimals),
            )
        })?;
    Ok(HelperOutput::Text(rounded.to_plain_string()))
}

/// `{{roundUp value}}`: toward positive infinity, integer result.
pub fn round_up(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    formatted(inv, |value| Some(value.round_ceiling(0)?.to_plain_string()))
}

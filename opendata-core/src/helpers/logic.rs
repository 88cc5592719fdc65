//! Branching and iteration helpers.

use std::cmp::Ordering;
use std::ops::Range;

use serde_json::Value;

use super::{integer_param, integer_value, BlockScope, Invocation, Scope};
use crate::decimal::Decimal;
use crate::error::{RenderError, RenderResult};
use crate::record::scalar_text;

fn branch(condition: bool, block: &mut dyn BlockScope) -> RenderResult<String> {
    if condition {
        block.primary(None)
    } else {
        block.inverse()
    }
}

/// `false`, `null`, `0`, `""` and `[]` are falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

pub fn if_truthy(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    branch(is_truthy(inv.param(0)), block)
}

pub fn unless(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    branch(!is_truthy(inv.param(0)), block)
}

/// Renders the block once per array element or object entry, with `@index`
/// (and `@key` for objects) set. Empty or non-iterable input takes the
/// `{{else}}` branch.
pub fn each(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    let mut out = String::new();
    match inv.param(0) {
        Value::Array(items) if !items.is_empty() => {
            for (index, item) in items.iter().enumerate() {
                out.push_str(&block.primary(Some(Scope::item(item.clone(), index)))?);
            }
        }
        Value::Object(entries) if !entries.is_empty() => {
            for (index, (key, item)) in entries.iter().enumerate() {
                out.push_str(&block.primary(Some(Scope::entry(key, item.clone(), index)))?);
            }
        }
        _ => return block.inverse(),
    }
    Ok(out)
}

/// Array membership, or key presence for objects.
pub fn contains(container: &Value, element: &Value) -> bool {
    match container {
        Value::Array(items) => items.contains(element),
        Value::Object(entries) => entries.contains_key(&*scalar_text(element)),
        _ => false,
    }
}

/// `{{#ifContains list element}}`
pub fn if_contains(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    branch(contains(inv.param(0), inv.param(1)), block)
}

/// `{{#ifNotContains list element}}`
pub fn if_not_contains(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    branch(!contains(inv.param(0), inv.param(1)), block)
}

/// `{{#ifLessOrEqual list size}}` (also registered as `IfLE`): primary when
/// the list has at most `size` elements. A missing list counts as short
/// enough.
pub fn if_less_or_equal(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    let bound = integer_param(inv, 1)?;
    let fits = match inv.param(0) {
        Value::Null => true,
        Value::Array(items) => i64::try_from(items.len()).map_or(false, |len| len <= bound),
        other => {
            return Err(RenderError::invalid_argument(
                inv.name,
                format!("expected a list, got {}", other),
            ))
        }
    };
    branch(fits, block)
}

/// `[offset, offset + size)` clipped to `len`; an offset past the end is an
/// empty range.
pub fn slice_bounds(len: usize, size: usize, offset: usize) -> Range<usize> {
    let start = offset.min(len);
    let end = offset.saturating_add(size).min(len);
    start..end
}

fn count_param(inv: &Invocation<'_>, position: usize) -> RenderResult<usize> {
    let value = integer_param(inv, position)?;
    usize::try_from(value).map_err(|_| {
        RenderError::invalid_argument(inv.name, format!("parameter {} is negative", position))
    })
}

/// `{{#slice list size offset}}`: renders the block for each element in the
/// window, with the element as context and its list position as `@index`.
pub fn slice(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    let size = count_param(inv, 1)?;
    let offset = count_param(inv, 2)?;
    let items = match inv.param(0) {
        Value::Null => return Ok(String::new()),
        Value::Array(items) => items,
        other => {
            return Err(RenderError::invalid_argument(
                inv.name,
                format!("expected a list, got {}", other),
            ))
        }
    };
    let mut out = String::new();
    for index in slice_bounds(items.len(), size, offset) {
        out.push_str(&block.primary(Some(Scope::item(items[index].clone(), index)))?);
    }
    Ok(out)
}

/// Comparison operator accepted by `ifCond`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    /// Evaluates exactly like [`Operator::Equal`].
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
}

impl Operator {
    /// `None` for tokens outside the operator set.
    pub fn parse(token: &str) -> Option<Operator> {
        Some(match token {
            "==" | "===" => Operator::Equal,
            "!=" | "!==" => Operator::NotEqual,
            "<" => Operator::Less,
            "<=" => Operator::LessOrEqual,
            ">" => Operator::Greater,
            ">=" | "=>" => Operator::GreaterOrEqual,
            "&&" => Operator::And,
            "||" => Operator::Or,
            _ => return None,
        })
    }
}

/// Lists compare by their length.
fn operand_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items.len().to_string(),
        other => scalar_text(other).into_owned(),
    }
}

fn operand_number(helper: &str, text: &str) -> RenderResult<Decimal> {
    text.parse()
        .map_err(|_| RenderError::malformed_number(helper, text))
}

fn operand_bool(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// Evaluates `left op right` on the operands' text forms.
pub fn evaluate(helper: &str, left: &Value, op: Operator, right: &Value) -> RenderResult<bool> {
    let (left, right) = (operand_text(left), operand_text(right));
    let ordering = |l: &str, r: &str| -> RenderResult<Ordering> {
        Ok(operand_number(helper, l)?.compare(&operand_number(helper, r)?))
    };
    Ok(match op {
        Operator::Equal | Operator::NotEqual => left == right,
        Operator::Less => ordering(&left, &right)?.is_lt(),
        Operator::LessOrEqual => ordering(&left, &right)?.is_le(),
        Operator::Greater => ordering(&left, &right)?.is_gt(),
        Operator::GreaterOrEqual => ordering(&left, &right)?.is_ge(),
        Operator::And => operand_bool(&left) && operand_bool(&right),
        Operator::Or => operand_bool(&left) || operand_bool(&right),
    })
}

/// `{{#ifCond a 'op' b}}`. Unknown operators take the `{{else}}` branch.
pub fn if_cond(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    let token = scalar_text(inv.param(1));
    match Operator::parse(&token) {
        Some(op) => branch(evaluate(inv.name, inv.param(0), op, inv.param(2))?, block),
        None => block.inverse(),
    }
}

/// `{{#times n}}`: renders the block `n` times; the zero-based counter is
/// both the context and `@index`.
pub fn times(inv: &Invocation<'_>, block: &mut dyn BlockScope) -> RenderResult<String> {
    if inv.param(0).is_null() {
        return Ok(String::new());
    }
    let n = integer_value(inv.name, inv.param(0))?;
    let mut out = String::new();
    for i in 0..n.max(0) {
        let index = usize::try_from(i).map_err(|_| {
            RenderError::invalid_argument(inv.name, format!("{} repetitions", n))
        })?;
        out.push_str(&block.primary(Some(Scope::item(Value::from(i), index)))?);
    }
    Ok(out)
}

//! Helper runtime for report templates.
//!
//! A helper is a plain function looked up by name. The table is fixed when
//! the registry is built and never mutated afterwards, so one registry can be
//! shared by any number of concurrent renders.
//!
//! Two kinds exist:
//! - inline helpers (`{{toMbit download_kbit}}`) return a [`HelperOutput`];
//! - block helpers (`{{#ifCond a '>' b}}…{{else}}…{{/ifCond}}`) decide which
//!   branch to render, and how often, through a [`BlockScope`].

pub mod logic;
pub mod numeric;
pub mod text;
pub mod time;

use std::collections::HashMap;

use chrono_tz::Tz;
use serde_json::Value;

use crate::error::{RenderError, RenderResult};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Prague;
pub const DEFAULT_LANGUAGE: &str = "en";

/// Knobs shared by all helpers of one registry.
#[derive(Debug, Clone, PartialEq)]
pub struct HelperSettings {
    /// Target zone of `toLocalTime`
    pub timezone: Tz,
    /// Language `translateBool` falls back to
    pub default_language: String,
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// What an inline helper produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HelperOutput {
    /// Text, escaped by `{{ }}`
    Text(String),
    /// Pre-escaped markup, never escaped again
    Safe(String),
    /// A JSON value rendered in its text form
    Value(Value),
    /// Nothing to render
    Absent,
}

impl HelperOutput {
    pub fn text(s: impl Into<String>) -> Self {
        HelperOutput::Text(s.into())
    }
}

/// Context pushed for one rendering of a block body.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub value: Value,
    pub index: Option<usize>,
    pub key: Option<String>,
}

impl Scope {
    pub fn item(value: Value, index: usize) -> Self {
        Self {
            value,
            index: Some(index),
            key: None,
        }
    }

    pub fn entry(key: impl Into<String>, value: Value, index: usize) -> Self {
        Self {
            value,
            index: Some(index),
            key: Some(key.into()),
        }
    }
}

/// Access to the two branches of a block while a block helper runs.
pub trait BlockScope {
    /// Renders the main branch, in a new scope or (with `None`) in the
    /// enclosing one.
    fn primary(&mut self, scope: Option<Scope>) -> RenderResult<String>;

    /// Renders the `{{else}}` branch; empty when the block has none.
    fn inverse(&mut self) -> RenderResult<String>;
}

/// Arguments of one helper call, already resolved against the context.
#[derive(Debug)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub params: &'a [Value],
    pub settings: &'a HelperSettings,
}

static NULL: Value = Value::Null;

impl<'a> Invocation<'a> {
    pub fn new(name: &'a str, params: &'a [Value], settings: &'a HelperSettings) -> Self {
        Self {
            name,
            params,
            settings,
        }
    }

    /// Positional parameter; missing ones read as `null`.
    pub fn param(&self, position: usize) -> &'a Value {
        self.params.get(position).unwrap_or(&NULL)
    }

    pub fn required(&self, position: usize) -> RenderResult<&'a Value> {
        match self.params.get(position) {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(RenderError::missing_param(self.name, position)),
        }
    }
}

pub type InlineFn = fn(&Invocation<'_>) -> RenderResult<HelperOutput>;
pub type BlockFn = fn(&Invocation<'_>, &mut dyn BlockScope) -> RenderResult<String>;

#[derive(Clone, Copy)]
pub enum Helper {
    Inline(InlineFn),
    Block(BlockFn),
}

impl std::fmt::Debug for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Helper::Inline(_) => f.write_str("Helper::Inline"),
            Helper::Block(_) => f.write_str("Helper::Block"),
        }
    }
}

/// Every helper a default registry knows, built-ins included.
pub const DEFAULT_HELPERS: &[(&str, Helper)] = &[
    ("if", Helper::Block(logic::if_truthy)),
    ("unless", Helper::Block(logic::unless)),
    ("each", Helper::Block(logic::each)),
    ("add", Helper::Inline(numeric::add)),
    ("ifContains", Helper::Block(logic::if_contains)),
    ("ifNotContains", Helper::Block(logic::if_not_contains)),
    ("ifLessOrEqual", Helper::Block(logic::if_less_or_equal)),
    ("IfLE", Helper::Block(logic::if_less_or_equal)),
    ("slice", Helper::Block(logic::slice)),
    ("ifCond", Helper::Block(logic::if_cond)),
    ("times", Helper::Block(logic::times)),
    ("toMbit", Helper::Inline(numeric::to_mbit)),
    ("toMbitRaw", Helper::Inline(numeric::to_mbit_raw)),
    ("toMB", Helper::Inline(numeric::to_mb)),
    ("twoSignificantDigits", Helper::Inline(numeric::two_significant_digits)),
    ("roundNumber", Helper::Inline(numeric::round_number)),
    ("roundUp", Helper::Inline(numeric::round_up)),
    ("nl2br", Helper::Inline(text::nl2br)),
    ("removeFirst", Helper::Inline(text::remove_first)),
    ("translateBool", Helper::Inline(text::translate_bool)),
    ("toLocalFormat", Helper::Inline(time::to_local_format)),
    ("toLocalTime", Helper::Inline(time::to_local_time)),
];

/// Name → helper table plus the settings handed to every call.
#[derive(Debug, Clone)]
pub struct HelperRegistry {
    helpers: HashMap<&'static str, Helper>,
    settings: HelperSettings,
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::with_defaults(HelperSettings::default())
    }
}

impl HelperRegistry {
    pub fn with_defaults(settings: HelperSettings) -> Self {
        Self {
            helpers: DEFAULT_HELPERS.iter().copied().collect(),
            settings,
        }
    }

    pub fn settings(&self) -> &HelperSettings {
        &self.settings
    }

    pub fn get(&self, name: &str) -> Option<Helper> {
        self.helpers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Looks up `name`, failing instead of rendering nothing.
    pub fn resolve(&self, name: &str) -> RenderResult<Helper> {
        self.get(name)
            .ok_or_else(|| RenderError::unknown_helper(name))
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.helpers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Calls an inline helper directly, outside any template.
    pub fn call(&self, name: &str, params: &[Value]) -> RenderResult<HelperOutput> {
        match self.resolve(name)? {
            Helper::Inline(f) => f(&Invocation::new(name, params, &self.settings)),
            Helper::Block(_) => Err(RenderError::BlockRequired {
                name: name.to_string(),
            }),
        }
    }

    /// Calls a block helper directly with caller-supplied branches.
    pub fn call_block(
        &self,
        name: &str,
        params: &[Value],
        block: &mut dyn BlockScope,
    ) -> RenderResult<String> {
        match self.resolve(name)? {
            Helper::Block(f) => f(&Invocation::new(name, params, &self.settings), block),
            Helper::Inline(_) => Err(RenderError::NotABlock {
                name: name.to_string(),
            }),
        }
    }
}

/// Integer parameter; numeric strings are accepted.
pub(crate) fn integer_param(inv: &Invocation<'_>, position: usize) -> RenderResult<i64> {
    let value = inv.required(position)?;
    integer_value(inv.name, value)
}

pub(crate) fn integer_value(helper: &str, value: &Value) -> RenderResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RenderError::malformed_number(helper, crate::record::scalar_text(value).into_owned())
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records which branch a block helper picked.
    #[derive(Default)]
    pub struct BranchRecorder {
        pub scopes: Vec<Scope>,
    }

    impl BlockScope for BranchRecorder {
        fn primary(&mut self, scope: Option<Scope>) -> RenderResult<String> {
            match scope {
                Some(scope) => {
                    let text = crate::record::scalar_text(&scope.value).into_owned();
                    self.scopes.push(scope);
                    Ok(format!("[{}]", text))
                }
                None => Ok("yes".to_string()),
            }
        }

        fn inverse(&mut self) -> RenderResult<String> {
            Ok("no".to_string())
        }
    }

    pub fn block(name: &str, params: &[Value]) -> String {
        HelperRegistry::default()
            .call_block(name, params, &mut BranchRecorder::default())
            .unwrap()
    }

    pub fn inline(name: &str, params: &[Value]) -> HelperOutput {
        HelperRegistry::default().call(name, params).unwrap()
    }
}

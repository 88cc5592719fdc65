//! A small mustache-style template engine for reports.
//!
//! Supported syntax:
//! - `{{path}}` HTML-escaped output, `{{{path}}}` raw output
//! - `{{helper arg ...}}` inline helper calls
//! - `{{#helper arg ...}}…{{else}}…{{/helper}}` block helpers
//! - `{{! comment }}` and `{{!-- comment --}}`
//!
//! Paths are dotted (`a.b`, `list.0`), may climb scopes with `../`, and
//! `this`, `@index`, `@key` and `@first` work inside blocks. Arguments can
//! also be `'single'`/`"double"` quoted strings, numbers, `true`, `false`
//! and `null`.

mod parser;
mod render;

use std::str::FromStr;

use serde_json::Value;

use crate::error::{RenderError, RenderResult};
use crate::helpers::HelperRegistry;

/// A compiled template, reusable across renders and threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<parser::Node>,
}

impl Template {
    pub fn compile(source: &str) -> RenderResult<Template> {
        Ok(Template {
            nodes: parser::parse(source)?,
        })
    }

    pub fn render(&self, registry: &HelperRegistry, context: &Value) -> RenderResult<String> {
        let mut out = String::new();
        render::Renderer::new(registry, context).render_nodes(&self.nodes, &mut out)?;
        Ok(out)
    }
}

impl FromStr for Template {
    type Err = RenderError;

    fn from_str(s: &str) -> RenderResult<Template> {
        Template::compile(s)
    }
}

/// Compiles and renders in one step.
pub fn render_str(source: &str, registry: &HelperRegistry, context: &Value) -> RenderResult<String> {
    Template::compile(source)?.render(registry, context)
}

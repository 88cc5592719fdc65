//! Node tree evaluation against a JSON context.

use std::borrow::Cow;

use serde_json::Value;

use super::parser::{Block, Expr, Node, Param, Path, Target};
use crate::error::{RenderError, RenderResult};
use crate::helpers::text::escape_html;
use crate::helpers::{BlockScope, Helper, HelperOutput, HelperRegistry, Invocation, Scope};
use crate::record::scalar_text;

struct Frame<'c> {
    value: Cow<'c, Value>,
    index: Option<usize>,
    key: Option<String>,
}

pub(crate) struct Renderer<'r, 'c> {
    registry: &'r HelperRegistry,
    frames: Vec<Frame<'c>>,
}

impl<'r, 'c> Renderer<'r, 'c> {
    pub fn new(registry: &'r HelperRegistry, context: &'c Value) -> Self {
        Self {
            registry,
            frames: vec![Frame {
                value: Cow::Borrowed(context),
                index: None,
                key: None,
            }],
        }
    }

    pub fn render_nodes(&mut self, nodes: &[Node], out: &mut String) -> RenderResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr(expr) => self.render_expr(expr, out)?,
                Node::Block(block) => self.render_block(block, out)?,
            }
        }
        Ok(())
    }

    fn render_expr(&mut self, expr: &Expr, out: &mut String) -> RenderResult<()> {
        let helper = expr
            .head
            .helper_name()
            .and_then(|name| Some((name, self.registry.get(name)?)));

        let output = match helper {
            Some((name, Helper::Inline(f))) => {
                let params = self.resolve_all(&expr.params);
                f(&Invocation::new(name, &params, self.registry.settings()))?
            }
            Some((name, Helper::Block(_))) => {
                return Err(RenderError::BlockRequired {
                    name: name.to_string(),
                })
            }
            None if !expr.params.is_empty() => {
                return Err(RenderError::unknown_helper(param_label(&expr.head)))
            }
            None => HelperOutput::Value(self.resolve(&expr.head)),
        };

        let text = match output {
            HelperOutput::Safe(html) => {
                out.push_str(&html);
                return Ok(());
            }
            HelperOutput::Absent => return Ok(()),
            HelperOutput::Text(text) => Cow::Owned(text),
            HelperOutput::Value(value) => Cow::Owned(scalar_text(&value).into_owned()),
        };
        if expr.escape {
            out.push_str(&escape_html(&text));
        } else {
            out.push_str(&text);
        }
        Ok(())
    }

    fn render_block(&mut self, block: &Block, out: &mut String) -> RenderResult<()> {
        let registry = self.registry;
        let f = match registry.resolve(&block.name)? {
            Helper::Block(f) => f,
            Helper::Inline(_) => {
                return Err(RenderError::NotABlock {
                    name: block.name.clone(),
                })
            }
        };
        let params = self.resolve_all(&block.params);
        let invocation = Invocation::new(&block.name, &params, registry.settings());
        let mut scope = BlockRun {
            renderer: self,
            block,
        };
        out.push_str(&f(&invocation, &mut scope)?);
        Ok(())
    }

    fn resolve_all(&self, params: &[Param]) -> Vec<Value> {
        params.iter().map(|p| self.resolve(p)).collect()
    }

    /// Missing paths resolve to `null`.
    fn resolve(&self, param: &Param) -> Value {
        match param {
            Param::Literal(value) => value.clone(),
            Param::Path(path) => self.lookup(path).unwrap_or(Value::Null),
        }
    }

    fn lookup(&self, path: &Path) -> Option<Value> {
        let depth = self.frames.len().checked_sub(path.parents + 1)?;
        match &path.target {
            Target::Field(segments) => {
                let mut current: &Value = &self.frames[depth].value;
                for segment in segments {
                    current = match current {
                        Value::Object(map) => map.get(segment)?,
                        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                        _ => return None,
                    };
                }
                Some(current.clone())
            }
            Target::Data(name) => {
                let frame = self.frames[..=depth]
                    .iter()
                    .rev()
                    .find(|f| f.index.is_some())?;
                match name.as_str() {
                    "index" => frame.index.map(Value::from),
                    "first" => frame.index.map(|i| Value::Bool(i == 0)),
                    "key" => frame.key.clone().map(Value::String),
                    _ => None,
                }
            }
        }
    }
}

fn param_label(param: &Param) -> String {
    match param {
        Param::Path(path) => path.raw.clone(),
        Param::Literal(value) => value.to_string(),
    }
}

/// The block currently being evaluated, handed to its helper.
struct BlockRun<'a, 'r, 'c> {
    renderer: &'a mut Renderer<'r, 'c>,
    block: &'a Block,
}

impl BlockScope for BlockRun<'_, '_, '_> {
    fn primary(&mut self, scope: Option<Scope>) -> RenderResult<String> {
        let mut out = String::new();
        let Some(scope) = scope else {
            self.renderer.render_nodes(&self.block.body, &mut out)?;
            return Ok(out);
        };
        self.renderer.frames.push(Frame {
            value: Cow::Owned(scope.value),
            index: scope.index,
            key: scope.key,
        });
        let result = self.renderer.render_nodes(&self.block.body, &mut out);
        self.renderer.frames.pop();
        result.map(|()| out)
    }

    fn inverse(&mut self) -> RenderResult<String> {
        let mut out = String::new();
        self.renderer.render_nodes(&self.block.inverse, &mut out)?;
        Ok(out)
    }
}

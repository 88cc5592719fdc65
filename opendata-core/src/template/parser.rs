//! Template source → node tree.

use serde_json::Value;

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    /// `{{head params...}}` or `{{{head params...}}}`
    Expr(Expr),
    /// `{{#name params...}}body{{else}}inverse{{/name}}`
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Expr {
    pub head: Param,
    pub params: Vec<Param>,
    pub escape: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Block {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Node>,
    pub inverse: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Param {
    Literal(Value),
    Path(Path),
}

impl Param {
    /// Bare single-segment path, the only form that can name a helper.
    pub fn helper_name(&self) -> Option<&str> {
        match self {
            Param::Path(Path {
                parents: 0,
                target: Target::Field(segments),
                ..
            }) if segments.len() == 1 => Some(&segments[0]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    pub raw: String,
    /// Number of leading `../`
    pub parents: usize,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    /// `@index`, `@key`, `@first`
    Data(String),
    /// Dotted field path; empty means the context itself (`this`, `.`)
    Field(Vec<String>),
}

enum Tag<'s> {
    Comment,
    Expr { inner: &'s str, escape: bool },
    Open(&'s str),
    Close(&'s str),
    Else,
}

struct OpenBlock {
    name: String,
    params: Vec<Param>,
    offset: usize,
    body: Vec<Node>,
    inverse: Option<Vec<Node>>,
}

impl OpenBlock {
    fn target(&mut self) -> &mut Vec<Node> {
        match self.inverse.as_mut() {
            Some(inverse) => inverse,
            None => &mut self.body,
        }
    }
}

pub(crate) fn parse(source: &str) -> RenderResult<Vec<Node>> {
    let mut root = Vec::new();
    let mut stack: Vec<OpenBlock> = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let Some(rel) = source[pos..].find("{{") else {
            push(&mut stack, &mut root, Node::Text(source[pos..].to_string()));
            break;
        };
        if rel > 0 {
            push(
                &mut stack,
                &mut root,
                Node::Text(source[pos..pos + rel].to_string()),
            );
        }
        let start = pos + rel;
        let (tag, end) = read_tag(source, start)?;
        pos = end;

        match tag {
            Tag::Comment => {}
            Tag::Expr { inner, escape } => {
                let mut tokens = tokenize(inner, start)?.into_iter();
                let head = tokens
                    .next()
                    .ok_or_else(|| RenderError::parse(start, "empty expression"))?;
                push(
                    &mut stack,
                    &mut root,
                    Node::Expr(Expr {
                        head,
                        params: tokens.collect(),
                        escape,
                    }),
                );
            }
            Tag::Open(inner) => {
                let mut tokens = tokenize(inner, start)?.into_iter();
                let name = tokens
                    .next()
                    .as_ref()
                    .and_then(Param::helper_name)
                    .map(str::to_string)
                    .ok_or_else(|| RenderError::parse(start, "block needs a helper name"))?;
                stack.push(OpenBlock {
                    name,
                    params: tokens.collect(),
                    offset: start,
                    body: Vec::new(),
                    inverse: None,
                });
            }
            Tag::Else => {
                let open = stack
                    .last_mut()
                    .ok_or_else(|| RenderError::parse(start, "{{else}} outside a block"))?;
                if open.inverse.is_some() {
                    return Err(RenderError::parse(start, "second {{else}} in one block"));
                }
                open.inverse = Some(Vec::new());
            }
            Tag::Close(name) => {
                let open = stack.pop().ok_or_else(|| {
                    RenderError::parse(start, format!("{{{{/{}}}}} closes nothing", name))
                })?;
                if open.name != name {
                    return Err(RenderError::parse(
                        start,
                        format!("{{{{/{}}}}} does not match {{{{#{}}}}}", name, open.name),
                    ));
                }
                let block = Node::Block(Block {
                    name: open.name,
                    params: open.params,
                    body: open.body,
                    inverse: open.inverse.unwrap_or_default(),
                });
                push(&mut stack, &mut root, block);
            }
        }
    }

    match stack.pop() {
        Some(open) => Err(RenderError::parse(
            open.offset,
            format!("{{{{#{}}}}} is never closed", open.name),
        )),
        None => Ok(root),
    }
}

fn push(stack: &mut [OpenBlock], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(open) => open.target().push(node),
        None => root.push(node),
    }
}

/// Reads the tag starting at `start` (which points at `{{`) and returns it
/// with the offset just past its closing braces.
fn read_tag(source: &str, start: usize) -> RenderResult<(Tag<'_>, usize)> {
    let rest = &source[start..];
    let unclosed = || RenderError::parse(start, "unclosed tag");

    if let Some(body) = rest.strip_prefix("{{!--") {
        let close = body.find("--}}").ok_or_else(unclosed)?;
        return Ok((Tag::Comment, start + 5 + close + 4));
    }
    if let Some(body) = rest.strip_prefix("{{!") {
        let close = body.find("}}").ok_or_else(unclosed)?;
        return Ok((Tag::Comment, start + 3 + close + 2));
    }
    if let Some(body) = rest.strip_prefix("{{{") {
        let close = body.find("}}}").ok_or_else(unclosed)?;
        let tag = Tag::Expr {
            inner: body[..close].trim(),
            escape: false,
        };
        return Ok((tag, start + 3 + close + 3));
    }

    let body = &rest[2..];
    let close = body.find("}}").ok_or_else(unclosed)?;
    let inner = body[..close].trim();
    let end = start + 2 + close + 2;
    let tag = if let Some(open) = inner.strip_prefix('#') {
        Tag::Open(open.trim())
    } else if let Some(name) = inner.strip_prefix('/') {
        Tag::Close(name.trim())
    } else if inner == "else" {
        Tag::Else
    } else {
        Tag::Expr {
            inner,
            escape: true,
        }
    };
    Ok((tag, end))
}

/// Splits a tag body on whitespace, keeping quoted strings together.
fn tokenize(inner: &str, offset: usize) -> RenderResult<Vec<Param>> {
    let mut params = Vec::new();
    let mut chars = inner.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' || c == '\'' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            for (_, ch) in chars.by_ref() {
                if ch == c {
                    closed = true;
                    break;
                }
                literal.push(ch);
            }
            if !closed {
                return Err(RenderError::parse(offset, "unterminated string literal"));
            }
            params.push(Param::Literal(Value::String(literal)));
            continue;
        }
        let mut end = inner.len();
        while let Some(&(j, ch)) = chars.peek() {
            if ch.is_whitespace() {
                end = j;
                break;
            }
            chars.next();
        }
        params.push(word(&inner[i..end], offset)?);
    }
    Ok(params)
}

fn word(token: &str, offset: usize) -> RenderResult<Param> {
    match token {
        "true" => return Ok(Param::Literal(Value::Bool(true))),
        "false" => return Ok(Param::Literal(Value::Bool(false))),
        "null" => return Ok(Param::Literal(Value::Null)),
        _ => {}
    }
    if let Some(number) = number_literal(token) {
        return Ok(Param::Literal(number));
    }
    path(token, offset).map(Param::Path)
}

fn number_literal(token: &str) -> Option<Value> {
    let digits = token.strip_prefix('-').unwrap_or(token);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(n) = token.parse::<i64>() {
        return Some(Value::from(n));
    }
    token
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn path(token: &str, offset: usize) -> RenderResult<Path> {
    let mut rest = token;
    let mut parents = 0;
    while let Some(stripped) = rest.strip_prefix("../") {
        parents += 1;
        rest = stripped;
    }

    let target = if let Some(name) = rest.strip_prefix('@') {
        match name {
            "index" | "key" | "first" => Target::Data(name.to_string()),
            _ => {
                return Err(RenderError::parse(
                    offset,
                    format!("unknown data variable '@{}'", name),
                ))
            }
        }
    } else if rest == "this" || rest == "." {
        Target::Field(Vec::new())
    } else {
        let rest = rest
            .strip_prefix("this.")
            .or_else(|| rest.strip_prefix("this/"))
            .unwrap_or(rest);
        let segments: Vec<String> = rest.split(|c| c == '.' || c == '/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(RenderError::parse(offset, format!("bad path '{}'", token)));
        }
        Target::Field(segments)
    };

    Ok(Path {
        raw: token.to_string(),
        parents,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(parts: &[&str]) -> Param {
        Param::Path(Path {
            raw: parts.join("."),
            parents: 0,
            target: Target::Field(parts.iter().map(|s| s.to_string()).collect()),
        })
    }

    #[test]
    fn parses_text_expressions_and_blocks() {
        let nodes = parse("Hi {{name}}!{{#if ok}}y{{else}}n{{/if}}").unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], Node::Text("Hi ".into()));
        assert_eq!(
            nodes[1],
            Node::Expr(Expr {
                head: field(&["name"]),
                params: vec![],
                escape: true
            })
        );
        match &nodes[3] {
            Node::Block(block) => {
                assert_eq!(block.name, "if");
                assert_eq!(block.body, vec![Node::Text("y".into())]);
                assert_eq!(block.inverse, vec![Node::Text("n".into())]);
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn tokenizes_literals() {
        let nodes = parse(r#"{{#ifCond a.b '>' -1.5}}{{/ifCond}}{{x "two words" true null 7}}"#)
            .unwrap();
        match &nodes[0] {
            Node::Block(block) => assert_eq!(
                block.params,
                vec![
                    field(&["a", "b"]),
                    Param::Literal(Value::from(">")),
                    Param::Literal(Value::from(-1.5)),
                ]
            ),
            other => panic!("{:?}", other),
        }
        match &nodes[1] {
            Node::Expr(expr) => assert_eq!(
                expr.params,
                vec![
                    Param::Literal(Value::from("two words")),
                    Param::Literal(Value::Bool(true)),
                    Param::Literal(Value::Null),
                    Param::Literal(Value::from(7)),
                ]
            ),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn parses_paths() {
        let p = path("../../x.y", 0).unwrap();
        assert_eq!(p.parents, 2);
        assert_eq!(p.target, Target::Field(vec!["x".into(), "y".into()]));
        assert_eq!(path("this", 0).unwrap().target, Target::Field(vec![]));
        assert_eq!(
            path("this.z", 0).unwrap().target,
            Target::Field(vec!["z".into()])
        );
        assert_eq!(path("@index", 0).unwrap().target, Target::Data("index".into()));
        assert!(path("a..b", 0).is_err());
        assert!(path("@nope", 0).is_err());
    }

    #[test]
    fn comments_and_raw_tags() {
        let nodes = parse("{{! note }}{{!-- {{x}} --}}{{{html}}}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::Expr(Expr {
                head: field(&["html"]),
                params: vec![],
                escape: false
            })]
        );
    }

    #[test]
    fn reports_offsets_of_structural_errors() {
        assert_eq!(
            parse("ab{{#if x}}c").unwrap_err(),
            RenderError::parse(2, "{{#if}} is never closed")
        );
        assert!(matches!(
            parse("{{#if x}}{{/each}}").unwrap_err(),
            RenderError::Parse { offset: 9, .. }
        ));
        assert!(matches!(
            parse("x{{/if}}").unwrap_err(),
            RenderError::Parse { offset: 1, .. }
        ));
        assert!(matches!(
            parse("{{else}}").unwrap_err(),
            RenderError::Parse { offset: 0, .. }
        ));
        assert!(matches!(
            parse("abc {{name").unwrap_err(),
            RenderError::Parse { offset: 4, .. }
        ));
        assert!(parse("{{x 'open}}").is_err());
        assert!(parse("{{ }}").is_err());
    }
}

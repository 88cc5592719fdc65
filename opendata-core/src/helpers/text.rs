//! Text helpers and HTML escaping.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{HelperOutput, Invocation};
use crate::error::RenderResult;
use crate::record::scalar_text;

static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\n\r|\r|\n").expect("line break regex"));

pub const LINE_BREAK_MARKUP: &str = "<br/>";

/// Localized yes/no words, keyed by language code.
const BOOL_WORDS: &[(&str, &str, &str)] = &[
    ("cs", "Ano", "Ne"),
    ("de", "Ja", "Nein"),
    ("pl", "Tak", "Nie"),
    ("en", "Yes", "No"),
];

/// Escapes `& < > " ' ` =` the way `{{ }}` output is escaped.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\'' | '`' | '='))
    {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// `{{nl2br text}}`: escaped, trimmed, every line break turned into `<br/>`.
pub fn nl2br(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    let text = scalar_text(inv.param(0));
    let escaped = escape_html(&text);
    let html = LINE_BREAK_RE.replace_all(escaped.trim(), LINE_BREAK_MARKUP);
    Ok(HelperOutput::Safe(html.into_owned()))
}

/// `{{removeFirst text}}`: everything after the first character.
pub fn remove_first(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    let text = scalar_text(inv.param(0));
    let mut chars = text.chars();
    chars.next();
    Ok(HelperOutput::text(chars.as_str()))
}

/// Yes/No word for `lang`, falling back to `default_language` and then to
/// English.
pub fn bool_word(value: bool, lang: &str, default_language: &str) -> &'static str {
    let lookup = |code: &str| BOOL_WORDS.iter().find(|(c, _, _)| *c == code);
    let (_, yes, no) = lookup(lang)
        .or_else(|| lookup(default_language))
        .copied()
        .unwrap_or(("en", "Yes", "No"));
    if value {
        yes
    } else {
        no
    }
}

/// `{{translateBool flag lang}}`: `t` (any case) is yes, anything else no.
pub fn translate_bool(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    let flag = match inv.param(0) {
        Value::String(s) => s.trim().eq_ignore_ascii_case("t"),
        _ => false,
    };
    let lang = match inv.param(1) {
        Value::Null => Cow::Borrowed(inv.settings.default_language.as_str()),
        other => scalar_text(other),
    };
    Ok(HelperOutput::text(bool_word(
        flag,
        &lang,
        &inv.settings.default_language,
    )))
}

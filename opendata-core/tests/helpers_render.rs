//! Helpers exercised through full template renders.

use opendata_core::{render_str, HelperRegistry, HelperSettings, RenderError};
use serde_json::{json, Value};

fn render(source: &str, context: Value) -> String {
    render_str(source, &HelperRegistry::default(), &context).unwrap()
}

#[test]
fn speed_formatting() {
    let ctx = json!({"slow": 50000, "fast": 150000, "bytes": 1234567});
    assert_eq!(render("{{toMbit slow}}", ctx.clone()), "50");
    assert_eq!(render("{{toMbit fast}}", ctx.clone()), "150");
    assert_eq!(render("{{toMbitRaw slow}}", ctx.clone()), "50.0");
    assert_eq!(render("{{toMB bytes}}", ctx), "1.2");
}

#[test]
fn rounding_is_plain_decimal_text() {
    assert_eq!(render("{{twoSignificantDigits 0.012345}}", json!({})), "0.012");
    assert_eq!(render("{{roundNumber 2.345 2}}", json!({})), "2.35");
    assert_eq!(render("{{roundUp 1.2}}|{{roundUp -1.7}}", json!({})), "2|-1");
}

#[test]
fn if_cond_branches() {
    let tpl = "{{#ifCond a op b}}primary{{else}}alternate{{/ifCond}}";
    assert_eq!(render(tpl, json!({"a": 5, "op": ">", "b": 3})), "primary");
    assert_eq!(render(tpl, json!({"a": "x", "op": "==", "b": "y"})), "alternate");
    assert_eq!(render(tpl, json!({"a": 1, "op": "%", "b": 2})), "alternate");
    assert_eq!(render(tpl, json!({"a": 5, "op": "==", "b": "5"})), "primary");
    assert_eq!(render(tpl, json!({"a": "true", "op": "&&", "b": false})), "alternate");
    assert_eq!(render(tpl, json!({"a": "TRUE", "op": "||", "b": false})), "primary");
}

#[test]
fn translate_bool_with_language_fallback() {
    assert_eq!(render("{{translateBool 't' 'de'}}", json!({})), "Ja");
    assert_eq!(render("{{translateBool 'F' 'cs'}}", json!({})), "Ne");
    assert_eq!(render("{{translateBool 'f' 'xx'}}", json!({})), "No");

    let settings = HelperSettings {
        default_language: "pl".to_string(),
        ..HelperSettings::default()
    };
    let registry = HelperRegistry::with_defaults(settings);
    assert_eq!(
        render_str("{{translateBool flag}}", &registry, &json!({"flag": "t"})).unwrap(),
        "Tak"
    );
}

#[test]
fn slice_clips_to_bounds() {
    let ctx = json!({"l": ["a", "b", "c", "d"], "s": ["a", "b"]});
    let tpl = |size: u32, offset: u32, list: &str| {
        format!("[{{{{#slice {} {} {}}}}}{{{{this}}}}{{{{/slice}}}}]", list, size, offset)
    };
    assert_eq!(render(&tpl(2, 1, "l"), ctx.clone()), "[bc]");
    assert_eq!(render(&tpl(5, 0, "s"), ctx.clone()), "[ab]");
    assert_eq!(render(&tpl(2, 10, "s"), ctx), "[]");
}

#[test]
fn membership_and_size_bounds() {
    let ctx = json!({"tags": ["lte", "5g"], "caps": {"ipv6": true}, "none": null});
    assert_eq!(
        render("{{#ifContains tags '5g'}}y{{else}}n{{/ifContains}}", ctx.clone()),
        "y"
    );
    assert_eq!(
        render("{{#ifNotContains caps 'ipv6'}}y{{else}}n{{/ifNotContains}}", ctx.clone()),
        "n"
    );
    assert_eq!(
        render("{{#ifLessOrEqual tags 1}}few{{else}}many{{/ifLessOrEqual}}", ctx.clone()),
        "many"
    );
    assert_eq!(
        render("{{#IfLE none 0}}few{{else}}many{{/IfLE}}", ctx),
        "few"
    );
}

#[test]
fn times_passes_the_counter() {
    assert_eq!(
        render("{{#times n}}<{{add @index 1}}>{{/times}}", json!({"n": 3})),
        "<1><2><3>"
    );
    assert_eq!(render("{{#times n}}x{{/times}}", json!({"n": 0})), "");
}

#[test]
fn text_helpers() {
    assert_eq!(
        render("{{nl2br t}}", json!({"t": "  one\r\ntwo\n\rthree\rfour <5>\n"})),
        "one<br/>two<br/>three<br/>four &lt;5&gt;"
    );
    assert_eq!(render("{{removeFirst v}}", json!({"v": "#42"})), "42");
    assert_eq!(render("[{{removeFirst v}}]", json!({})), "[]");
}

#[test]
fn timestamps_reformat_and_shift() {
    let ctx = json!({"t": "2024-07-01 22:30:00"});
    assert_eq!(render("{{toLocalFormat t}}", ctx.clone()), "01.07.2024 22:30:00");
    assert_eq!(render("{{toLocalTime t}}", ctx), "02.07.2024 00:30:00");
}

#[test]
fn failures_are_reported_not_rendered() {
    let registry = HelperRegistry::default();
    assert_eq!(
        render_str("{{toMbit v}}", &registry, &json!({"v": "n/a"})).unwrap_err(),
        RenderError::malformed_number("toMbit", "n/a")
    );
    assert_eq!(
        render_str("{{toLocalTime v}}", &registry, &json!({"v": "yesterday"})).unwrap_err(),
        RenderError::malformed_timestamp("toLocalTime", "yesterday")
    );
    assert!(matches!(
        render_str("{{missingHelper 1}}", &registry, &json!({})),
        Err(RenderError::UnknownHelper { .. })
    ));
    assert!(matches!(
        render_str("{{#ifCond 1 '<' 2}}open", &registry, &json!({})),
        Err(RenderError::Parse { .. })
    ));
}

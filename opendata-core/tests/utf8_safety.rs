/// UTF-8 Safety Tests
///
/// Network and device names arrive in every script there is. Anything that
/// cuts text (removeFirst, escaping, CSV quoting, line-break handling) must
/// work on character boundaries, never on bytes.

use opendata_core::columns::Column;
use opendata_core::{render_str, CsvSerializer, HelperRegistry, Record};
use serde_json::json;

fn render(source: &str, context: serde_json::Value) -> String {
    render_str(source, &HelperRegistry::default(), &context).unwrap()
}

#[test]
fn test_remove_first_drops_a_whole_character() {
    // 4-byte, 3-byte and 2-byte leading characters
    assert_eq!(render("{{removeFirst v}}", json!({"v": "📶LTE"})), "LTE");
    assert_eq!(render("{{removeFirst v}}", json!({"v": "中国移动"})), "国移动");
    assert_eq!(render("{{removeFirst v}}", json!({"v": "Ž"})), "");
}

#[test]
fn test_escaping_keeps_multibyte_text_intact() {
    let ctx = json!({"v": "Kavárna <U Zlatého> & 🍺"});
    assert_eq!(render("{{v}}", ctx), "Kavárna &lt;U Zlatého&gt; &amp; 🍺");
}

#[test]
fn test_nl2br_with_rtl_and_cjk_lines() {
    let ctx = json!({"v": "مرحبا\r\nשלום\nこんにちは"});
    assert_eq!(render("{{nl2br v}}", ctx), "مرحبا<br/>שלום<br/>こんにちは");
}

#[test]
fn test_csv_cells_with_multibyte_text() {
    let cols = vec![Column::field("network_name"), Column::field("model")];
    let records = vec![Ok(Record::from_pairs([
        ("network_name", json!("Orange, Polska 🇵🇱")),
        ("model", json!("Redmi Note 12 \"Pro\" 紅米")),
    ]).unwrap())];

    let mut out = Vec::new();
    CsvSerializer::new(&cols)
        .without_header()
        .serialize(records, &mut out)
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "\"Orange, Polska 🇵🇱\",\"Redmi Note 12 \"\"Pro\"\" 紅米\"\n"
    );
}

#[test]
fn test_each_over_object_with_unicode_keys() {
    let ctx = json!({"m": {"Plzeň": 2, "Praha": 1}});
    assert_eq!(render("{{#each m}}{{@key}}={{this}};{{/each}}", ctx), "Plzeň=2;Praha=1;");
}

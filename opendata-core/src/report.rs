//! Report rendering over a record stream.

use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::helpers::HelperRegistry;
use crate::record::Record;
use crate::template::Template;
use crate::transform::with_derived_fields;

/// Renders `template` with `{ title, count, records }` as context.
///
/// Records carry their derived fields, so templates can use
/// `conditioned_signal_strength` and friends directly. Any record error
/// aborts the report.
#[instrument(skip_all, fields(title = %title))]
pub fn render_report<I>(
    template: &Template,
    records: I,
    registry: &HelperRegistry,
    title: &str,
) -> Result<String>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let records = records
        .into_iter()
        .map(|record| record.map(|r| with_derived_fields(&r).to_json()))
        .collect::<Result<Vec<Value>>>()?;
    debug!(records = records.len(), "rendering report");

    let context = json!({
        "title": title,
        "count": records.len(),
        "records": records,
    });
    Ok(template.render(registry, &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OpenDataError, RenderError};

    fn records() -> Vec<Result<Record>> {
        vec![
            Ok(Record::from_pairs([
                ("download_kbit", json!(150000)),
                ("cat_technology", json!("4G")),
                ("lte_rsrp", json!(-97)),
            ]).unwrap()),
            Ok(Record::from_pairs([
                ("download_kbit", json!(42000)),
                ("cat_technology", json!("WLAN")),
            ]).unwrap()),
        ]
    }

    #[test]
    fn renders_title_count_and_derived_fields() {
        let template = Template::compile(
            "{{title}} ({{count}})\n\
             {{#each records}}{{toMbit download_kbit}} {{technology_family}} {{conditioned_signal_strength}};{{/each}}",
        )
        .unwrap();
        let out =
            render_report(&template, records(), &HelperRegistry::default(), "Daily").unwrap();
        assert_eq!(out, "Daily (2)\n150 mobile -97;42 wlan ;");
    }

    #[test]
    fn record_errors_abort_the_report() {
        let template = Template::compile("{{count}}").unwrap();
        let mut input = records();
        input.push(Err(OpenDataError::invalid_record("line 3", "broken")));
        let err = render_report(&template, input, &HelperRegistry::default(), "x").unwrap_err();
        assert!(matches!(err, OpenDataError::InvalidRecord { .. }));
    }

    #[test]
    fn helper_failures_surface_as_render_errors() {
        let template = Template::compile("{{#each records}}{{toMbit cat_technology}}{{/each}}")
            .unwrap();
        let err =
            render_report(&template, records(), &HelperRegistry::default(), "x").unwrap_err();
        assert!(matches!(
            err,
            OpenDataError::Render {
                source: RenderError::MalformedNumber { .. }
            }
        ));
    }
}

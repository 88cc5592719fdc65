//! Timestamp reformatting helpers.

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::{HelperOutput, Invocation};
use crate::error::{RenderError, RenderResult};
use crate::record::scalar_text;

/// Layout of UTC timestamps in records.
pub const UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Layout shown to readers.
pub const LOCAL_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

fn timestamp_param(inv: &Invocation<'_>) -> RenderResult<Option<NaiveDateTime>> {
    let text = match inv.param(0) {
        Value::Null => return Ok(None),
        other => scalar_text(other),
    };
    NaiveDateTime::parse_from_str(text.trim(), UTC_FORMAT)
        .map(Some)
        .map_err(|_| RenderError::malformed_timestamp(inv.name, text.into_owned()))
}

/// `{{toLocalFormat time}}`: same instant, reader-facing layout.
pub fn to_local_format(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    Ok(match timestamp_param(inv)? {
        Some(utc) => HelperOutput::Text(utc.format(LOCAL_FORMAT).to_string()),
        None => HelperOutput::text(""),
    })
}

/// `{{toLocalTime time}}`: shifted into the configured zone, then formatted
/// like `toLocalFormat`.
pub fn to_local_time(inv: &Invocation<'_>) -> RenderResult<HelperOutput> {
    Ok(match timestamp_param(inv)? {
        Some(utc) => {
            let local = Utc
                .from_utc_datetime(&utc)
                .with_timezone(&inv.settings.timezone);
            HelperOutput::Text(local.format(LOCAL_FORMAT).to_string())
        }
        None => HelperOutput::text(""),
    })
}

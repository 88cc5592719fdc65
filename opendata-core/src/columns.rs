//! Fixed column orders for each export layout.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use crate::record::{scalar_text, Record};
use crate::source::DEFAULT_TIME_FIELD;
use crate::transform::{DerivedRule, CONDITIONED_SIGNAL_STRENGTH, SIGNAL_CONDITIONED_STRENGTH};

pub const SIGNAL_TIME_FIELD: &str = "time";

#[derive(Debug, Clone, Copy)]
pub enum ColumnSource {
    Field(&'static str),
    Derived(DerivedRule),
}

/// One output column: the header text and where its value comes from.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub source: ColumnSource,
}

impl Column {
    /// Column whose header matches the record field name.
    pub const fn field(name: &'static str) -> Self {
        Self {
            header: name,
            source: ColumnSource::Field(name),
        }
    }

    /// Column published under a different header than the record field.
    pub const fn renamed(header: &'static str, field: &'static str) -> Self {
        Self {
            header,
            source: ColumnSource::Field(field),
        }
    }

    pub const fn derived(rule: DerivedRule) -> Self {
        Self {
            header: rule.name,
            source: ColumnSource::Derived(rule),
        }
    }

    /// Cell text for `record`; absent values render as an empty cell.
    pub fn cell<'r>(&self, record: &'r Record) -> Cow<'r, str> {
        match self.source {
            ColumnSource::Field(name) => record.get(name).map(scalar_text).unwrap_or_default(),
            ColumnSource::Derived(rule) => rule
                .apply(record)
                .map(|v| Cow::Owned(scalar_text(&v).into_owned()))
                .unwrap_or_default(),
        }
    }
}

/// Which column set an export uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Current open-data column set
    #[default]
    OpenTest,
    /// Historic header names and order, kept for existing consumers
    Legacy,
    /// Per-test radio signal samples
    Signal,
}

impl Layout {
    pub fn columns(self) -> &'static [Column] {
        match self {
            Layout::OpenTest => OPEN_TEST_COLUMNS,
            Layout::Legacy => LEGACY_COLUMNS,
            Layout::Signal => SIGNAL_COLUMNS,
        }
    }

    /// Field carrying the measurement time for records of this layout.
    pub fn time_field(self) -> &'static str {
        match self {
            Layout::OpenTest | Layout::Legacy => DEFAULT_TIME_FIELD,
            Layout::Signal => SIGNAL_TIME_FIELD,
        }
    }

    pub fn headers(self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.header).collect()
    }
}

pub const OPEN_TEST_COLUMNS: &[Column] = &[
    Column::field("open_uuid"),
    Column::field("open_test_uuid"),
    Column::field("time_utc"),
    Column::field("cat_technology"),
    Column::field("network_type"),
    Column::field("lat"),
    Column::field("long"),
    Column::field("loc_src"),
    Column::field("loc_accuracy"),
    Column::field("gkz"),
    Column::field("zip_code"),
    Column::field("country_location"),
    Column::field("download_kbit"),
    Column::field("upload_kbit"),
    Column::field("ping_ms"),
    Column::field("lte_rsrp"),
    Column::field("lte_rsrq"),
    Column::field("signal_strength"),
    Column::derived(CONDITIONED_SIGNAL_STRENGTH),
    Column::field("server_name"),
    Column::field("test_duration"),
    Column::field("num_threads"),
    Column::field("platform"),
    Column::field("model"),
    Column::field("client_version"),
    Column::field("network_mcc_mnc"),
    Column::field("network_name"),
    Column::field("sim_mcc_mnc"),
    Column::field("nat_type"),
    Column::field("asn"),
    Column::field("ip_anonym"),
    Column::field("implausible"),
    Column::field("pinned"),
    Column::field("channel_number"),
    Column::field("radio_band"),
];

pub const LEGACY_COLUMNS: &[Column] = &[
    Column::field("open_uuid"),
    Column::field("open_test_uuid"),
    Column::renamed("time", "time_utc"),
    Column::field("cat_technology"),
    Column::field("network_type"),
    Column::field("lat"),
    Column::field("long"),
    Column::field("loc_src"),
    Column::field("zip_code"),
    Column::field("download_kbit"),
    Column::field("upload_kbit"),
    Column::field("ping_ms"),
    Column::field("signal_strength"),
    Column::field("server_name"),
    Column::field("test_duration"),
    Column::field("num_threads"),
    Column::field("platform"),
    Column::field("model"),
    Column::field("client_version"),
    Column::field("network_mcc_mnc"),
    Column::field("network_name"),
    Column::field("sim_mcc_mnc"),
    Column::field("nat_type"),
    Column::field("asn"),
    Column::field("ip_anonym"),
    Column::field("implausible"),
    Column::field("lte_rsrp"),
];

pub const SIGNAL_COLUMNS: &[Column] = &[
    Column::field("time"),
    Column::field("location_id"),
    Column::field("area_code"),
    Column::field("primary_scrambling_code"),
    Column::field("channel_number"),
    Column::field("lte_rsrp"),
    Column::field("lte_rsrq"),
    Column::field("signal_strength"),
    Column::field("timing_advance"),
    Column::field("network_type"),
    Column::field("network_technology"),
    Column::derived(SIGNAL_CONDITIONED_STRENGTH),
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn renamed_column_reads_source_field() {
        let record = Record::from_pairs([("time_utc", json!("2024-03-01 10:00:00"))]).unwrap();
        let col = LEGACY_COLUMNS.iter().find(|c| c.header == "time").unwrap();
        assert_eq!(col.cell(&record), "2024-03-01 10:00:00");
    }

    #[test]
    fn cells_render_scalars() {
        let record = Record::from_pairs([
            ("a", json!(12.5)),
            ("b", json!(true)),
            ("c", Value::Null),
        ]).unwrap();
        assert_eq!(Column::field("a").cell(&record), "12.5");
        assert_eq!(Column::field("b").cell(&record), "true");
        assert_eq!(Column::field("c").cell(&record), "");
        assert_eq!(Column::field("missing").cell(&record), "");
    }

    #[test]
    fn layouts_have_unique_headers() {
        for layout in [Layout::OpenTest, Layout::Legacy, Layout::Signal] {
            let mut headers = layout.headers();
            let total = headers.len();
            headers.sort_unstable();
            headers.dedup();
            assert_eq!(headers.len(), total, "{layout:?}");
        }
    }
}

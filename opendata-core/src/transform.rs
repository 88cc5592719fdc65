//! Derived presentation fields computed from raw record fields.
//!
//! Every rule is total: it returns `None` instead of failing when its inputs
//! are missing, and each one has an explicit branch for unknown technology
//! tags.

use serde_json::Value;

use crate::record::Record;

pub const TECHNOLOGY_4G: &str = "4G";

pub const FIELD_TECHNOLOGY: &str = "cat_technology";
pub const FIELD_NETWORK_TECHNOLOGY: &str = "network_technology";
pub const FIELD_LTE_RSRP: &str = "lte_rsrp";
pub const FIELD_LTE_RSRQ: &str = "lte_rsrq";
pub const FIELD_SIGNAL_STRENGTH: &str = "signal_strength";

/// Access technology reported for a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technology {
    TwoG,
    ThreeG,
    FourG,
    FiveG,
    Wlan,
    Lan,
    Unknown,
}

impl Technology {
    pub fn from_tag(tag: Option<&str>) -> Technology {
        match tag.map(str::trim) {
            Some("2G") => Technology::TwoG,
            Some("3G") => Technology::ThreeG,
            Some(TECHNOLOGY_4G) => Technology::FourG,
            Some("5G") => Technology::FiveG,
            Some(t) if t.eq_ignore_ascii_case("wlan") => Technology::Wlan,
            Some(t) if t.eq_ignore_ascii_case("lan") => Technology::Lan,
            _ => Technology::Unknown,
        }
    }

    pub fn of(record: &Record, tag_field: &str) -> Technology {
        Technology::from_tag(record.get_str(tag_field))
    }
}

/// A named derived field usable as an export column or report value.
#[derive(Clone, Copy)]
pub struct DerivedRule {
    pub name: &'static str,
    pub compute: fn(&Record) -> Option<Value>,
}

impl std::fmt::Debug for DerivedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedRule").field("name", &self.name).finish()
    }
}

impl DerivedRule {
    pub fn apply(&self, record: &Record) -> Option<Value> {
        (self.compute)(record)
    }
}

/// Signal strength comparable across technologies: RSRP for LTE, the generic
/// reading for everything else.
pub fn conditioned_signal_strength(record: &Record) -> Option<i64> {
    conditioned_signal_strength_by(record, FIELD_TECHNOLOGY)
}

/// Same as [`conditioned_signal_strength`] with an explicit tag field, for
/// layouts that call it `network_technology`.
pub fn conditioned_signal_strength_by(record: &Record, tag_field: &str) -> Option<i64> {
    match Technology::of(record, tag_field) {
        Technology::FourG => record.get_i64(FIELD_LTE_RSRP),
        Technology::TwoG
        | Technology::ThreeG
        | Technology::FiveG
        | Technology::Wlan
        | Technology::Lan
        | Technology::Unknown => record.get_i64(FIELD_SIGNAL_STRENGTH),
    }
}

/// RSRQ for LTE; other technologies have no quality reading.
pub fn conditioned_signal_quality(record: &Record) -> Option<i64> {
    match Technology::of(record, FIELD_TECHNOLOGY) {
        Technology::FourG => record.get_i64(FIELD_LTE_RSRQ),
        _ => None,
    }
}

pub fn technology_family(record: &Record) -> Option<&'static str> {
    match Technology::of(record, FIELD_TECHNOLOGY) {
        Technology::TwoG | Technology::ThreeG | Technology::FourG | Technology::FiveG => {
            Some("mobile")
        }
        Technology::Wlan => Some("wlan"),
        Technology::Lan => Some("lan"),
        Technology::Unknown => None,
    }
}

fn strength_value(record: &Record) -> Option<Value> {
    conditioned_signal_strength(record).map(Value::from)
}

fn signal_strength_value(record: &Record) -> Option<Value> {
    conditioned_signal_strength_by(record, FIELD_NETWORK_TECHNOLOGY).map(Value::from)
}

fn quality_value(record: &Record) -> Option<Value> {
    conditioned_signal_quality(record).map(Value::from)
}

fn family_value(record: &Record) -> Option<Value> {
    technology_family(record).map(Value::from)
}

pub const CONDITIONED_SIGNAL_STRENGTH: DerivedRule = DerivedRule {
    name: "conditioned_signal_strength",
    compute: strength_value,
};

/// Conditioned strength for signal samples, which tag their technology in
/// `network_technology`.
pub const SIGNAL_CONDITIONED_STRENGTH: DerivedRule = DerivedRule {
    name: "conditioned_signal_strength",
    compute: signal_strength_value,
};

pub const CONDITIONED_SIGNAL_QUALITY: DerivedRule = DerivedRule {
    name: "conditioned_signal_quality",
    compute: quality_value,
};

pub const TECHNOLOGY_FAMILY: DerivedRule = DerivedRule {
    name: "technology_family",
    compute: family_value,
};

pub const DERIVED_RULES: &[DerivedRule] = &[
    CONDITIONED_SIGNAL_STRENGTH,
    CONDITIONED_SIGNAL_QUALITY,
    TECHNOLOGY_FAMILY,
];

/// Record with every derived field attached (absent results become `null`).
pub fn with_derived_fields(record: &Record) -> Record {
    record.with_fields(DERIVED_RULES.iter().map(|rule| {
        (
            rule.name.to_string(),
            rule.apply(record).unwrap_or(Value::Null),
        )
    }))
}

//! Artifact naming: partition descriptors, placeholder substitution, media
//! types and the time window each partition covers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OpenDataError, Result};

pub const PLACEHOLDER_HOURS: &str = "%HOURS%";
pub const PLACEHOLDER_YEAR: &str = "%YEAR%";
pub const PLACEHOLDER_MONTH: &str = "%MONTH%";

pub const DEFAULT_PREFIX: &str = "opendata";
pub const DEFAULT_CURRENT_WINDOW_DAYS: u32 = 31;
/// Upper bound accepted for `current_window_days` in configuration.
pub const MAX_CURRENT_WINDOW_DAYS: u32 = 36_600;

/// The time slice an export covers. The variant alone decides which name
/// template is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// The trailing `n` hours
    Hours(u32),
    /// One calendar month
    Month { year: i32, month: u32 },
    /// The latest snapshot
    Current,
}

impl Partition {
    pub fn hours(hours: u32) -> Result<Self> {
        if hours == 0 {
            return Err(OpenDataError::invalid_partition("hours must be at least 1"));
        }
        Ok(Partition::Hours(hours))
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(OpenDataError::invalid_partition(format!(
                "year {} out of range",
                year
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(OpenDataError::invalid_partition(format!(
                "month {} out of range",
                month
            )));
        }
        Ok(Partition::Month { year, month })
    }

    /// Half-open UTC window `[start, end)` this partition selects, relative
    /// to `now` for the rolling variants.
    pub fn window(&self, now: DateTime<Utc>, current_window_days: u32) -> Result<TimeWindow> {
        match *self {
            Partition::Hours(hours) => trailing(now, Duration::hours(i64::from(hours))),
            Partition::Month { year, month } => {
                let start = month_start(year, month)?;
                let end = if month == 12 {
                    month_start(year + 1, 1)?
                } else {
                    month_start(year, month + 1)?
                };
                Ok(TimeWindow { start, end })
            }
            Partition::Current => trailing(now, Duration::days(i64::from(current_window_days))),
        }
    }
}

fn trailing(now: DateTime<Utc>, span: Duration) -> Result<TimeWindow> {
    let start = now.checked_sub_signed(span).ok_or_else(|| {
        OpenDataError::invalid_partition(format!(
            "window of {} hours reaches before the earliest representable time",
            span.num_hours()
        ))
    })?;
    Ok(TimeWindow { start, end: now })
}

fn month_start(year: i32, month: u32) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| OpenDataError::invalid_partition(format!("no such month {}-{}", year, month)))
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Hours(h) => write!(f, "{}h", h),
            Partition::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Partition::Current => f.write_str("current"),
        }
    }
}

/// Accepts `current`, `<n>h` and `YYYY-MM`.
impl FromStr for Partition {
    type Err = OpenDataError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("current") {
            return Ok(Partition::Current);
        }
        if let Some(hours) = s.strip_suffix('h') {
            let hours = hours
                .parse()
                .map_err(|_| OpenDataError::invalid_partition(format!("bad hour count '{}'", s)))?;
            return Partition::hours(hours);
        }
        if let Some((year, month)) = s.split_once('-') {
            let year = year
                .parse()
                .map_err(|_| OpenDataError::invalid_partition(format!("bad year in '{}'", s)))?;
            let month = month
                .parse()
                .map_err(|_| OpenDataError::invalid_partition(format!("bad month in '{}'", s)))?;
            return Partition::month(year, month);
        }
        Err(OpenDataError::invalid_partition(format!(
            "expected 'current', '<n>h' or 'YYYY-MM', got '{}'",
            s
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Zero-padding applied to hour and month placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// `_hours-7`, `-2024-3`
    #[default]
    None,
    /// `_hours-07`, `-2024-03`
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Csv,
    Zip,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Csv => "csv",
            ArtifactKind::Zip => "zip",
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            ArtifactKind::Csv => "text/csv",
            ArtifactKind::Zip => "application/zip",
        }
    }
}

/// The three file-name templates of one artifact kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplates {
    pub hours: String,
    pub month: String,
    pub current: String,
}

impl NameTemplates {
    pub fn for_kind(prefix: &str, kind: ArtifactKind) -> Self {
        let ext = kind.extension();
        Self {
            hours: format!("{}_hours-{}.{}", prefix, PLACEHOLDER_HOURS, ext),
            month: format!("{}-{}-{}.{}", prefix, PLACEHOLDER_YEAR, PLACEHOLDER_MONTH, ext),
            current: format!("{}.{}", prefix, ext),
        }
    }

    pub fn select(&self, partition: &Partition) -> &str {
        match partition {
            Partition::Hours(_) => &self.hours,
            Partition::Month { .. } => &self.month,
            Partition::Current => &self.current,
        }
    }

    pub fn name_for(&self, partition: &Partition, padding: Padding) -> String {
        compute_name(self.select(partition), partition, padding)
    }
}

fn pad(value: u32, padding: Padding) -> String {
    match padding {
        Padding::None => value.to_string(),
        Padding::Zero => format!("{:02}", value),
    }
}

/// Substitutes the partition's values into `template`. Placeholders that do
/// not belong to the partition are left untouched.
pub fn compute_name(template: &str, partition: &Partition, padding: Padding) -> String {
    match *partition {
        Partition::Hours(hours) => template.replace(PLACEHOLDER_HOURS, &pad(hours, padding)),
        Partition::Month { year, month } => template
            .replace(PLACEHOLDER_YEAR, &format!("{:04}", year))
            .replace(PLACEHOLDER_MONTH, &pad(month, padding)),
        Partition::Current => template.to_string(),
    }
}

/// Swaps the extension of `name` for `csv`; names without one get it appended.
pub fn data_entry_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.{}", stem, ArtifactKind::Csv.extension()),
        _ => format!("{}.{}", name, ArtifactKind::Csv.extension()),
    }
}

/// `Content-Disposition` value; only packaged artifacts are sent as
/// attachments.
pub fn content_disposition(kind: ArtifactKind, file_name: &str) -> Option<String> {
    match kind {
        ArtifactKind::Zip => Some(format!("attachment; filename={}", file_name)),
        ArtifactKind::Csv => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn zip_templates() -> NameTemplates {
        NameTemplates::for_kind("opendata", ArtifactKind::Zip)
    }

    #[test]
    fn hour_names_are_unpadded_by_default() {
        let name = zip_templates().name_for(&Partition::Hours(7), Padding::None);
        assert_eq!(name, "opendata_hours-7.zip");
        let name = zip_templates().name_for(&Partition::Hours(48), Padding::None);
        assert_eq!(name, "opendata_hours-48.zip");
    }

    #[test]
    fn month_names_are_unpadded_by_default() {
        let name = zip_templates().name_for(&Partition::month(2024, 3).unwrap(), Padding::None);
        assert_eq!(name, "opendata-2024-3.zip");
        let name = zip_templates().name_for(&Partition::month(2024, 11).unwrap(), Padding::None);
        assert_eq!(name, "opendata-2024-11.zip");
    }

    #[test]
    fn zero_padding_policy() {
        let t = NameTemplates::for_kind("opendata", ArtifactKind::Csv);
        assert_eq!(t.name_for(&Partition::Hours(7), Padding::Zero), "opendata_hours-07.csv");
        assert_eq!(
            t.name_for(&Partition::month(2024, 3).unwrap(), Padding::Zero),
            "opendata-2024-03.csv"
        );
        assert_eq!(t.name_for(&Partition::Hours(120), Padding::Zero), "opendata_hours-120.csv");
    }

    #[test]
    fn current_has_no_substitution() {
        let name = zip_templates().name_for(&Partition::Current, Padding::Zero);
        assert_eq!(name, "opendata.zip");
    }

    #[test]
    fn oversized_rolling_windows_are_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let err = Partition::hours(u32::MAX).unwrap().window(now, 31).unwrap_err();
        assert!(matches!(err, OpenDataError::InvalidPartition { .. }));
        assert!(matches!(
            Partition::Current.window(now, u32::MAX),
            Err(OpenDataError::InvalidPartition { .. })
        ));

        let w = Partition::Current.window(now, MAX_CURRENT_WINDOW_DAYS).unwrap();
        assert_eq!(w.end, now);
    }

    #[test]
    fn template_choice_follows_partition_variant_only() {
        // a month template fed an hour partition keeps its month markers
        let t = zip_templates();
        assert_eq!(
            compute_name(&t.month, &Partition::Hours(3), Padding::None),
            "opendata-%YEAR%-%MONTH%.zip"
        );
    }

    #[test]
    fn data_entry_swaps_only_the_extension() {
        assert_eq!(data_entry_name("opendata-2024-3.zip"), "opendata-2024-3.csv");
        assert_eq!(data_entry_name("zipdata.zip"), "zipdata.csv");
        assert_eq!(data_entry_name("plain"), "plain.csv");
    }

    #[test]
    fn media_types_and_disposition() {
        assert_eq!(ArtifactKind::Csv.media_type(), "text/csv");
        assert_eq!(ArtifactKind::Zip.media_type(), "application/zip");
        assert_eq!(
            content_disposition(ArtifactKind::Zip, "opendata.zip").as_deref(),
            Some("attachment; filename=opendata.zip")
        );
        assert_eq!(content_disposition(ArtifactKind::Csv, "opendata.csv"), None);
    }

    #[test]
    fn partition_validation() {
        assert!(Partition::hours(0).is_err());
        assert!(Partition::month(2024, 13).is_err());
        assert!(Partition::month(2024, 0).is_err());
        assert!(Partition::month(0, 1).is_err());
    }

    #[test]
    fn partition_parsing() {
        assert_eq!("current".parse::<Partition>().unwrap(), Partition::Current);
        assert_eq!("48h".parse::<Partition>().unwrap(), Partition::Hours(48));
        assert_eq!(
            "2024-03".parse::<Partition>().unwrap(),
            Partition::Month { year: 2024, month: 3 }
        );
        assert!("soon".parse::<Partition>().is_err());
        assert!("2024-13".parse::<Partition>().is_err());
    }

    #[test]
    fn month_window_spans_calendar_month() {
        let now = Utc::now();
        let w = Partition::month(2024, 12).unwrap().window(now, 31).unwrap();
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(w.end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
        assert!(!w.contains(w.end));
    }

    #[test]
    fn rolling_windows_end_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let w = Partition::Hours(7).window(now, 31).unwrap();
        assert_eq!(w.end, now);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap());

        let w = Partition::Current.window(now, 31).unwrap();
        assert_eq!(w.start.day(), 8);
        assert_eq!(w.start.month(), 2);
    }
}

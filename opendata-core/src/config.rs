use anyhow::{Context, Result};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{EntryCompression, DEFAULT_LICENSE};
use crate::error::OpenDataError;
use crate::helpers::{HelperSettings, DEFAULT_LANGUAGE};
use crate::columns::Layout;
use crate::naming::{
    Padding, DEFAULT_CURRENT_WINDOW_DAYS, DEFAULT_PREFIX, MAX_CURRENT_WINDOW_DAYS,
};

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "OPENDATA_CONFIG";

static VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable regex"));

/// Settings for exports and report rendering.
///
/// Every field has a default, so a missing file or a partial one is fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenDataConfig {
    pub export: ExportConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name prefix of every artifact
    pub prefix: String,
    /// Zero-pad hour and month placeholders (`_hours-07`, `-2024-03`)
    pub zero_pad: bool,
    /// License text shipped inside archives; the bundled one when unset
    pub license_path: Option<PathBuf>,
    /// Length of the rolling window behind the "current" artifact
    pub current_window_days: u32,
    /// Record field holding the UTC measurement time; each layout has its own
    /// default (`time_utc`, `time` for signal samples)
    pub time_field: Option<String>,
    /// Entry encoding inside zip artifacts (`deflated` or `stored`)
    pub compression: EntryCompression,
    /// Default output directory of `opendata export`
    pub output_dir: Option<PathBuf>,
    /// Plausibility rules file served by `opendata rules`
    pub rules_path: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            zero_pad: false,
            license_path: None,
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
            time_field: None,
            compression: EntryCompression::default(),
            output_dir: None,
            rules_path: None,
        }
    }
}

impl ExportConfig {
    /// Timestamp field the window filter reads for `layout`.
    pub fn time_field_for(&self, layout: Layout) -> &str {
        self.time_field.as_deref().unwrap_or(layout.time_field())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// IANA zone used by `toLocalTime`
    pub timezone: String,
    /// Language `translateBool` falls back to
    pub default_language: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timezone: crate::helpers::DEFAULT_TIMEZONE.name().to_string(),
            default_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl OpenDataConfig {
    /// Loads the config from `$OPENDATA_CONFIG` or ~/.opendata/config.toml.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Loads a specific file; unlike [`OpenDataConfig::load`] it must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).context("Failed to parse config file (invalid TOML)")?;
        config.expand_variables();
        config.validate()?;
        Ok(config)
    }

    /// Config file path: `$OPENDATA_CONFIG`, else ~/.opendata/config.toml
    pub fn config_path() -> PathBuf {
        if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".opendata/config.toml")
    }

    fn validate(&self) -> Result<()> {
        if self.export.prefix.trim().is_empty() {
            return Err(OpenDataError::config("export.prefix must not be empty").into());
        }
        if !(1..=MAX_CURRENT_WINDOW_DAYS).contains(&self.export.current_window_days) {
            return Err(OpenDataError::config(format!(
                "export.current_window_days must be between 1 and {}",
                MAX_CURRENT_WINDOW_DAYS
            ))
            .into());
        }
        self.timezone()?;
        Ok(())
    }

    /// Expand ${VAR} references in paths from the environment
    fn expand_variables(&mut self) {
        for path in [
            &mut self.export.license_path,
            &mut self.export.output_dir,
            &mut self.export.rules_path,
        ]
        .into_iter()
        .flatten()
        {
            *path = PathBuf::from(expand_string(&path.display().to_string()));
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        let name = self.render.timezone.trim();
        name.parse::<Tz>().map_err(|e| {
            OpenDataError::config(format!("unknown timezone '{}': {}", name, e)).into()
        })
    }

    pub fn padding(&self) -> Padding {
        if self.export.zero_pad {
            Padding::Zero
        } else {
            Padding::None
        }
    }

    pub fn helper_settings(&self) -> Result<HelperSettings> {
        Ok(HelperSettings {
            timezone: self.timezone()?,
            default_language: self.render.default_language.clone(),
        })
    }

    /// Text of the archive license entry.
    pub fn license_text(&self) -> Result<String> {
        match &self.export.license_path {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("Failed to read license file: {:?}", path)),
            None => Ok(DEFAULT_LICENSE.to_string()),
        }
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }
}

/// Replaces `${VAR}` with the variable's value; unset variables become empty.
fn expand_string(s: &str) -> String {
    VAR_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

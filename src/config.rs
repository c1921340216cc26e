//! YAML settings for alias tables, lookback windows and policy knobs.
//!
//! Every field has a default, so a missing file or a partial file both yield a
//! usable [`Settings`].

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result, ensure};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::columns::ColumnResolver;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Alias lists keyed by canonical field name; replaces the built-in list
    /// for that field.
    pub aliases: BTreeMap<String, Vec<String>>,
    pub regions: Vec<String>,
    pub windows: WindowSettings,
    pub top_n: usize,
    pub growth: GrowthPolicy,
    pub placeholders: Vec<String>,
    pub matching: MatchSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aliases: BTreeMap::new(),
            regions: vec!["RJ".to_string(), "SP".to_string()],
            windows: WindowSettings::default(),
            top_n: 12,
            growth: GrowthPolicy::default(),
            placeholders: ["", "nan", "NaN", "None", "null", "-"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            matching: MatchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowSettings {
    pub top_supplier_years: u32,
    pub recent_top_supplier_years: u32,
    pub volume_years: u32,
    pub basic_share_years: u32,
    pub active_supplier_years: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            top_supplier_years: 10,
            recent_top_supplier_years: 2,
            volume_years: 10,
            basic_share_years: 1,
            active_supplier_years: 10,
        }
    }
}

/// Guards category growth figures against sparse-history artifacts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrowthPolicy {
    /// Growth percentages are clipped to `[-clip, +clip]`; `None` disables it.
    pub clip_percent: Option<f64>,
    /// Compound growth only covers categories with sales in each of the last
    /// `presence_years` calendar years.
    pub presence_years: u32,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            clip_percent: Some(500.0),
            presence_years: 5,
        }
    }
}

impl GrowthPolicy {
    /// Checks a policy built from settings or command-line overrides.
    pub fn validate(&self) -> Result<()> {
        if let Some(clip) = self.clip_percent {
            ensure!(
                clip.is_finite() && clip > 0.0,
                "clip_percent must be a positive number (got {clip})"
            );
        }
        ensure!(
            self.presence_years >= 1,
            "presence_years must be at least 1"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatchSettings {
    pub min_token_len: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self { min_token_len: 3 }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening settings file {path:?}"))?;
        let settings: Settings = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing settings YAML from {path:?}"))?;
        settings.validate()?;
        debug!("Loaded settings from {path:?}: {settings:?}");
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.growth.validate().context("Invalid growth settings")
    }

    pub fn resolver(&self) -> ColumnResolver {
        ColumnResolver::builtin().with_overrides(&self.aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "regions: [MG]\ngrowth:\n  clip_percent: 250\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.regions, vec!["MG".to_string()]);
        assert_eq!(settings.growth.clip_percent, Some(250.0));
        assert_eq!(settings.growth.presence_years, 5);
        assert_eq!(settings.windows.top_supplier_years, 10);
        assert_eq!(settings.top_n, 12);
    }

    #[test]
    fn null_clip_disables_clipping() {
        let settings: Settings = serde_yaml::from_str("growth:\n  clip_percent: null\n").unwrap();
        assert_eq!(settings.growth.clip_percent, None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_clip() {
        let mut settings = Settings::default();
        settings.growth.clip_percent = Some(0.0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn growth_policy_rejects_negative_and_nan_bounds() {
        for clip in [-5.0, f64::NAN, f64::INFINITY] {
            let policy = GrowthPolicy {
                clip_percent: Some(clip),
                ..GrowthPolicy::default()
            };
            assert!(policy.validate().is_err(), "{clip} accepted");
        }
        let zero_window = GrowthPolicy {
            presence_years: 0,
            ..GrowthPolicy::default()
        };
        assert!(zero_window.validate().is_err());
    }
}

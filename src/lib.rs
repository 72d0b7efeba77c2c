//! Plan Timeline
//!
//! Timeline/Gantt engine for action plans:
//! - Division → PIC → Plan hierarchy with date-span and progress aggregates
//! - Collapse-aware flattening into display rows
//! - Edit reconciliation through a `PlanRepository`, recompute-not-patch
//! - Broadcast invalidation events after confirmed writes

pub mod events;
pub mod repository;
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

use crate::timeline::{MonthFilter, PeriodFilter};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub timeline: TimelineYamlConfig,
    pub events: EventsYamlConfig,
}

/// Timeline view configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineYamlConfig {
    /// JSON file with the plan records loaded by the CLI
    pub plans_path: String,
    /// Filter year; the current year when absent
    pub year: Option<i32>,
    pub month: MonthFilter,
    /// Open every group on first render
    pub expand_all: bool,
}

impl Default for TimelineYamlConfig {
    fn default() -> Self {
        Self {
            plans_path: "plans.json".into(),
            year: None,
            month: MonthFilter::All,
            expand_all: false,
        }
    }
}

/// Event bus configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsYamlConfig {
    pub capacity: usize,
}

impl Default for EventsYamlConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub plans_path: String,
    pub year: Option<i32>,
    pub month: MonthFilter,
    pub expand_all: bool,
    pub event_capacity: usize,
}

fn env_parsed<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(var).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", var, raw, e);
            None
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "timeline.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            plans_path: std::env::var("TIMELINE_PLANS_PATH").unwrap_or(yaml.timeline.plans_path),
            year: env_parsed("TIMELINE_YEAR").or(yaml.timeline.year),
            month: env_parsed("TIMELINE_MONTH").unwrap_or(yaml.timeline.month),
            expand_all: env_parsed("TIMELINE_EXPAND_ALL").unwrap_or(yaml.timeline.expand_all),
            event_capacity: env_parsed("TIMELINE_EVENT_CAPACITY").unwrap_or(yaml.events.capacity),
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("timeline.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    /// Initial applied filter; the year defaults to the one containing `now`
    pub fn period_filter(&self, now: DateTime<Utc>) -> PeriodFilter {
        let base = match self.year {
            Some(year) => PeriodFilter::year(year),
            None => PeriodFilter::current_year(now),
        };
        base.with_month(self.month)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
timeline:
  plans_path: /tmp/plans.json
  year: 2024
  month: 3
  expand_all: true

events:
  capacity: 16
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeline.plans_path, "/tmp/plans.json");
        assert_eq!(config.timeline.year, Some(2024));
        assert_eq!(config.timeline.month, MonthFilter::month(3).unwrap());
        assert!(config.timeline.expand_all);
        assert_eq!(config.events.capacity, 16);
    }

    #[test]
    fn test_yaml_month_all() {
        let yaml = r#"
timeline:
  month: all
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timeline.month, MonthFilter::All);
        assert_eq!(config.timeline.plans_path, "plans.json");
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.timeline.plans_path, "plans.json");
        assert!(config.timeline.year.is_none());
        assert_eq!(config.timeline.month, MonthFilter::All);
        assert!(!config.timeline.expand_all);
        assert_eq!(config.events.capacity, 256);
    }

    #[test]
    fn test_period_filter_defaults_to_current_year() {
        let config = Config {
            plans_path: "plans.json".into(),
            year: None,
            month: MonthFilter::month(2).unwrap(),
            expand_all: false,
            event_capacity: 256,
        };
        let now = crate::test_helpers::fixed_now();
        assert_eq!(
            config.period_filter(now),
            PeriodFilter::year(2025).with_month(MonthFilter::month(2).unwrap())
        );
    }

    /// Combined test for YAML file loading, env var overrides, and fallbacks.
    /// Runs as a single test to avoid parallel env var race conditions.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "TIMELINE_PLANS_PATH",
                "TIMELINE_YEAR",
                "TIMELINE_MONTH",
                "TIMELINE_EXPAND_ALL",
                "TIMELINE_EVENT_CAPACITY",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
timeline:
  plans_path: yaml-plans.json
  year: 2023
  month: 11
events:
  capacity: 8
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("timeline.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.plans_path, "yaml-plans.json");
        assert_eq!(config.year, Some(2023));
        assert_eq!(config.month, MonthFilter::month(11).unwrap());
        assert_eq!(config.event_capacity, 8);

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("TIMELINE_YEAR", "2026");
        std::env::set_var("TIMELINE_MONTH", "all");
        std::env::set_var("TIMELINE_EXPAND_ALL", "true");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.year, Some(2026));
        assert_eq!(config.month, MonthFilter::All);
        assert!(config.expand_all);
        // YAML value still used where no env override
        assert_eq!(config.plans_path, "yaml-plans.json");

        // --- Phase 3: Invalid env values are ignored ---
        std::env::set_var("TIMELINE_MONTH", "13");
        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.month, MonthFilter::month(11).unwrap());

        clear_env();

        // --- Phase 4: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-timeline-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.plans_path, "plans.json");
        assert!(config.year.is_none());
        assert_eq!(config.event_capacity, 256);
    }
}

//! Enhancement configuration: which stages run, how hard they work, and
//! what a failed stage means for the run.

use crate::adapter::StageId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Current configuration schema version
pub const CONFIG_VERSION: u32 = 2;

pub const DEFAULT_STAGE_TIMEOUT_MS: u64 = 30_000;

/// Errors in configuration documents
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown stage in configuration: {0}")]
    UnknownStage(String),

    #[error("stage timeout must be greater than zero")]
    InvalidTimeout,

    #[error("configuration version {found} is newer than supported version {current}")]
    UnsupportedVersion { found: u32, current: u32 },

    #[error("malformed configuration: {0}")]
    Malformed(String),
}

/// Advisory speed/quality trade-off. Stages may scale their work with it,
/// and each mode has a preset stage selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMode {
    Speed,
    #[default]
    Balanced,
    Quality,
}

impl PerformanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Balanced => "balanced",
            Self::Quality => "quality",
        }
    }

    /// Stages the mode's preset enables.
    pub fn preset(&self) -> &'static [StageId] {
        const SPEED: &[StageId] = &[
            StageId::PromptAnalysis,
            StageId::ProfessionalLayout,
            StageId::MechanicalValidation,
        ];
        const BALANCED: &[StageId] = &[
            StageId::PromptAnalysis,
            StageId::ProfessionalLayout,
            StageId::NpcEnhancement,
            StageId::TacticalCombat,
            StageId::EditorialExcellence,
            StageId::MechanicalValidation,
        ];
        match self {
            Self::Speed => SPEED,
            Self::Balanced => BALANCED,
            Self::Quality => &StageId::ALL,
        }
    }
}

impl FromStr for PerformanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "speed" => Ok(Self::Speed),
            "balanced" => Ok(Self::Balanced),
            "quality" => Ok(Self::Quality),
            other => Err(format!("unknown performance mode: {}", other)),
        }
    }
}

/// What a failed stage means for the run as a whole
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackBehavior {
    /// Return the enhancement with failed stages recorded
    #[default]
    Graceful,
    /// Any failed stage fails the run
    Strict,
}

fn current_version() -> u32 {
    CONFIG_VERSION
}

fn enabled_by_default() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    DEFAULT_STAGE_TIMEOUT_MS
}

/// Pipeline configuration. Stage names missing from `stages` are disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementConfig {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub stages: BTreeMap<String, bool>,
    #[serde(default)]
    pub performance_mode: PerformanceMode,
    #[serde(default)]
    pub fallback_behavior: FallbackBehavior,
    #[serde(default = "default_timeout_ms")]
    pub stage_timeout_ms: u64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            enabled: true,
            stages: StageId::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), true))
                .collect(),
            performance_mode: PerformanceMode::default(),
            fallback_behavior: FallbackBehavior::default(),
            stage_timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
        }
    }
}

impl EnhancementConfig {
    /// Configuration with the mode's preset stage selection.
    pub fn for_mode(mode: PerformanceMode) -> Self {
        let preset = mode.preset();
        Self {
            stages: StageId::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), preset.contains(s)))
                .collect(),
            performance_mode: mode,
            ..Self::default()
        }
    }

    /// Configuration with every stage turned off.
    pub fn none() -> Self {
        Self {
            stages: StageId::ALL
                .iter()
                .map(|s| (s.as_str().to_string(), false))
                .collect(),
            ..Self::default()
        }
    }

    /// Switch to the mode's preset stage selection. The global switch,
    /// fallback behavior and timeout are kept.
    pub fn with_mode(self, mode: PerformanceMode) -> Self {
        Self {
            enabled: self.enabled,
            fallback_behavior: self.fallback_behavior,
            stage_timeout_ms: self.stage_timeout_ms,
            ..Self::for_mode(mode)
        }
    }

    pub fn with_stage(mut self, stage: StageId, enabled: bool) -> Self {
        self.stages.insert(stage.as_str().to_string(), enabled);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackBehavior) -> Self {
        self.fallback_behavior = fallback;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.stage_timeout_ms = timeout_ms;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.fallback_behavior == FallbackBehavior::Strict
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    /// Check the document without resolving it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.enabled_stages().map(|_| ())
    }

    /// Resolve to the set of enabled stages.
    ///
    /// Empty when the pipeline is globally disabled. Fails on unknown stage
    /// names, a zero timeout, or a version newer than this build understands.
    pub fn enabled_stages(&self) -> Result<BTreeSet<StageId>, ConfigError> {
        if self.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                current: CONFIG_VERSION,
            });
        }
        if self.stage_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        let mut enabled = BTreeSet::new();
        for (name, on) in &self.stages {
            let stage: StageId = name
                .parse()
                .map_err(|_| ConfigError::UnknownStage(name.clone()))?;
            if *on && self.enabled {
                enabled.insert(stage);
            }
        }
        Ok(enabled)
    }

    /// Parse a YAML document, upgrading older schema versions.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        let config = upgrade(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Malformed(e.to_string()))
    }
}

/// Bring a stored or hand-written document up to `CONFIG_VERSION`.
///
/// Documents without a version are taken as current.
pub fn upgrade(mut value: serde_json::Value) -> Result<EnhancementConfig, ConfigError> {
    let mut version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .unwrap_or(CONFIG_VERSION);
    if version > CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion {
            found: version,
            current: CONFIG_VERSION,
        });
    }
    while version < CONFIG_VERSION {
        value = match version {
            1 => migrate_v1(value)?,
            other => {
                return Err(ConfigError::Malformed(format!(
                    "no migration from configuration version {}",
                    other
                )))
            }
        };
        version += 1;
    }
    serde_json::from_value(value).map_err(|e| ConfigError::Malformed(e.to_string()))
}

/// Version 1 keyed stages in camelCase and had no stage timeout.
fn migrate_v1(mut value: serde_json::Value) -> Result<serde_json::Value, ConfigError> {
    let Some(doc) = value.as_object_mut() else {
        return Err(ConfigError::Malformed("expected a mapping".to_string()));
    };

    if let Some(stages) = doc.get("stages").and_then(|s| s.as_object()) {
        let mut renamed = serde_json::Map::new();
        for (key, on) in stages {
            let stage = StageId::ALL
                .iter()
                .find(|s| s.legacy_key() == key)
                .ok_or_else(|| ConfigError::UnknownStage(key.clone()))?;
            renamed.insert(stage.as_str().to_string(), on.clone());
        }
        doc.insert("stages".to_string(), serde_json::Value::Object(renamed));
    }
    doc.insert("stage_timeout_ms".to_string(), DEFAULT_STAGE_TIMEOUT_MS.into());
    doc.insert("version".to_string(), 2.into());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_enables_everything() {
        let config = EnhancementConfig::default();
        assert_eq!(config.enabled_stages().unwrap().len(), 8);
        assert_eq!(config.stage_timeout(), Duration::from_secs(30));
        assert!(!config.is_strict());
    }

    #[test]
    fn mode_switch_keeps_switch_fallback_and_timeout() {
        let stored = EnhancementConfig {
            enabled: false,
            ..EnhancementConfig::default()
        }
        .with_fallback(FallbackBehavior::Strict)
        .with_timeout_ms(1_500);

        let switched = stored.with_mode(PerformanceMode::Speed);
        assert!(!switched.enabled);
        assert!(switched.is_strict());
        assert_eq!(switched.stage_timeout_ms, 1_500);
        assert_eq!(switched.performance_mode, PerformanceMode::Speed);
        assert!(switched.enabled_stages().unwrap().is_empty());

        let enabled = EnhancementConfig::default().with_mode(PerformanceMode::Speed);
        assert_eq!(
            enabled.enabled_stages().unwrap().len(),
            PerformanceMode::Speed.preset().len()
        );
    }

    #[test]
    fn presets_nest() {
        let speed = EnhancementConfig::for_mode(PerformanceMode::Speed).enabled_stages().unwrap();
        let balanced =
            EnhancementConfig::for_mode(PerformanceMode::Balanced).enabled_stages().unwrap();
        let quality =
            EnhancementConfig::for_mode(PerformanceMode::Quality).enabled_stages().unwrap();
        assert_eq!(speed.len(), 3);
        assert_eq!(balanced.len(), 6);
        assert_eq!(quality.len(), 8);
        assert!(speed.is_subset(&balanced));
        assert!(balanced.is_subset(&quality));
    }

    #[test]
    fn missing_stages_are_disabled() {
        let config: EnhancementConfig =
            serde_json::from_value(json!({"stages": {"accessibility": true}})).unwrap();
        let enabled = config.enabled_stages().unwrap();
        assert_eq!(enabled.into_iter().collect::<Vec<_>>(), vec![StageId::Accessibility]);
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let config = EnhancementConfig::default();
        let mut bad = config.clone();
        bad.stages.insert("dragon-taming".into(), true);
        assert_eq!(
            bad.validate(),
            Err(ConfigError::UnknownStage("dragon-taming".into()))
        );
        // Unknown names fail even when switched off
        bad.stages.insert("dragon-taming".into(), false);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn globally_disabled_resolves_to_nothing() {
        let config = EnhancementConfig {
            enabled: false,
            ..EnhancementConfig::default()
        };
        assert!(config.enabled_stages().unwrap().is_empty());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = EnhancementConfig::default().with_timeout_ms(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn yaml_round_trip_keeps_settings() {
        let config = EnhancementConfig::for_mode(PerformanceMode::Speed)
            .with_fallback(FallbackBehavior::Strict);
        let yaml = config.to_yaml().unwrap();
        assert_eq!(EnhancementConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn upgrades_version_one_documents() {
        let yaml = "\
version: 1
enabled: true
performance_mode: quality
stages:
  promptAnalysis: true
  npcEnhancement: false
  accessibility: true
";
        let config = EnhancementConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.stage_timeout_ms, DEFAULT_STAGE_TIMEOUT_MS);
        assert_eq!(config.stages.get("npc-enhancement"), Some(&false));
        assert_eq!(
            config.enabled_stages().unwrap().into_iter().collect::<Vec<_>>(),
            vec![StageId::PromptAnalysis, StageId::Accessibility]
        );
    }

    #[test]
    fn newer_versions_are_refused() {
        let err = upgrade(json!({"version": 9})).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedVersion {
                found: 9,
                current: CONFIG_VERSION
            }
        );
    }

    #[test]
    fn mode_parses() {
        assert_eq!("Speed".parse::<PerformanceMode>().unwrap(), PerformanceMode::Speed);
        assert!("ludicrous".parse::<PerformanceMode>().is_err());
    }
}

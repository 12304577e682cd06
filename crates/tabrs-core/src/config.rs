// Tabrs Configuration
// The immutable settings snapshot consumed by one hook epoch

use std::path::Path;
use std::time::Duration;

use crate::key::key_from_name;
use crate::Key;

/// Maximum number of Tab presses per burst.
pub const MAX_TAB_COUNT: u32 = 99;

/// Default number of Tab presses per burst.
pub const DEFAULT_TAB_COUNT: u32 = 9;

/// Default pause between consecutive presses.
pub const DEFAULT_INTER_KEY_DELAY: Duration = Duration::from_millis(10);

/// Settings for one hook epoch.
///
/// A `BurstConfig` is taken as an immutable snapshot by
/// [`HookController::start`](crate::hook::HookController::start) and replaced
/// wholesale on reconfiguration; it is never mutated field-by-field while an
/// epoch is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstConfig {
    /// How many Tab presses one burst synthesizes (1..=99).
    pub tab_count: u32,
    /// Pause between consecutive synthesized presses.
    pub inter_key_delay: Duration,
    /// Whether the physical Tab that triggered the burst is suppressed.
    pub suppress_tab: bool,
    /// Key that arms the chord trigger while physically held.
    pub trigger_modifier: Key,
    /// Whether modifier-held-plus-letter triggers a burst at all.
    pub chord_enabled: bool,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            tab_count: DEFAULT_TAB_COUNT,
            inter_key_delay: DEFAULT_INTER_KEY_DELAY,
            suppress_tab: true,
            trigger_modifier: Key::CAPSLOCK,
            chord_enabled: true,
        }
    }
}

/// Errors that can occur when loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("tab count must be between 1 and {MAX_TAB_COUNT}, got {0}")]
    InvalidCount(u32),

    #[error("unknown key name: {0}")]
    InvalidKeyName(String),
}

/// TOML representation for deserializing a config file
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct ConfigToml {
    #[serde(default)]
    burst: Option<BurstToml>,

    #[serde(default)]
    trigger: Option<TriggerToml>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct BurstToml {
    #[serde(default)]
    count: Option<u32>,

    #[serde(default)]
    delay_ms: Option<u64>,

    #[serde(default)]
    suppress_tab: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct TriggerToml {
    #[serde(default)]
    modifier: Option<String>,

    #[serde(default)]
    chord: Option<bool>,
}

impl BurstConfig {
    /// Check the snapshot before it reaches hook registration.
    ///
    /// Malformed values are rejected here, distinct from registration
    /// failures of the underlying source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tab_count < 1 || self.tab_count > MAX_TAB_COUNT {
            return Err(ConfigError::InvalidCount(self.tab_count));
        }
        Ok(())
    }

    /// Load a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string
    ///
    /// Missing sections and fields fall back to the defaults; the result is
    /// validated before it is returned.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;

        let mut config = Self::default();

        if let Some(burst) = raw.burst {
            if let Some(count) = burst.count {
                config.tab_count = count;
            }
            if let Some(delay_ms) = burst.delay_ms {
                config.inter_key_delay = Duration::from_millis(delay_ms);
            }
            if let Some(suppress) = burst.suppress_tab {
                config.suppress_tab = suppress;
            }
        }

        if let Some(trigger) = raw.trigger {
            if let Some(name) = trigger.modifier {
                config.trigger_modifier =
                    key_from_name(&name).ok_or(ConfigError::InvalidKeyName(name))?;
            }
            if let Some(chord) = trigger.chord {
                config.chord_enabled = chord;
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Create default config content for a new installation
pub fn default_config_content() -> &'static str {
    r#"# Tabrs Configuration
# Place this file anywhere and pass it with: tabrs --config <path>

[burst]
# How many Tab presses to send per trigger (1-99)
count = 9
# Delay between presses in milliseconds
delay_ms = 10
# Swallow the physical Tab so only the burst reaches the application
suppress_tab = true

[trigger]
# Key that arms the chord trigger while held
modifier = "CAPSLOCK"
# Enable the modifier-held-plus-letter trigger
chord = true
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BurstConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tab_count, 9);
        assert_eq!(config.trigger_modifier, Key::CAPSLOCK);
        assert!(config.suppress_tab);
        assert!(config.chord_enabled);
    }

    #[test]
    fn test_count_bounds() {
        let mut config = BurstConfig::default();

        config.tab_count = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount(0))
        ));

        config.tab_count = 1;
        assert!(config.validate().is_ok());

        config.tab_count = MAX_TAB_COUNT;
        assert!(config.validate().is_ok());

        config.tab_count = MAX_TAB_COUNT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[burst]
count = 24
delay_ms = 5
suppress_tab = false

[trigger]
modifier = "LEFT_CTRL"
chord = false
"#;
        let config = BurstConfig::from_toml(toml).unwrap();
        assert_eq!(config.tab_count, 24);
        assert_eq!(config.inter_key_delay, Duration::from_millis(5));
        assert!(!config.suppress_tab);
        assert_eq!(config.trigger_modifier, Key::LEFT_CTRL);
        assert!(!config.chord_enabled);
    }

    #[test]
    fn test_from_toml_partial_keeps_defaults() {
        let config = BurstConfig::from_toml("[burst]\ncount = 3\n").unwrap();
        assert_eq!(config.tab_count, 3);
        assert_eq!(config.inter_key_delay, DEFAULT_INTER_KEY_DELAY);
        assert!(config.suppress_tab);
        assert!(config.chord_enabled);
    }

    #[test]
    fn test_from_toml_rejects_bad_count() {
        assert!(matches!(
            BurstConfig::from_toml("[burst]\ncount = 0\n"),
            Err(ConfigError::InvalidCount(0))
        ));
        assert!(BurstConfig::from_toml("[burst]\ncount = 100\n").is_err());
    }

    #[test]
    fn test_from_toml_rejects_bad_key_name() {
        let result = BurstConfig::from_toml("[trigger]\nmodifier = \"HYPERKEY\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidKeyName(_))));
    }

    #[test]
    fn test_from_toml_rejects_bad_syntax() {
        assert!(matches!(
            BurstConfig::from_toml("not toml at all ["),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_default_content_parses() {
        let config = BurstConfig::from_toml(default_config_content()).unwrap();
        assert_eq!(config, BurstConfig::default());
    }
}

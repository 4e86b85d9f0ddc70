//! Application settings configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::cache::DEFAULT_CACHE_TTL_MINUTES;
use crate::table::TableOptions;

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The name of the default profile to use.
    pub default_profile: Option<String>,
    /// Whether to use vim-style keybindings (`j`/`k`/`g`/`G`).
    pub vim_mode: bool,
    /// Records requested per list page.
    pub page_size: u32,
    /// Remaining scroll distance (layout units) that triggers the next page.
    pub scroll_threshold: u32,
    /// Safety cool-down for the infinite scroll guard, in milliseconds.
    pub load_cooldown_ms: u64,
    /// Quiet window before quick-filter input is applied, in milliseconds.
    pub filter_debounce_ms: u64,
    /// Sample cache time-to-live in minutes.
    pub cache_ttl_minutes: u32,
    /// Color theme: `dark` or `light`.
    pub theme: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            vim_mode: true,
            page_size: 50,
            scroll_threshold: 200,
            load_cooldown_ms: 1000,
            filter_debounce_ms: 250,
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            theme: "dark".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > 1000 {
            return Err(ConfigError::ValidationError(format!(
                "page_size must be between 1 and 1000, got {}",
                self.page_size
            )));
        }
        if self.cache_ttl_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "cache_ttl_minutes must be at least 1".to_string(),
            ));
        }
        if !matches!(self.theme.as_str(), "dark" | "light") {
            return Err(ConfigError::ValidationError(format!(
                "theme must be 'dark' or 'light', got '{}'",
                self.theme
            )));
        }
        Ok(())
    }

    /// Table tunables derived from these settings.
    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            scroll_threshold: self.scroll_threshold,
            load_cooldown: Duration::from_millis(self.load_cooldown_ms),
            filter_debounce: Duration::from_millis(self.filter_debounce_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes as u64 * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_table_options() {
        let options = Settings::default().table_options();
        assert_eq!(options.scroll_threshold, 200);
        assert_eq!(options.load_cooldown, Duration::from_secs(1));
        assert_eq!(options.filter_debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let settings = Settings {
            page_size: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}

//! Review session configuration

use crate::error::ReviewError;
use serde::{Deserialize, Serialize};

/// Knobs for the apply flow
///
/// Loadable from TOML; missing keys keep their defaults:
///
/// ```toml
/// check_staleness = true
/// validate_before_execute = true
/// reanalyse_on_stale = true
/// allow_dependent_steps = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Compare the live layout with the session snapshot before applying
    pub check_staleness: bool,
    /// Ask the backend to validate each batch before executing it
    pub validate_before_execute: bool,
    /// Reload the proposal when the snapshot is stale
    pub reanalyse_on_stale: bool,
    /// Let guided mode run a dependent step together with its chain
    pub allow_dependent_steps: bool,
}

impl ReviewConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With staleness check
    #[inline]
    #[must_use]
    pub fn with_staleness_check(mut self, enabled: bool) -> Self {
        self.check_staleness = enabled;
        self
    }

    /// With live validation
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_before_execute = enabled;
        self
    }

    /// With re-analysis on stale snapshots
    #[inline]
    #[must_use]
    pub fn with_reanalyse_on_stale(mut self, enabled: bool) -> Self {
        self.reanalyse_on_stale = enabled;
        self
    }

    /// With batched dependent steps in guided mode
    #[inline]
    #[must_use]
    pub fn with_dependent_steps(mut self, enabled: bool) -> Self {
        self.allow_dependent_steps = enabled;
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// `ReviewError::Config` when the text is not valid TOML or a key has
    /// the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ReviewError> {
        toml::from_str(text).map_err(|e| ReviewError::Config(e.to_string()))
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            check_staleness: true,
            validate_before_execute: true,
            reanalyse_on_stale: true,
            allow_dependent_steps: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_safe() {
        let config = ReviewConfig::default();
        assert!(config.check_staleness);
        assert!(config.validate_before_execute);
        assert!(config.reanalyse_on_stale);
        assert!(!config.allow_dependent_steps);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ReviewConfig::from_toml_str("allow_dependent_steps = true").unwrap();
        assert_eq!(config, ReviewConfig::new().with_dependent_steps(true));
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ReviewConfig::from_toml_str("check_staleness = \"yes\"").unwrap_err();
        assert!(matches!(err, ReviewError::Config(_)));
    }
}

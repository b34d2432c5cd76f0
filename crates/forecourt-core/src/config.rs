//! Configuration module for the outbox.
//!
//! Provides the typed sync configuration that maps to the YAML configuration
//! file, with loading, validation, defaults, and a patch type for runtime
//! reconfiguration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Runtime-mutable synchronization settings.
///
/// Every field can be changed while the engine is running via
/// [`SyncConfigPatch`]; interval changes take effect on the scheduler's
/// next tick without a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delivery attempts before a mutation is quarantined.
    pub max_retries: u32,
    /// Milliseconds between automatic background flushes.
    pub sync_interval_ms: u64,
    /// Maximum mutations dispatched per flush batch.
    pub batch_size: usize,
    /// Base delay in milliseconds for exponential retry backoff.
    pub retry_delay_ms: u64,
    /// Whether the background scheduler triggers flushes at all.
    pub auto_sync_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            sync_interval_ms: 30_000,
            batch_size: 10,
            retry_delay_ms: 1_000,
            auto_sync_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl SyncConfig {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`SyncConfig::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/forecourt/sync.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("forecourt")
            .join("sync.yaml")
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the offending field, e.g. `"batch_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl SyncConfig {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync_interval_ms == 0 {
            errors.push(ValidationError {
                field: "sync_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.batch_size == 0 {
            errors.push(ValidationError {
                field: "batch_size".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.retry_delay_ms == 0 {
            errors.push(ValidationError {
                field: "retry_delay_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.max_retries == 0 {
            errors.push(ValidationError {
                field: "max_retries".into(),
                message: "must be greater than 0".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// SyncConfigPatch
// ---------------------------------------------------------------------------

/// Partial update to a [`SyncConfig`].
///
/// Absent fields leave the current value untouched, so a caller can flip
/// `auto_sync_enabled` without knowing the rest of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfigPatch {
    pub max_retries: Option<u32>,
    pub sync_interval_ms: Option<u64>,
    pub batch_size: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub auto_sync_enabled: Option<bool>,
}

impl SyncConfigPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.max_retries.is_none()
            && self.sync_interval_ms.is_none()
            && self.batch_size.is_none()
            && self.retry_delay_ms.is_none()
            && self.auto_sync_enabled.is_none()
    }

    /// Apply the patch to a configuration, returning the merged result.
    pub fn apply(&self, base: &SyncConfig) -> SyncConfig {
        SyncConfig {
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            sync_interval_ms: self.sync_interval_ms.unwrap_or(base.sync_interval_ms),
            batch_size: self.batch_size.unwrap_or(base.batch_size),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(base.retry_delay_ms),
            auto_sync_enabled: self.auto_sync_enabled.unwrap_or(base.auto_sync_enabled),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.sync_interval_ms, 30_000);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.retry_delay_ms, 1_000);
        assert!(cfg.auto_sync_enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = SyncConfig::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
max_retries: 5
sync_interval_ms: 10000
batch_size: 25
retry_delay_ms: 500
auto_sync_enabled: false
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = SyncConfig::load(tmp.path()).expect("load config");
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.sync_interval_ms, 10_000);
        assert_eq!(cfg.batch_size, 25);
        assert_eq!(cfg.retry_delay_ms, 500);
        assert!(!cfg.auto_sync_enabled);
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = SyncConfig::load_or_default(Path::new("/nonexistent/sync.yaml"));
        assert_eq!(cfg.sync_interval_ms, 30_000);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        let result = SyncConfig::load(tmp.path());
        assert!(result.is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_interval() {
        let mut cfg = SyncConfig::default();
        cfg.sync_interval_ms = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "sync_interval_ms"));
    }

    #[test]
    fn validate_catches_zero_batch_size() {
        let mut cfg = SyncConfig::default();
        cfg.batch_size = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "batch_size"));
    }

    #[test]
    fn validate_catches_zero_retry_delay() {
        let mut cfg = SyncConfig::default();
        cfg.retry_delay_ms = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "retry_delay_ms"));
    }

    #[test]
    fn validate_catches_zero_max_retries() {
        let mut cfg = SyncConfig::default();
        cfg.max_retries = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "max_retries"));
    }

    // -- Patch --

    #[test]
    fn empty_patch_changes_nothing() {
        let base = SyncConfig::default();
        let patch = SyncConfigPatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.apply(&base), base);
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let base = SyncConfig::default();
        let patch = SyncConfigPatch {
            batch_size: Some(50),
            auto_sync_enabled: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());

        let merged = patch.apply(&base);
        assert_eq!(merged.batch_size, 50);
        assert!(!merged.auto_sync_enabled);
        assert_eq!(merged.max_retries, base.max_retries);
        assert_eq!(merged.sync_interval_ms, base.sync_interval_ms);
        assert_eq!(merged.retry_delay_ms, base.retry_delay_ms);
    }

    #[test]
    fn patch_deserializes_with_absent_fields() {
        let patch: SyncConfigPatch =
            serde_json::from_str(r#"{"sync_interval_ms": 5000}"#).unwrap();
        assert_eq!(patch.sync_interval_ms, Some(5_000));
        assert!(patch.batch_size.is_none());
    }

    // -- default_path --

    #[test]
    fn default_path_ends_with_sync_yaml() {
        let p = SyncConfig::default_path();
        assert!(p.ends_with("forecourt/sync.yaml"));
    }

    // -- ValidationError Display --

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "batch_size".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(err.to_string(), "batch_size: must be greater than 0");
    }
}

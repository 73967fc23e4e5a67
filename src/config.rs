//! Validator configuration
//!
//! JSON file, every key optional:
//!
//! ```json
//! { "log_level": "info", "concurrent_nested": true }
//! ```
//!
//! Settings are process-wide once applied.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::schema::{StructureError, StructureResult};

static CONCURRENT_NESTED: AtomicBool = AtomicBool::new(true);

/// Whether nested object keys and array elements are validated concurrently
pub fn concurrent_nested() -> bool {
    CONCURRENT_NESTED.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Minimum log severity: trace, info, warn, error, fatal (default: warn)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Validate nested keys/elements concurrently (default: true).
    /// When false they run sequentially in key/index order.
    #[serde(default = "default_concurrent_nested")]
    pub concurrent_nested: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_concurrent_nested() -> bool {
    true
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            concurrent_nested: default_concurrent_nested(),
        }
    }
}

impl ValidatorConfig {
    /// Loads and validates configuration from a JSON file
    pub fn load(path: &Path) -> StructureResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StructureError::new(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> StructureResult<Self> {
        let config: ValidatorConfig = serde_json::from_str(content)
            .map_err(|e| StructureError::new(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> StructureResult<()> {
        self.severity().map(|_| ())
    }

    /// Parsed log level
    pub fn severity(&self) -> StructureResult<Severity> {
        self.log_level
            .parse::<Severity>()
            .map_err(|e| StructureError::new(format!("Invalid log_level: {}", e)))
    }

    /// Applies the settings process-wide
    pub fn apply(&self) -> StructureResult<()> {
        Logger::set_min_severity(self.severity()?);
        CONCURRENT_NESTED.store(self.concurrent_nested, Ordering::Relaxed);

        let concurrent = self.concurrent_nested.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("log_level", self.log_level.as_str()),
                ("concurrent_nested", concurrent.as_str()),
            ],
        );
        Ok(())
    }
}

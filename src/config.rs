//! Configuration file handling for saved run profiles.
//!
//! A profile is a small JSON document naming the tasks to run and how to
//! schedule them. Every field is optional; missing fields fall back to the
//! catalog defaults. Command-line flags override file values.
//!
//! ```json
//! {
//!   "tasks": ["Limpiar Archivos Temporales", "Verificación SFC"],
//!   "policy": "affinity",
//!   "max_workers": 4,
//!   "dry_run": false
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::engine::{DEFAULT_MAX_WORKERS, EngineOptions, SchedulingPolicy};
use crate::error::OptimizerError;
use crate::registry::TaskRegistry;

/// Largest accepted worker pool.
pub const MAX_WORKERS_LIMIT: usize = 32;

/// Run profile that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Task names to run, in order. `None` selects the catalog defaults.
    pub tasks: Option<Vec<String>>,
    pub policy: SchedulingPolicy,
    pub max_workers: usize,
    pub dry_run: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            tasks: None,
            policy: SchedulingPolicy::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            dry_run: false,
        }
    }
}

impl OptimizerConfig {
    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration against the task catalog
    pub fn validate(&self, registry: &TaskRegistry) -> crate::error::Result<()> {
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(OptimizerError::config(format!(
                "max_workers must be between 1 and {}",
                MAX_WORKERS_LIMIT
            )));
        }

        if let Some(tasks) = &self.tasks {
            if tasks.is_empty() {
                return Err(OptimizerError::config(
                    "Task list must not be empty (omit it to use the defaults)",
                ));
            }
            for name in tasks {
                if name.trim().is_empty() {
                    return Err(OptimizerError::config("Task names must not be blank"));
                }
                if registry.position(name).is_none() {
                    return Err(OptimizerError::config(format!("Unknown task: {:?}", name)));
                }
            }
        }

        Ok(())
    }

    /// Registry indices for the configured tasks, in configured order.
    pub fn resolve_selection(&self, registry: &TaskRegistry) -> crate::error::Result<Vec<usize>> {
        match &self.tasks {
            None => Ok(registry.default_selection()),
            Some(names) => names
                .iter()
                .map(|name| {
                    registry
                        .position(name)
                        .ok_or_else(|| OptimizerError::config(format!("Unknown task: {:?}", name)))
                })
                .collect(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            policy: self.policy,
            max_workers: self.max_workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Outcome;
    use crate::task::TaskDescriptor;
    use tempfile::TempDir;

    fn registry() -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for (name, default) in [("temp", true), ("dism", true), ("telemetry", false)] {
            registry
                .register(
                    TaskDescriptor::new(name, "").enabled_by_default(default),
                    || Outcome::success("ok"),
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate(&registry()).is_ok());
        assert_eq!(config.resolve_selection(&registry()).unwrap(), vec![0, 1]);
        assert_eq!(config.engine_options(), EngineOptions::default());
    }

    #[test]
    fn test_save_and_load_json_config() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("profile.json");

        let config = OptimizerConfig {
            tasks: Some(vec!["telemetry".into(), "temp".into()]),
            policy: SchedulingPolicy::Affinity,
            max_workers: 2,
            dry_run: true,
        };
        config.save_to_file(&path).unwrap();

        let loaded = OptimizerConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.resolve_selection(&registry()).unwrap(), vec![2, 0]);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: OptimizerConfig = serde_json::from_str(r#"{"policy": "affinity"}"#).unwrap();
        assert_eq!(config.policy, SchedulingPolicy::Affinity);
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert!(config.tasks.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = OptimizerConfig::load_from_file("/nonexistent/profile.json").unwrap_err();
        assert!(format!("{}", err).contains("Failed to read configuration"));
    }

    #[test]
    fn test_load_invalid_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = OptimizerConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{}", err).contains("Failed to parse configuration JSON"));
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: std::result::Result<OptimizerConfig, _> =
            serde_json::from_str(r#"{"policy": "random"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_worker_bounds() {
        let mut config = OptimizerConfig {
            max_workers: 0,
            ..OptimizerConfig::default()
        };
        assert!(config.validate(&registry()).is_err());

        config.max_workers = MAX_WORKERS_LIMIT + 1;
        assert!(config.validate(&registry()).is_err());

        config.max_workers = MAX_WORKERS_LIMIT;
        assert!(config.validate(&registry()).is_ok());
    }

    #[test]
    fn test_validation_task_names() {
        let empty = OptimizerConfig {
            tasks: Some(vec![]),
            ..OptimizerConfig::default()
        };
        assert!(empty.validate(&registry()).is_err());

        let blank = OptimizerConfig {
            tasks: Some(vec!["  ".into()]),
            ..OptimizerConfig::default()
        };
        assert!(blank.validate(&registry()).is_err());

        let unknown = OptimizerConfig {
            tasks: Some(vec!["defrag".into()]),
            ..OptimizerConfig::default()
        };
        let err = unknown.validate(&registry()).unwrap_err();
        assert!(matches!(err, OptimizerError::Config(_)));
        assert!(format!("{}", err).contains("defrag"));
        assert!(unknown.resolve_selection(&registry()).is_err());
    }
}

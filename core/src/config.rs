//! Runtime configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. A TOML file: the explicit `config_path`, else `REIFY_CONFIG_PATH`, else
//!    `reify.toml` in the working directory if present
//! 3. `REIFY_*` environment variables (after `.env` is loaded)
//! 4. Values set on the builder

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Whether `debugger` statements and halt hooks pause during `run`/`resume`
    pub debugging_enabled: bool,
    /// Swap in the instrumented array methods while debugging
    pub debug_builtins: bool,
    /// Registry namespace for code compiled through the runtime
    pub namespace: String,
    /// Nested calls allowed before a RangeError is thrown
    pub max_call_depth: usize,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debugging_enabled: true,
            debug_builtins: true,
            namespace: "default".to_string(),
            max_call_depth: 256,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from the standard sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".to_string()));
        }
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_call_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Programmatic overrides on top of the file and environment sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    debugging_enabled: Option<bool>,
    debug_builtins: Option<bool>,
    namespace: Option<String>,
    max_call_depth: Option<usize>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn debugging_enabled(mut self, enabled: Option<bool>) -> Self {
        self.debugging_enabled = enabled;
        self
    }

    pub fn debug_builtins(mut self, enabled: Option<bool>) -> Self {
        self.debug_builtins = enabled;
        self
    }

    pub fn namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default("debugging_enabled", defaults.debugging_enabled)?
            .set_default("debug_builtins", defaults.debug_builtins)?
            .set_default("namespace", defaults.namespace)?
            .set_default("max_call_depth", defaults.max_call_depth as i64)?
            .set_default("log_filter", defaults.log_filter)?;

        let path = self
            .config_path
            .or_else(|| env::var("REIFY_CONFIG_PATH").ok().map(PathBuf::from));
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("reify").required(false)),
        };
        builder = builder.add_source(config::Environment::with_prefix("REIFY").try_parsing(true));

        if let Some(enabled) = self.debugging_enabled {
            builder = builder.set_override("debugging_enabled", enabled)?;
        }
        if let Some(enabled) = self.debug_builtins {
            builder = builder.set_override("debug_builtins", enabled)?;
        }
        if let Some(namespace) = self.namespace {
            builder = builder.set_override("namespace", namespace)?;
        }
        if let Some(depth) = self.max_call_depth {
            builder = builder.set_override("max_call_depth", depth as i64)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("log_filter", filter)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.debugging_enabled);
        assert!(config.debug_builtins);
        assert_eq!(config.namespace, "default");
        assert_eq!(config.max_call_depth, 256);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .namespace(Some("scripts".to_string()))
            .max_call_depth(Some(32))
            .debug_builtins(Some(false))
            .build()
            .unwrap();
        assert_eq!(config.namespace, "scripts");
        assert_eq!(config.max_call_depth, 32);
        assert!(!config.debug_builtins);
    }

    #[test]
    fn test_builder_rejects_zero_depth() {
        let result = Config::builder().max_call_depth(Some(0)).build();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/nonexistent/reify-test.toml")))
            .build();
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_toml_file_source() {
        let path = env::temp_dir().join(format!("reify-config-{}.toml", std::process::id()));
        std::fs::write(&path, "namespace = \"from-file\"\nmax_call_depth = 64\n").unwrap();
        let config = Config::builder().config_path(Some(path.clone())).build().unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.namespace, "from-file");
        assert_eq!(config.max_call_depth, 64);
    }

    #[test]
    fn test_to_toml_renders_fields() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("namespace = \"default\""));
        assert!(rendered.contains("max_call_depth = 256"));
    }
}

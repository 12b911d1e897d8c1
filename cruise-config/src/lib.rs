//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Everything heuristic about the engine is data: lexicons, completion
//! phrases, cadence, stealth posture. This crate materialises that data
//! from an optional `cruise.yaml`, `CRUISE__`-prefixed environment
//! variables, and `${VAR}` placeholders, so a deployment against a new
//! module vendor is a config change, not a code change.

use config::{Config, ConfigError, Environment, File, FileFormat};
use cruise_common::{AnswerLexicons, CompletionPhrases, DriverSettings, EngineSettings};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Fully materialised configuration for one run.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CruiseConfig {
    pub version: Option<String>,
    pub engine: EngineSettings,
    pub driver: DriverSettings,
    pub lexicons: AnswerLexicons,
    pub completion: CompletionPhrases,
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut current = std::mem::take(s);
                // Bounded re-expansion so `${A}` → `${B}` chains resolve but
                // cycles terminate.
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&current) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => current.clone(),
                    };
                    if expanded == current {
                        break;
                    }
                    current = expanded;
                }
                *s = current;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct CruiseConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for CruiseConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CruiseConfigLoader {
    /// Start with the defaults: `CRUISE__` env overrides over whatever files
    /// and snippets are attached afterwards.
    ///
    /// ```
    /// use cruise_config::CruiseConfigLoader;
    ///
    /// let config = CruiseConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.engine.check_interval_ms, 800);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("CRUISE").separator("__"));
        Self { builder }
    }

    /// Attach a config file; the `config` crate infers format by suffix.
    /// Missing files are tolerated so headless deployments can rely purely
    /// on environment variables.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    ///
    /// ```
    /// use cruise_config::CruiseConfigLoader;
    /// use cruise_common::StealthLevel;
    ///
    /// let config = CruiseConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// engine:
    ///   playback_rate: 8
    ///   stealth: "off"
    /// driver:
    ///   headless: true
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.engine.playback_rate, 8.0);
    /// assert_eq!(config.engine.stealth, StealthLevel::Off);
    /// assert!(config.driver.headless);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources, expanding
    /// `${VAR}` placeholders before materialising typed settings.
    pub fn load(self) -> Result<CruiseConfig, ConfigError> {
        let merged = self.builder.build()?;

        let mut v: Value = merged.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("HOST", Some("relay")), ("PORT", Some("9515"))], || {
            let mut v = json!([
                "ws://$HOST",
                { "endpoint": "${HOST}:${PORT}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["ws://relay", { "endpoint": "relay:9515" }, 42, true, null])
            );
        });
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn empty_sources_yield_pure_defaults() {
        let config = CruiseConfigLoader::new().load().unwrap();
        assert_eq!(config.engine.playback_rate, 16.0);
        assert_eq!(config.driver.webdriver_url, "http://localhost:9515");
        assert!(config.completion.matched("congratulations, completed!"));
    }

    #[test]
    fn lexicons_are_replaced_wholesale_from_yaml() {
        let config = CruiseConfigLoader::new()
            .with_yaml_str(
                r#"
lexicons:
  protected_terms: ["union membership"]
  excluded_terms: ["shift preference"]
completion:
  - ["module finished"]
"#,
            )
            .load()
            .unwrap();

        assert!(config
            .lexicons
            .protected_terms
            .hit("Union membership status")
            .is_some());
        // Untouched tables fall back to their defaults.
        assert!(config.lexicons.affirm_patterns.hit("report it").is_some());
        assert!(config.completion.matched("The module finished."));
        assert!(!config.completion.matched("congratulations, completed"));
    }

    #[test]
    fn missing_files_are_tolerated() {
        let config = CruiseConfigLoader::new()
            .with_file("definitely/not/here.yaml")
            .load()
            .unwrap();
        assert_eq!(config.engine.check_interval_ms, 800);
    }
}

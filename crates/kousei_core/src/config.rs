//! Server configuration.
//!
//! Read once at startup and never mutated afterwards; the session shares it
//! behind an `Arc`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::checker::{Checker, LanguageToolChecker};
use crate::error::ConfigError;
use crate::filter::{CommandFilter, Filter, PlainFilter};
use crate::pipeline::Pipeline;

/// When edits trigger an analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerMode {
    /// Every accepted change schedules a debounced run.
    #[default]
    OnChange,
    /// Only saves schedule runs.
    OnSaveOnly,
}

/// Which filtering collaborator to use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FilterConfig {
    /// Check the document text as is.
    #[default]
    Plain,
    /// Run an external program (program followed by its arguments).
    Command { command: Vec<String> },
}

/// Where the checker lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Configuration for the proofreading server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    /// Delay before a run starts after the last edit.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub trigger: TriggerMode,

    /// Whether saving a document schedules a run.
    #[serde(default = "default_check_on_save")]
    pub check_on_save: bool,

    /// Delay before a save-triggered run; 0 bypasses the debounce.
    #[serde(default)]
    pub save_delay_ms: u64,

    /// Language tag passed to the checker.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub checker: CheckerConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_check_on_save() -> bool {
    true
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8081".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            trigger: TriggerMode::default(),
            check_on_save: default_check_on_save(),
            save_delay_ms: 0,
            language: default_language(),
            checker: CheckerConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Config file names looked up by [`ServerConfig::discover`], in order.
    pub const CONFIG_FILES: [&'static str; 2] = [".kousei.jsonc", ".kousei.json"];

    /// Finds a config file in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a JSONC file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_jsonc(&content)
    }

    /// Parses configuration from JSON with comments and trailing commas.
    pub fn from_jsonc(content: &str) -> Result<Self, ConfigError> {
        let value = jsonc_parser::parse_to_serde_value(content, &Default::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid("language must not be empty".into()));
        }
        if self.checker.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "checker.timeoutMs must be positive".into(),
            ));
        }
        if let FilterConfig::Command { command } = &self.filter
            && command.is_empty()
        {
            return Err(ConfigError::Invalid(
                "filter.command must name a program".into(),
            ));
        }
        self.checker_endpoint().map(|_| ())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    pub fn checker_timeout(&self) -> Duration {
        Duration::from_millis(self.checker.timeout_ms)
    }

    /// Parses the checker endpoint.
    pub fn checker_endpoint(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.checker.endpoint).map_err(|e| {
            ConfigError::Invalid(format!(
                "checker.endpoint '{}': {}",
                self.checker.endpoint, e
            ))
        })
    }

    /// Builds the analysis pipeline this configuration describes.
    pub fn pipeline(&self) -> Result<Pipeline, ConfigError> {
        let filter: Arc<dyn Filter> = match &self.filter {
            FilterConfig::Plain => Arc::new(PlainFilter),
            FilterConfig::Command { command } => {
                let (program, args) = command.split_first().ok_or_else(|| {
                    ConfigError::Invalid("filter.command must name a program".into())
                })?;
                Arc::new(CommandFilter::new(program.clone(), args.to_vec()))
            }
        };

        let checker: Arc<dyn Checker> = Arc::new(
            LanguageToolChecker::new(self.checker_endpoint()?)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
        );

        Ok(Pipeline::new(
            filter,
            checker,
            self.language.clone(),
            self.checker_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.trigger, TriggerMode::OnChange);
        assert!(config.check_on_save);
        assert_eq!(config.save_delay(), Duration::ZERO);
        assert_eq!(config.language, "en-US");
        assert_eq!(config.filter, FilterConfig::Plain);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(ServerConfig::from_jsonc("").unwrap(), ServerConfig::default());
        assert_eq!(
            ServerConfig::from_jsonc("{}").unwrap(),
            ServerConfig::default()
        );
    }

    #[test]
    fn test_config_from_jsonc() {
        let json = r#"{
            // Proofread German theses
            "debounceMs": 500,
            "trigger": "onSaveOnly",
            "saveDelayMs": 100,
            "language": "de-DE",
            "checker": { "endpoint": "http://lt.internal:8010", "timeoutMs": 2000 },
            "filter": { "kind": "command", "command": ["python3", "-m", "yalafi.filter"] },
        }"#;

        let config = ServerConfig::from_jsonc(json).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.trigger, TriggerMode::OnSaveOnly);
        assert_eq!(config.save_delay(), Duration::from_millis(100));
        assert_eq!(config.language, "de-DE");
        assert_eq!(config.checker_timeout(), Duration::from_secs(2));
        assert_eq!(
            config.checker_endpoint().unwrap().as_str(),
            "http://lt.internal:8010/"
        );
        assert_eq!(
            config.filter,
            FilterConfig::Command {
                command: vec![
                    "python3".to_string(),
                    "-m".to_string(),
                    "yalafi.filter".to_string()
                ]
            }
        );
        assert!(config.pipeline().is_ok());
    }

    #[rstest]
    #[case::unknown_property(r#"{ "debounce": 10 }"#)]
    #[case::type_mismatch(r#"{ "debounceMs": "fast" }"#)]
    #[case::unknown_trigger(r#"{ "trigger": "always" }"#)]
    #[case::empty_command(r#"{ "filter": { "kind": "command", "command": [] } }"#)]
    #[case::bad_endpoint(r#"{ "checker": { "endpoint": "not a url" } }"#)]
    #[case::zero_timeout(r#"{ "checker": { "timeoutMs": 0 } }"#)]
    #[case::empty_language(r#"{ "language": " " }"#)]
    #[case::syntax(r#"{ "debounceMs": "#)]
    fn test_config_validation_errors(#[case] json: &str) {
        let result = ServerConfig::from_jsonc(json);
        assert!(
            matches!(result, Err(ConfigError::Invalid(_))),
            "Expected invalid config for {json}, got {result:?}"
        );
    }

    #[test]
    fn test_discover_and_load() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ServerConfig::discover(dir.path()), None);

        let path = dir.path().join(".kousei.json");
        fs::write(&path, r#"{ "language": "fr" }"#).unwrap();
        assert_eq!(ServerConfig::discover(dir.path()), Some(path.clone()));

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.language, "fr");
    }

    #[test]
    fn test_discover_prefers_jsonc() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".kousei.json"), "{}").unwrap();
        fs::write(dir.path().join(".kousei.jsonc"), "{}").unwrap();

        assert_eq!(
            ServerConfig::discover(dir.path()),
            Some(dir.path().join(".kousei.jsonc"))
        );
    }

    #[test]
    fn test_from_file_missing() {
        let err = ServerConfig::from_file("/nonexistent/.kousei.jsonc").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}

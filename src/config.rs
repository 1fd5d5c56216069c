//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treevalues/treevalues.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `TREEVALUES_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::application::{
    ApplicationError, ApplicationResult, IoResultExt, NodeFilter, OptionOverrides, Options,
    UncheckedPolicy,
};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TREEVALUES";

/// Raw settings for intermediate parsing (everything optional).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub pretty: Option<bool>,
    pub exclude_tags: Option<Vec<String>>,
    pub options: OptionOverrides,
}

/// Unified configuration for treevalues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Tags whose nodes never take part in get/set
    pub exclude_tags: Vec<String>,
    /// Default option overrides applied before per-call ones
    pub options: OptionOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pretty: true,
            exclude_tags: vec![],
            options: OptionOverrides::default(),
        }
    }
}

/// Get the XDG config directory for treevalues.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treevalues").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treevalues.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input unchanged.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> ApplicationResult<RawSettings> {
    let content = std::fs::read_to_string(path).with_path_context("read config", path)?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge arrays with union semantics and negation support.
///
/// - Items from overlay are added to base
/// - Items prefixed with `!` remove the corresponding item from the result
/// - Duplicates are de-duplicated, output is sorted
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: HashSet<String> = base.iter().cloned().collect();

    for pattern in overlay {
        if let Some(negated) = pattern.strip_prefix('!') {
            result.remove(negated);
        } else {
            result.insert(pattern.clone());
        }
    }

    let mut vec: Vec<String> = result.into_iter().collect();
    vec.sort();
    vec
}

impl Settings {
    /// Apply the global config onto defaults: arrays REPLACE.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            pretty: global.pretty.unwrap_or(self.pretty),
            exclude_tags: global
                .exclude_tags
                .clone()
                .unwrap_or_else(|| self.exclude_tags.clone()),
            options: self.options.merge(&global.options),
        }
    }

    /// Merge a local config onto self: arrays UNION with `!` negation.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            pretty: overlay.pretty.unwrap_or(self.pretty),
            exclude_tags: overlay
                .exclude_tags
                .as_ref()
                .map(|o| merge_array(&self.exclude_tags, o))
                .unwrap_or_else(|| self.exclude_tags.clone()),
            options: self.options.merge(&overlay.options),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// An explicit `local_config` must exist; the global file is optional.
    pub fn load(local_config: Option<&Path>) -> ApplicationResult<Self> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.apply_global(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(local) = local_config {
            let local = expand_path(local);
            if !local.exists() {
                return Err(ApplicationError::ConfigNotFound(local));
            }
            debug!("load: local config {}", local.display());
            current = current.merge_with(&load_raw_settings(&local)?);
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TREEVALUES_* environment variables as explicit overrides.
    fn apply_env_overrides(settings: Self) -> ApplicationResult<Self> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .list_separator(",")
                    .with_list_parse_key("exclude_tags"),
            )
            .build()
            .map_err(config_err)?;
        Ok(Self::overrides_from(settings, &config))
    }

    fn overrides_from(mut settings: Self, config: &Config) -> Self {
        if let Ok(val) = config.get_bool("pretty") {
            settings.pretty = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("exclude_tags") {
            settings.exclude_tags = val;
        }

        let opts = &mut settings.options;
        if let Ok(val) = config.get_string("key_attribute") {
            opts.key_attribute = Some(val);
        }
        let flags: [(&str, &mut Option<bool>); 9] = [
            ("only_nest", &mut opts.only_nest),
            ("only_flat", &mut opts.only_flat),
            ("mirror_to_data", &mut opts.mirror_to_data),
            ("mirror_to_attribute", &mut opts.mirror_to_attribute),
            ("emit_set_events", &mut opts.emit_set_events),
            ("emit_set_all_event", &mut opts.emit_set_all_event),
            ("no_clone", &mut opts.no_clone),
            ("use_selection_value", &mut opts.use_selection_value),
            ("include_match_counts", &mut opts.include_match_counts),
        ];
        for (name, slot) in flags {
            if let Ok(val) = config.get_bool(name) {
                *slot = Some(val);
            }
        }
        if let Ok(val) = config.get_string("unchecked_value") {
            opts.unchecked_value = Some(parse_unchecked(&val));
        }
        if let Ok(val) = config.get_int("max_depth") {
            opts.max_depth = usize::try_from(val).ok();
        }
        settings
    }

    /// Base options for the values engine: defaults, then the configured
    /// overrides, plus a tag filter when `exclude_tags` is set.
    pub fn base_options(&self) -> Options {
        let opts = Options::from_overrides(&self.options);
        if self.exclude_tags.is_empty() {
            opts
        } else {
            opts.with_node_filter(NodeFilter::exclude_tags(self.exclude_tags.clone()))
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> ApplicationResult<String> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treevalues configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treevalues/treevalues.toml  (defines your baseline)
#   Local:  file passed with --config             (per-invocation additions)
#   Env:    TREEVALUES_* environment variables    (explicit overrides)
#
# exclude_tags: global config REPLACES the defaults, a local file UNIONS with
# the global list. Use "!tag" in a local file to remove an inherited tag.

# Pretty-print JSON output
# pretty = true

# Nodes with these tags never take part in get/set
# exclude_tags = ["script", "template"]

[options]
# key_attribute = "name"
# only_nest = false
# only_flat = false
# mirror_to_data = false
# mirror_to_attribute = false
# no_clone = false
# use_selection_value = false
# include_match_counts = false
# unchecked value policy: "skip", true (always) or a sentinel such as false
# unchecked_value = "skip"
# max_depth = 64
"#
        .to_string()
    }
}

/// `true` and `skip` map to the always/skip policies, `false` is the boolean
/// sentinel, anything else is a string sentinel.
fn parse_unchecked(raw: &str) -> UncheckedPolicy {
    match raw {
        "true" => UncheckedPolicy::Always,
        "skip" => UncheckedPolicy::Skip,
        "false" => UncheckedPolicy::Sentinel(Value::Bool(false)),
        other => UncheckedPolicy::from_value(Value::String(other.to_string())),
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_building_options_then_no_filter() {
        let settings = Settings::default();
        let opts = settings.base_options();
        assert!(opts.node_filter.is_none());
        assert_eq!(opts.key_attribute, "name");
        assert!(settings.pretty);
    }

    #[test]
    fn given_tilde_in_path_when_expanding_then_uses_home() {
        let home = std::env::var("HOME").expect("HOME should be set");
        let expanded = expand_path(Path::new("~/treevalues.toml"));
        assert!(expanded.to_string_lossy().starts_with(&home));
        assert!(!expanded.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_merge_array_negation() {
        let base = vec!["script".to_string(), "style".to_string()];
        let overlay = vec!["!script".to_string(), "template".to_string()];
        let result = merge_array(&base, &overlay);
        assert_eq!(result, vec!["style".to_string(), "template".to_string()]);
    }

    #[test]
    fn test_apply_global_replaces_arrays_and_local_unions() {
        let base = Settings {
            exclude_tags: vec!["script".to_string()],
            ..Settings::default()
        };
        let global = RawSettings {
            exclude_tags: Some(vec!["style".to_string()]),
            options: OptionOverrides {
                only_nest: Some(true),
                ..OptionOverrides::default()
            },
            ..RawSettings::default()
        };
        let local = RawSettings {
            pretty: Some(false),
            exclude_tags: Some(vec!["template".to_string()]),
            options: OptionOverrides {
                no_clone: Some(true),
                ..OptionOverrides::default()
            },
        };

        let result = base.apply_global(&global).merge_with(&local);

        assert_eq!(result.exclude_tags, vec!["style", "template"]);
        assert!(!result.pretty);
        assert_eq!(result.options.only_nest, Some(true));
        assert_eq!(result.options.no_clone, Some(true));
    }

    #[test]
    fn given_env_style_values_when_applying_overrides_then_strings_are_coerced() {
        let config = Config::builder()
            .set_override("only_nest", "true")
            .unwrap()
            .set_override("max_depth", "8")
            .unwrap()
            .set_override("key_attribute", "data-key")
            .unwrap()
            .build()
            .unwrap();

        let settings = Settings::overrides_from(Settings::default(), &config);

        assert_eq!(settings.options.only_nest, Some(true));
        assert_eq!(settings.options.max_depth, Some(8));
        assert_eq!(settings.options.key_attribute.as_deref(), Some("data-key"));
        assert_eq!(settings.options.only_flat, None);
    }

    #[test]
    fn given_unchecked_strings_when_parsing_then_maps_policies() {
        assert_eq!(parse_unchecked("true"), UncheckedPolicy::Always);
        assert_eq!(parse_unchecked("skip"), UncheckedPolicy::Skip);
        assert_eq!(parse_unchecked("false"), UncheckedPolicy::Sentinel(Value::Bool(false)));
        assert_eq!(
            parse_unchecked("off"),
            UncheckedPolicy::Sentinel(Value::String("off".into()))
        );
    }
}

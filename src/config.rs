//! Configuration for spark-transformations sessions.
//!
//! Use [`SparklessConfig`] to configure a session from code or environment variables,
//! then create a session with [`SparkSession::from_config`](crate::SparkSession::from_config)
//! or merge it into a builder with
//! [`SparkSessionBuilder::with_config`](crate::SparkSessionBuilder::with_config).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session config key for the managed table directory.
pub const WAREHOUSE_DIR_KEY: &str = "spark.sql.warehouse.dir";
/// Session config key for column-name case sensitivity.
pub const CASE_SENSITIVE_KEY: &str = "spark.sql.caseSensitive";
/// Default managed table directory (relative to the working directory, like Spark).
pub const DEFAULT_WAREHOUSE_DIR: &str = "spark-warehouse";

const ENV_PREFIX: &str = "SPARK_TRANSFORMS_";

/// Session configuration that can be built in code or read from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparklessConfig {
    pub app_name: Option<String>,
    pub warehouse_dir: String,
    pub case_sensitive: bool,
    /// Extra `spark.*` keys passed through to the session unchanged.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl Default for SparklessConfig {
    fn default() -> Self {
        SparklessConfig {
            app_name: None,
            warehouse_dir: DEFAULT_WAREHOUSE_DIR.to_string(),
            case_sensitive: false,
            extra: HashMap::new(),
        }
    }
}

impl SparklessConfig {
    /// Read configuration from `SPARK_TRANSFORMS_*` environment variables:
    /// `APP_NAME`, `WAREHOUSE_DIR`, `CASE_SENSITIVE` (`true`/`1`).
    /// Unset variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = SparklessConfig::default();
        if let Some(name) = lookup("APP_NAME").filter(|s| !s.trim().is_empty()) {
            config.app_name = Some(name);
        }
        if let Some(dir) = lookup("WAREHOUSE_DIR").filter(|s| !s.trim().is_empty()) {
            config.warehouse_dir = dir;
        }
        if let Some(flag) = lookup("CASE_SENSITIVE") {
            config.case_sensitive = parse_bool(&flag);
        }
        config
    }

    /// Key/value pairs merged into the session config map.
    pub fn to_session_config(&self) -> Vec<(String, String)> {
        let mut out = vec![
            (WAREHOUSE_DIR_KEY.to_string(), self.warehouse_dir.clone()),
            (CASE_SENSITIVE_KEY.to_string(), self.case_sensitive.to_string()),
        ];
        let mut extra: Vec<(String, String)> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        extra.sort();
        out.extend(extra);
        out
    }
}

pub(crate) fn parse_bool(s: &str) -> bool {
    let s = s.trim();
    s.eq_ignore_ascii_case("true") || s == "1"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spark() {
        let config = SparklessConfig::default();
        assert_eq!(config.warehouse_dir, "spark-warehouse");
        assert!(!config.case_sensitive);
        let pairs = config.to_session_config();
        assert!(pairs.contains(&(CASE_SENSITIVE_KEY.to_string(), "false".to_string())));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = SparklessConfig::from_lookup(|key| match key {
            "WAREHOUSE_DIR" => Some("/tmp/wh".to_string()),
            "CASE_SENSITIVE" => Some("TRUE".to_string()),
            "APP_NAME" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.warehouse_dir, "/tmp/wh");
        assert!(config.case_sensitive);
        assert_eq!(config.app_name, None);
    }

    #[test]
    fn extra_keys_are_passed_through_sorted() {
        let mut config = SparklessConfig::default();
        config.extra.insert("spark.b".into(), "2".into());
        config.extra.insert("spark.a".into(), "1".into());
        let pairs = config.to_session_config();
        assert_eq!(pairs[2].0, "spark.a");
        assert_eq!(pairs[3].0, "spark.b");
    }
}

//! 🔧 App Configuration: the sacred TOML-to-struct pipeline, now with rollups.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment: `RLX_*` env vars as the base layer, an optional TOML
//! file on top (file wins). Nested keys in env vars use `__`, so
//! `RLX_ENGINE__ELASTICSEARCH__URL` lands in `engine.Elasticsearch.url`.

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::ElasticsearchEngineConfig;
use crate::lifecycle::LifecycleConfig;

/// 📦 Everything the client needs to know about itself. Both sections have defaults,
/// so an empty config is a perfectly valid in-memory setup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 🔌 Which engine holds the jobs.
    #[serde(default)]
    pub engine: EngineConfig,
    /// ⏱️ How patient "stop and wait" is.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// 🎭 The engine, by name. In TOML that's `engine = "InMemory"` or an
/// `[engine.Elasticsearch]` table.
#[derive(Debug, Deserialize, Clone, Default)]
pub enum EngineConfig {
    // -- env keys arrive lowercased, hence the aliases
    #[default]
    #[serde(alias = "in_memory", alias = "inmemory")]
    InMemory,
    #[serde(alias = "elasticsearch")]
    Elasticsearch(ElasticsearchEngineConfig),
}

impl EngineConfig {
    /// 🫧 True when jobs die with the process. Fine for tests, surprising for a CLI.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, EngineConfig::InMemory)
    }
}

/// 🚀 Load the config, from a file, from env vars, or from the sheer power of defaults.
///
/// - `None`: env vars only.
/// - `Some(path)`: env vars + TOML file, merged. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("RLX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (RLX_*). \
             The file exists in our hearts, but apparently not in a shape we understand.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (RLX_*). \
                 No file was provided, this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_test_config(contents: &str) -> NamedTempFile {
        let mut the_file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp file. The filesystem said 'new phone who dis'.");
        the_file
            .write_all(contents.as_bytes())
            .expect("💀 Failed to write test config. The bytes refused to land.");
        the_file
    }

    #[test]
    fn the_one_where_elasticsearch_moves_in_with_credentials() {
        let the_file = write_test_config(
            r#"
            [engine.Elasticsearch]
            url = "http://localhost:9200"
            username = "elastic"
            password = "changeme"

            [lifecycle]
            poll_interval_ms = 50
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect(
            "💀 Elasticsearch config should parse. The schema drift goblin does not get this win.",
        );

        match app_config.engine {
            EngineConfig::Elasticsearch(es) => {
                assert_eq!(es.url, "http://localhost:9200");
                assert_eq!(es.username.as_deref(), Some("elastic"));
                assert_eq!(es.api_key, None);
                assert_eq!(es.connect_timeout_secs, 10);
                assert_eq!(es.request_timeout_secs, 30);
            }
            honestly_who_knows => panic!(
                "💀 Expected an Elasticsearch engine, but serde took us to {:?}. Plot twist energy.",
                honestly_who_knows
            ),
        }
        assert_eq!(app_config.lifecycle.poll_interval_ms, 50);
        assert_eq!(app_config.lifecycle.default_stop_timeout_ms, 30_000);
    }

    #[test]
    fn the_one_where_an_empty_file_means_in_memory_and_defaults() {
        let the_file = write_test_config("");
        let app_config = load_config(Some(the_file.path()))
            .expect("💀 An empty config should still be a config. Minimalism is valid.");
        assert!(matches!(app_config.engine, EngineConfig::InMemory));
        assert!(app_config.engine.is_ephemeral());
        assert!(!EngineConfig::Elasticsearch(ElasticsearchEngineConfig::new("http://localhost:9200")).is_ephemeral());
        assert_eq!(app_config.lifecycle, LifecycleConfig::default());
    }

    #[test]
    fn the_one_where_the_engine_is_named_by_a_plain_string() {
        let the_table = toml::toml! {
            engine = "InMemory"

            [lifecycle]
            default_stop_timeout_ms = 1000
        };
        let the_file = write_test_config(&toml::to_string(&the_table).unwrap());
        let app_config = load_config(Some(the_file.path())).unwrap();
        assert!(matches!(app_config.engine, EngineConfig::InMemory));
        assert_eq!(app_config.lifecycle.default_stop_timeout_ms, 1000);
    }

    #[test]
    fn the_one_where_a_typo_is_reported_with_the_file_name() {
        let the_file = write_test_config(
            r#"
            [lifecycle]
            poll_interval_ms = "soon"
            "#,
        );
        let the_error = load_config(Some(the_file.path())).unwrap_err();
        assert!(
            the_error
                .to_string()
                .contains(&the_file.path().display().to_string())
        );
    }
}

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::Serialize;

use super::PipelineConfig;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

pub struct IndexflowConfig {
    figment: Figment,
}

impl IndexflowConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");

        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // If custom config is specified, use only that + defaults + env vars
        if let Some(custom_path) = custom_config {
            figment = match custom_path.rsplit('.').next() {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user_base = Self::user_config_base_path();
            figment = figment
                // User config - support multiple formats
                .merge(Toml::file(format!("{user_base}.toml")))
                .merge(Json::file(format!("{user_base}.json")))
                .merge(Yaml::file(format!("{user_base}.yaml")))
                .merge(Yaml::file(format!("{user_base}.yml")))
                // Repository config - support multiple formats
                .merge(Toml::file("indexflow.toml"))
                .merge(Json::file("indexflow.json"))
                .merge(Yaml::file("indexflow.yaml"))
                .merge(Yaml::file("indexflow.yml"));
        }

        // Environment variables: INDEXFLOW_PIPELINE__WORKER_COUNT -> pipeline.worker_count
        figment = figment.merge(Env::prefixed("INDEXFLOW_").split("__"));

        Ok(IndexflowConfig { figment })
    }

    /// Apply CLI overrides to the `[pipeline]` section (highest priority)
    pub fn with_overrides<T: Serialize>(mut self, overrides: &T) -> Self {
        tracing::trace!("CONFIG LOAD: Applying CLI overrides");
        self.figment = self.figment.merge(Serialized::default("pipeline", overrides));
        self
    }

    /// Extract and validate the pipeline settings
    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let config: PipelineConfig = self
            .figment
            .extract_inner("pipeline")
            .context("Invalid [pipeline] configuration")?;
        config.validate()?;

        tracing::trace!("CONFIG LOAD: Final pipeline = {:?}", config);
        Ok(config)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    fn user_config_base_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/indexflow/config"),
            Err(_) => "~/.config/indexflow/config".to_string(),
        }
    }
}

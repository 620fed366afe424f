//! Configuration management

use std::path::{Path, PathBuf};

use anyhow::bail;
use config::builder::DefaultState;
use config::ConfigBuilder;
use lambdaext_core::api::RUNTIME_API_ENV;
use lambdaext_core::EventType;
use serde::Deserialize;

/// Used when neither configuration nor argv yield a name
const FALLBACK_EXTENSION_NAME: &str = "lambdaext";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// host:port of the Extensions API
    #[serde(default)]
    pub runtime_api: String,

    /// Name to register under; must match the file name in `/opt/extensions`
    #[serde(default)]
    pub extension_name: Option<String>,

    #[serde(default = "default_events")]
    pub events: Vec<EventType>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_events() -> Vec<EventType> {
    vec![EventType::Invoke, EventType::Shutdown]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Sources, later ones winning: `lambdaext.toml` in the working directory
    /// (or `path`), `LAMBDAEXT_*` variables, then `AWS_LAMBDA_RUNTIME_API`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("lambdaext").required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("LAMBDAEXT")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("events"),
            )
            .set_override_option("runtime_api", std::env::var(RUNTIME_API_ENV).ok())?;

        Self::from_builder(builder)
    }

    /// Build and validate from an already assembled set of sources
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let mut config = builder.build()?.try_deserialize::<Config>()?;

        config.runtime_api = config.runtime_api.trim().to_string();
        if config.runtime_api.is_empty() {
            bail!("{} is not set", RUNTIME_API_ENV);
        }

        let mut events = Vec::with_capacity(config.events.len());
        for event in config.events {
            if !events.contains(&event) {
                events.push(event);
            }
        }
        if events.is_empty() {
            bail!("at least one event type must be subscribed");
        }
        config.events = events;

        Ok(config)
    }

    /// Configured name, else the executable's file name
    pub fn extension_name(&self) -> String {
        self.extension_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(executable_name)
            .unwrap_or_else(|| FALLBACK_EXTENSION_NAME.to_string())
    }
}

/// Lambda launches extensions as `/opt/extensions/<name>`; the name is the file name.
fn executable_name() -> Option<String> {
    std::env::args()
        .next()
        .map(PathBuf::from)
        .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
}

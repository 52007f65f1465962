//! Process-wide configuration: a TOML file layered with environment
//! variable overrides, deserialized into `voice_core::config::AppConfig`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use voice_core::config::AppConfig;

pub fn default_path() -> PathBuf {
    PathBuf::from("voice_gateway.toml")
}

pub fn load() -> anyhow::Result<AppConfig> {
    load_from_path(&default_path())
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let builder = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("VOICE_GATEWAY").separator("__"));

    let settings = builder.build().context("failed to build configuration")?;
    settings
        .try_deserialize()
        .context("failed to deserialize configuration")
}

/// Resolves a provider's API key from the environment variable named in
/// its config. Never stored in `AppConfig` itself.
pub fn resolve_api_key(env_var: Option<&str>) -> Option<String> {
    env_var.and_then(|name| std::env::var(name).ok())
}

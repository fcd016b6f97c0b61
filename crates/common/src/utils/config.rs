use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Loads a configuration struct from an optional file and the environment.
///
/// Sources are layered in order: the file (TOML, YAML, JSON, ... chosen by
/// extension), then every `{env_prefix}_*` variable. Fields missing from both
/// fall back to the struct's serde defaults, so `T` should carry
/// `#[serde(default)]`.
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        let path_str = path.to_str().context("Invalid config path")?;
        builder = builder.add_source(File::with_name(path_str));
    }

    let settings = builder
        .add_source(Environment::with_prefix(env_prefix))
        .build()
        .context("Failed to build configuration")?;

    settings
        .try_deserialize::<T>()
        .context("Failed to deserialize configuration")
}

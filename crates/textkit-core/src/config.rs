//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_EMBED__PROVIDER=hash`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const PROVIDERS: &[&str] = &["local", "hash"];

/// The `[embed]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    /// `local` (on-disk model) or `hash` (deterministic hashed embedder).
    pub provider: String,
    /// Dimension used by the hash embedder.
    pub dim: usize,
    pub model_dir: Option<String>,
    /// Token window of the local model.
    pub max_len: usize,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self { provider: "local".to_string(), dim: 1024, model_dir: None, max_len: 256 }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an inline TOML document; no files or env involved.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// The `[embed]` table, or defaults when it is absent.
    pub fn embed_settings(&self) -> Result<EmbedSettings> {
        if self.figment.contains("embed") {
            self.get("embed")
        } else {
            Ok(EmbedSettings::default())
        }
    }

    fn validate(&self) -> Result<()> {
        let settings = self.embed_settings()?;
        if !PROVIDERS.contains(&settings.provider.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "unknown embed.provider '{}' (expected one of {})",
                settings.provider,
                PROVIDERS.join(", ")
            )));
        }
        if settings.dim == 0 {
            return Err(Error::InvalidConfig("embed.dim must be positive".to_string()));
        }
        if settings.max_len == 0 {
            return Err(Error::InvalidConfig("embed.max_len must be positive".to_string()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

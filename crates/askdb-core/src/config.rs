//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` (selected by
//! `RUST_ENV`) + `APP_*` environment variables. Also provides a helper to
//! expand `~` and `${VAR}` in user-supplied paths.

use std::env;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like [`Config::get`] but falling back to `default` when the key is
    /// absent. A key that is present but does not parse as `T` also falls
    /// back, with a warning, so a typoed value does not pass silently.
    pub fn get_or<T>(&self, key: &str, default: T) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        if self.figment.find_value(key).is_err() {
            return default;
        }
        match self.figment.extract_inner(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unparsable config value");
                default
            }
        }
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

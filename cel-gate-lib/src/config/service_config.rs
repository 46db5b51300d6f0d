use super::ExtraConfig;
use crate::Result;
use camino::Utf8Path;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;

/// An example gateway configuration, embedded from `example_gateway.toml`
pub const EXAMPLE_CONFIG_TOML: &str = include_str!("../../example_gateway.toml");

/// The gateway's route table: every endpoint with its backends and their opaque extra configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// The path template clients call, e.g. `/users/{id}`
    pub endpoint: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub extra_config: ExtraConfig,

    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// The upstream path template this backend calls
    pub url_pattern: String,

    #[serde(default)]
    pub extra_config: ExtraConfig,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ServiceConfig {
    /// Load a gateway configuration file.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading gateway configuration file '{path}'"))?;

        let config: Self = if path.extension() == Some("json") {
            serde_json::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{path}'"))?
        } else {
            toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{path}'"))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save the example configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_example(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, EXAMPLE_CONFIG_TOML).into_app_err_with(|| format!("writing example configuration to {output_path}"))?;
        Ok(())
    }

    #[must_use]
    pub fn endpoint(&self, endpoint: &str) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|e| e.endpoint == endpoint)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.endpoint.is_empty() {
                return Err(app_err!("endpoint paths must not be empty"));
            }

            if !seen.insert(endpoint.endpoint.as_str()) {
                return Err(app_err!("endpoint '{}' is defined more than once", endpoint.endpoint));
            }

            if endpoint.backends.iter().any(|b| b.url_pattern.is_empty()) {
                return Err(app_err!("endpoint '{}' has a backend with an empty url_pattern", endpoint.endpoint));
            }
        }

        Ok(())
    }
}

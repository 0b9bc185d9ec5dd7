use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

fn default_port() -> u16 {
    5684
}

fn default_identity() -> String {
    "Client_identity".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    5
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct HubSettings {
    pub addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// DTLS PSK identity announced to the gateway
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Pre-shared security code printed on the bottom of the gateway
    pub psk: String,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl HubSettings {
    pub fn new(addr: impl Into<String>, psk: impl Into<String>) -> Self {
        HubSettings {
            addr: addr.into(),
            port: default_port(),
            identity: default_identity(),
            psk: psk.into(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Checks that an endpoint and a secret are present before any session is
    /// opened.
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(Error::Config("hub address is missing".to_string()));
        }

        if self.psk.trim().is_empty() {
            return Err(Error::Config("hub pre-shared key is missing".to_string()));
        }

        if self.port == 0 {
            return Err(Error::Config("hub port must be non-zero".to_string()));
        }

        Ok(())
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub hub: HubSettings,
}

/// Reads `Settings.{toml,json,yaml,..}` from the working directory. Any
/// field can be overridden from the environment, e.g. `TRADFRI_HUB__PSK`.
pub fn read_settings() -> Result<Settings, config::ConfigError> {
    settings_from(config::File::with_name("Settings"))
}

fn settings_from<S>(file: S) -> Result<Settings, config::ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("TRADFRI")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()
}

//! Reconciler configuration
//!
//! Names, tokens and timings the controller would otherwise hard-code. The
//! defaults match what a deployed operator uses; tests inject their own.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_OBJECT_NAME: &str = "so-object";
pub const DEFAULT_FINALIZER: &str = "simpleoperator.szikes.io/finalizer";
pub const DEFAULT_TLS_SECRET_NAME: &str = "tls-cert";
pub const DEFAULT_PORT: i32 = 80;
pub const DEFAULT_BACKOFF_SECS: u64 = 3;
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";
pub const DEFAULT_CLUSTER_ISSUER: &str = "letsencrypt-staging";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Name shared by the Deployment, Service and Ingress of every owner
    pub object_name: String,
    /// Finalizer placed on the owner and on each managed resource
    pub finalizer: String,
    /// Secret holding the Ingress TLS certificate
    pub tls_secret_name: String,
    /// Container port, also used as Service port and Ingress backend port
    pub port: i32,
    /// Delay before a requested requeue
    #[serde(rename = "backoff_secs", deserialize_with = "duration_from_secs")]
    pub backoff: Duration,
    pub ingress_class: String,
    pub cluster_issuer: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            object_name: DEFAULT_OBJECT_NAME.to_string(),
            finalizer: DEFAULT_FINALIZER.to_string(),
            tls_secret_name: DEFAULT_TLS_SECRET_NAME.to_string(),
            port: DEFAULT_PORT,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            ingress_class: DEFAULT_INGRESS_CLASS.to_string(),
            cluster_issuer: DEFAULT_CLUSTER_ISSUER.to_string(),
        }
    }
}

fn duration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl ReconcilerConfig {
    /// Parse a TOML document; keys left out keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::ConfigError(format!("invalid reconciler config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.object_name.trim().is_empty() {
            return Err(Error::ConfigError("object_name must not be empty".to_string()));
        }
        if self.finalizer.trim().is_empty() {
            return Err(Error::ConfigError("finalizer must not be empty".to_string()));
        }
        if !(1..=65535).contains(&self.port) {
            return Err(Error::ConfigError(format!(
                "port {} is outside 1..=65535",
                self.port
            )));
        }
        Ok(())
    }
}

//! Hub configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::issuer::{
    AltNames, ServerCertRequest, Usage, DEFAULT_VALIDITY_DAYS, MAX_VALIDITY_DAYS,
};
use crate::HubError;

/// Default subject name for the hub's server certificate.
pub const DEFAULT_SUBJECT: &str = "edge-hub";

/// Configuration for credential rotation and server certificate issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Bootstrap credential rotation period, in hours (default: 12).
    #[serde(default = "default_token_refresh_hours")]
    pub token_refresh_hours: u64,

    /// Addresses agents use to reach the hub. Entries that are not valid IPs
    /// are dropped when building the server certificate.
    #[serde(default)]
    pub advertise_address: Vec<String>,

    /// DNS names for the server certificate, used verbatim.
    #[serde(default)]
    pub dns_names: Vec<String>,

    /// Server certificate common name.
    #[serde(default = "default_subject")]
    pub common_name: String,

    /// Server certificate organization.
    #[serde(default = "default_subject")]
    pub organization: String,

    /// Server certificate validity in days.
    #[serde(default = "default_validity_days")]
    pub server_cert_validity_days: u32,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            token_refresh_hours: default_token_refresh_hours(),
            advertise_address: Vec::new(),
            dns_names: Vec::new(),
            common_name: default_subject(),
            organization: default_subject(),
            server_cert_validity_days: default_validity_days(),
        }
    }
}

impl HubConfig {
    /// Load config from a TOML file, falling back to defaults.
    ///
    /// The loaded config is validated before it is returned.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rotator and issuer cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.token_refresh_hours == 0 {
            return Err(HubError::Config(
                "token_refresh_hours must be greater than zero".into(),
            ));
        }
        if self.token_refresh_hours.checked_mul(2 * 3600).is_none() {
            return Err(HubError::Config(format!(
                "token_refresh_hours {} is too large",
                self.token_refresh_hours
            )));
        }
        if self.common_name.is_empty() || self.organization.is_empty() {
            return Err(HubError::Config(
                "common_name and organization must not be empty".into(),
            ));
        }
        if self.server_cert_validity_days == 0 {
            return Err(HubError::Config(
                "server_cert_validity_days must be greater than zero".into(),
            ));
        }
        if self.server_cert_validity_days > MAX_VALIDITY_DAYS {
            return Err(HubError::Config(format!(
                "server_cert_validity_days must be at most {MAX_VALIDITY_DAYS}"
            )));
        }
        Ok(())
    }

    /// Rotation period as a duration.
    pub const fn rotation_period(&self) -> Duration {
        Duration::from_secs(self.token_refresh_hours.saturating_mul(3600))
    }

    /// Server certificate request for this hub's advertised identity.
    pub fn server_cert_request(&self) -> ServerCertRequest {
        ServerCertRequest {
            common_name: self.common_name.clone(),
            organization: self.organization.clone(),
            usages: vec![Usage::ServerAuth],
            alt_names: AltNames::new(self.dns_names.clone(), self.advertise_address.as_slice()),
            validity_days: self.server_cert_validity_days,
        }
    }
}

// Default value functions for serde.
const fn default_token_refresh_hours() -> u64 {
    12
}

const fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

fn default_subject() -> String {
    String::from(DEFAULT_SUBJECT)
}

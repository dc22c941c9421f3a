//! Configuration loading and management

use crate::core::Role;
use crate::core::error::ConfigError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Hard limit on the profile role lookup at session start
    pub role_lookup_timeout_ms: u64,

    /// Role used when the lookup times out or no profile exists
    pub default_role: Role,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            role_lookup_timeout_ms: 5_000,
            default_role: Role::User,
        }
    }
}

/// Note authoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Author stamped on notes when the caller does not name one
    pub author_label: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            author_label: "Usuario Actual".to_string(),
        }
    }
}

/// Weekly report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    /// Length of the top-clients and top-orders lists
    pub top_n: usize,

    /// IANA zone the week boundaries are computed in
    pub timezone: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            timezone: "UTC".to_string(),
        }
    }
}

/// Catalog lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub product_search_limit: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            product_search_limit: 10,
        }
    }
}

/// HTTP exposure settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Remote PostgREST-compatible store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgrestConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub postgrest: Option<PostgrestConfig>,
}

/// Complete application configuration
///
/// Every section is optional in YAML; missing sections take the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub notes: NotesConfig,
    pub reports: ReportsConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.role_lookup_timeout_ms == 0 {
            return Err(invalid("identity.role_lookup_timeout_ms", "0", "must be positive"));
        }
        if self.reports.top_n == 0 {
            return Err(invalid("reports.top_n", "0", "must be positive"));
        }
        if self.catalog.product_search_limit == 0 {
            return Err(invalid("catalog.product_search_limit", "0", "must be positive"));
        }
        self.report_timezone()?;
        Ok(())
    }

    pub fn role_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.identity.role_lookup_timeout_ms)
    }

    /// Parsed report timezone
    pub fn report_timezone(&self) -> Result<Tz, ConfigError> {
        self.reports
            .timezone
            .parse::<Tz>()
            .map_err(|_| invalid("reports.timezone", &self.reports.timezone, "unknown IANA zone"))
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

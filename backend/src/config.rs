use crate::vendor::{VendorConfig, VendorKind};
use std::env;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "development" || v == "dev" => RunMode::Development,
            _ => RunMode::Production,
        }
    }

    pub fn exposes_details(self) -> bool {
        self == RunMode::Development
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown detection vendor `{0}` (expected `hive` or `deepai`)")]
    UnknownVendor(String),
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("PORT is not a valid port number: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub vendor: VendorConfig,
    // API keys are always checked against DeepAI's account endpoint.
    pub credential_check: VendorConfig,
    pub run_mode: RunMode,
    pub frontend_dir: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup("DETECTION_VENDOR") {
            Some(name) => VendorKind::parse(&name).ok_or(ConfigError::UnknownVendor(name))?,
            None => VendorKind::Hive,
        };

        let base_url = base_url_for(&lookup, kind)?;
        let credential_check = VendorConfig::new(
            VendorKind::DeepAi,
            base_url_for(&lookup, VendorKind::DeepAi)?,
        );

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8081,
        };

        Ok(Self {
            port,
            vendor: VendorConfig::new(kind, base_url),
            credential_check,
            run_mode: RunMode::parse(lookup("APP_ENV").as_deref()),
            frontend_dir: lookup("FRONTEND_DIR").filter(|v| !v.trim().is_empty()),
        })
    }
}

fn base_url_for<F>(lookup: &F, kind: VendorKind) -> Result<Url, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = match kind {
        VendorKind::Hive => "HIVE_API_URL",
        VendorKind::DeepAi => "DEEPAI_API_URL",
    };
    let raw = lookup(var)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| kind.default_base_url().to_string());
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { var, source })
}

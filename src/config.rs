use crate::access::AccessPolicy;
use crate::localized::Language;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ALLOWED_DOMAIN: &str = "escoteiros.pt";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value '{value}' for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Runtime configuration for the binaries.
///
/// | Env Var                          | Default              |
/// |----------------------------------|----------------------|
/// | `SCOUT_TOOLKIT_HTTP_ADDR`        | `0.0.0.0:3000`       |
/// | `SCOUT_TOOLKIT_DATABASE`         | unset (in memory)    |
/// | `SCOUT_TOOLKIT_CATALOG`          | unset (empty)        |
/// | `SCOUT_TOOLKIT_ALLOWED_DOMAIN`   | `escoteiros.pt`      |
/// | `SCOUT_TOOLKIT_ADMINS`           | empty, comma list    |
/// | `SCOUT_TOOLKIT_DEFAULT_LANGUAGE` | `pt`                 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitConfig {
    pub http_addr: SocketAddr,
    /// SQLite file; programs live in memory when unset.
    pub database: Option<PathBuf>,
    /// JSON activity catalogue loaded at startup.
    pub catalog: Option<PathBuf>,
    pub allowed_domain: String,
    pub admins: Vec<String>,
    pub default_language: Language,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database: None,
            catalog: None,
            allowed_domain: DEFAULT_ALLOWED_DOMAIN.to_string(),
            admins: Vec::new(),
            default_language: Language::FALLBACK,
        }
    }
}

impl ToolkitConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_addr_raw =
            get("SCOUT_TOOLKIT_HTTP_ADDR").unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr: SocketAddr = http_addr_raw.parse().map_err(|err: std::net::AddrParseError| ConfigError {
            key: "SCOUT_TOOLKIT_HTTP_ADDR",
            value: http_addr_raw.clone(),
            reason: err.to_string(),
        })?;

        let default_language: Language = match get("SCOUT_TOOLKIT_DEFAULT_LANGUAGE") {
            Some(raw) => raw.parse().map_err(|err: crate::localized::UnknownLanguage| ConfigError {
                key: "SCOUT_TOOLKIT_DEFAULT_LANGUAGE",
                value: raw.clone(),
                reason: err.to_string(),
            })?,
            None => Language::FALLBACK,
        };

        let admins: Vec<String> = get("SCOUT_TOOLKIT_ADMINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            http_addr,
            database: get("SCOUT_TOOLKIT_DATABASE").map(PathBuf::from),
            catalog: get("SCOUT_TOOLKIT_CATALOG").map(PathBuf::from),
            allowed_domain: get("SCOUT_TOOLKIT_ALLOWED_DOMAIN")
                .unwrap_or_else(|| DEFAULT_ALLOWED_DOMAIN.to_string()),
            admins,
            default_language,
        })
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.allowed_domain.clone(), &self.admins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ToolkitConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ToolkitConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        assert_eq!(config_from(&[]).unwrap(), ToolkitConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("SCOUT_TOOLKIT_HTTP_ADDR", "127.0.0.1:8080"),
            ("SCOUT_TOOLKIT_DATABASE", "/tmp/scout.db"),
            ("SCOUT_TOOLKIT_CATALOG", "catalog.json"),
            ("SCOUT_TOOLKIT_ALLOWED_DOMAIN", "scouts.org"),
            ("SCOUT_TOOLKIT_ADMINS", "a@scouts.org, b@scouts.org,,"),
            ("SCOUT_TOOLKIT_DEFAULT_LANGUAGE", "en"),
        ])
        .unwrap();
        assert_eq!(config.http_addr.port(), 8080);
        assert_eq!(config.database, Some(PathBuf::from("/tmp/scout.db")));
        assert_eq!(config.catalog, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.allowed_domain, "scouts.org");
        assert_eq!(config.admins, vec!["a@scouts.org", "b@scouts.org"]);
        assert_eq!(config.default_language, Language::En);
        assert!(config.access_policy().sign_in("a@scouts.org").unwrap().is_admin());
    }

    #[test]
    fn invalid_values_are_reported_not_panicked() {
        let err = config_from(&[("SCOUT_TOOLKIT_HTTP_ADDR", "not-an-addr")]).unwrap_err();
        assert_eq!(err.key, "SCOUT_TOOLKIT_HTTP_ADDR");

        let err = config_from(&[("SCOUT_TOOLKIT_DEFAULT_LANGUAGE", "klingon")]).unwrap_err();
        assert_eq!(err.key, "SCOUT_TOOLKIT_DEFAULT_LANGUAGE");
    }
}

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid HOST {0:?}")]
    InvalidHost(String),
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),
    #[error("invalid PUBLIC_BASE_URL {value:?}: {source}")]
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Origin under which `/storage/...` files are reachable by browsers.
    pub public_base_url: Url,
}

impl ServerConfig {
    pub const DEFAULT_PORT: u16 = 3001;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = match value("HOST") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidHost(raw.clone()))?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = match value("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => Self::DEFAULT_PORT,
        };
        let base = value("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://{host}:{port}"));
        let public_base_url = Url::parse(&base).map_err(|source| ConfigError::InvalidBaseUrl {
            value: base.clone(),
            source,
        })?;

        Ok(Self {
            host,
            port,
            public_base_url,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn public_base(&self) -> &str {
        self.public_base_url.as_str().trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr().to_string(), "127.0.0.1:3001");
        assert_eq!(config.public_base(), "http://127.0.0.1:3001");
    }

    #[test]
    fn test_overrides_and_errors() {
        let parsed = config(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("PUBLIC_BASE_URL", "https://creche.example/"),
        ])
        .unwrap();
        assert_eq!(parsed.port, 8080);
        assert_eq!(parsed.public_base(), "https://creche.example");

        assert!(matches!(
            config(&[("PORT", "porta")]),
            Err(ConfigError::InvalidPort(_))
        ));
        assert!(matches!(
            config(&[("PUBLIC_BASE_URL", "not a url")]),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }
}

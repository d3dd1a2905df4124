use std::time::Duration;

use anyhow::Context as _;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.fantlab.ru";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://fantlab.ru/";
pub const DEFAULT_DATA_BASE_URL: &str = "https://data.fantlab.ru/";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Base URLs that bare paths found in payloads are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hosts {
    /// Portraits, avatars, award icons and work covers.
    pub images: Url,
    /// Edition covers, which the payload only identifies by edition id.
    pub data: Url,
}

impl Default for Hosts {
    fn default() -> Self {
        Self {
            images: Url::parse(DEFAULT_IMAGE_BASE_URL).expect("default image base url is valid"),
            data: Url::parse(DEFAULT_DATA_BASE_URL).expect("default data base url is valid"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub hosts: Hosts,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            hosts: Hosts::default(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = non_empty(lookup("CATALOG_API_BASE_URL")) {
            config.api_base_url = normalize_api_base_url(&raw)
                .with_context(|| format!("invalid CATALOG_API_BASE_URL={raw:?}"))?;
        }
        if let Some(raw) = non_empty(lookup("CATALOG_IMAGE_BASE_URL")) {
            config.hosts.images = parse_base_url(&raw)
                .with_context(|| format!("invalid CATALOG_IMAGE_BASE_URL={raw:?}"))?;
        }
        if let Some(raw) = non_empty(lookup("CATALOG_DATA_BASE_URL")) {
            config.hosts.data = parse_base_url(&raw)
                .with_context(|| format!("invalid CATALOG_DATA_BASE_URL={raw:?}"))?;
        }
        if let Some(raw) = non_empty(lookup("CATALOG_HTTP_TIMEOUT_SECS")) {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("invalid CATALOG_HTTP_TIMEOUT_SECS={raw:?}"))?;
            config.timeout = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    pub fn with_api_base_url(mut self, raw: &str) -> anyhow::Result<Self> {
        self.api_base_url = normalize_api_base_url(raw)?;
        Ok(self)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn normalize_api_base_url(raw: &str) -> anyhow::Result<String> {
    let url = Url::parse(raw.trim()).context("parse api base url")?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("api base url must be http/https: {url}");
    }
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

/// Parses a base URL so that `join` appends to its path instead of replacing
/// the last segment.
fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_owned()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).context("parse base url")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "https://api.fantlab.ru");
        assert_eq!(config.hosts, Hosts::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn env_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CATALOG_API_BASE_URL", "http://127.0.0.1:8080/v1/"),
            ("CATALOG_DATA_BASE_URL", "https://cdn.example.org/data"),
            ("CATALOG_HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.hosts.data.as_str(), "https://cdn.example.org/data/");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_http_api_url() {
        let err = ClientConfig::from_lookup(lookup(&[("CATALOG_API_BASE_URL", "ftp://x")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("must be http/https"));
    }
}

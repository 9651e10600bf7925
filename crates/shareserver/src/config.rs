//! Server configuration loaded from environment variables

use crate::error::ShareError;

/// Port the original desktop app listens on
pub const DEFAULT_PORT: u16 = 5000;

/// Largest number of bytes rendered in a text preview
pub const DEFAULT_PREVIEW_LIMIT: u64 = 1024 * 1024;

/// Runtime configuration for the share server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareConfig {
    /// Interface to bind the listener to
    pub bind_host: String,
    /// Port the listener binds to and share URLs advertise
    pub port: u16,
    /// URL scheme used in share links
    pub scheme: String,
    /// Host placed in share links instead of the detected LAN address
    pub public_host: Option<String>,
    /// Maximum bytes of a text file shown on its preview page
    pub preview_limit: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            scheme: "http".to_string(),
            public_host: None,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
        }
    }
}

impl ShareConfig {
    /// Build configuration from `SHARE_*` environment variables
    ///
    /// Unset variables fall back to [`ShareConfig::default`].
    ///
    /// # Errors
    /// Returns [`ShareError::Config`] if a numeric variable cannot be parsed
    pub fn from_env() -> Result<Self, ShareError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShareError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = non_empty(lookup("SHARE_BIND_HOST")) {
            config.bind_host = host;
        }
        if let Some(port) = non_empty(lookup("SHARE_PORT")) {
            config.port = parse_var("SHARE_PORT", port)?;
        }
        if let Some(scheme) = non_empty(lookup("SHARE_SCHEME")) {
            config.scheme = scheme;
        }
        config.public_host = non_empty(lookup("SHARE_PUBLIC_HOST"));
        if let Some(limit) = non_empty(lookup("SHARE_PREVIEW_LIMIT")) {
            config.preview_limit = parse_var("SHARE_PREVIEW_LIMIT", limit)?;
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ShareError> {
    value
        .parse()
        .map_err(|_| ShareError::Config { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> =
            pairs.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ShareConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ShareConfig::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.scheme, "http");
        assert!(config.public_host.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ShareConfig::from_lookup(lookup_from(&[
            ("SHARE_BIND_HOST", "127.0.0.1"),
            ("SHARE_PORT", "8081"),
            ("SHARE_PUBLIC_HOST", "files.local"),
            ("SHARE_PREVIEW_LIMIT", "64"),
        ]))
        .unwrap();

        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.public_host.as_deref(), Some("files.local"));
        assert_eq!(config.preview_limit, 64);
    }

    #[test]
    fn test_blank_values_ignored() {
        let config =
            ShareConfig::from_lookup(lookup_from(&[("SHARE_PUBLIC_HOST", "  "), ("SHARE_PORT", "")]))
                .unwrap();
        assert!(config.public_host.is_none());
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port() {
        let err = ShareConfig::from_lookup(lookup_from(&[("SHARE_PORT", "http")])).unwrap_err();
        match err {
            ShareError::Config { key, value } => {
                assert_eq!(key, "SHARE_PORT");
                assert_eq!(value, "http");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

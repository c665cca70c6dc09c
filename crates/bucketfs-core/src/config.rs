//! Filesystem configuration.
//!
//! Defaults are tuned for a remote store: a 60 second attribute TTL and a
//! large cache. [`FsConfig::local()`] trades cache lifetime for freshness.
//!
//! Configuration can be deserialized (durations in humantime form, e.g.
//! `cache_ttl = "90s"`) or read from flat string properties:
//!
//! | property                          | field            |
//! |-----------------------------------|------------------|
//! | `bucketfs.cache.attributes.ttl`   | `cache_ttl` (ms) |
//! | `bucketfs.cache.attributes.size`  | `cache_capacity` |
//! | `bucketfs.list.page_size`         | `list_page_size` |
//! | `bucketfs.endpoint`               | `endpoint`       |
//! | `bucketfs.access_key`             | `access_key`     |
//! | `bucketfs.identity`               | `identity`       |

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FsError, FsResult};
use crate::store::MAX_LIST_PAGE;

/// Default attribute TTL for remote stores.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Attribute TTL for local or test stores.
pub const LOCAL_CACHE_TTL: Duration = Duration::from_secs(1);

/// Default bound on cached attribute entries.
pub const DEFAULT_CACHE_CAPACITY: u64 = 50_000;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";

pub const PROP_CACHE_TTL: &str = "bucketfs.cache.attributes.ttl";
pub const PROP_CACHE_SIZE: &str = "bucketfs.cache.attributes.size";
pub const PROP_PAGE_SIZE: &str = "bucketfs.list.page_size";
pub const PROP_ENDPOINT: &str = "bucketfs.endpoint";
pub const PROP_ACCESS_KEY: &str = "bucketfs.access_key";
pub const PROP_IDENTITY: &str = "bucketfs.identity";

/// Configuration for a [`FileSystem`](crate::FileSystem).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Lifetime of a cached attribute entry, set on write and never
    /// extended by reads.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// Maximum number of cached attribute entries.
    pub cache_capacity: u64,

    /// Keys requested per listing call. Clamped to the store maximum.
    pub list_page_size: usize,

    /// Store endpoint host, part of the connection identity.
    pub endpoint: String,

    /// Access key, part of the connection identity.
    pub access_key: Option<String>,

    /// Canonical user id of the caller, matched against ACL grants.
    pub identity: Option<String>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            list_page_size: MAX_LIST_PAGE,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            access_key: None,
            identity: None,
        }
    }
}

impl FsConfig {
    /// Short-lived cache for local stores and tests.
    pub fn local() -> Self {
        Self {
            cache_ttl: LOCAL_CACHE_TTL,
            cache_capacity: 1_000,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_list_page_size(mut self, page_size: usize) -> Self {
        self.list_page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Page size actually sent to the store.
    pub fn effective_page_size(&self) -> usize {
        self.list_page_size.clamp(1, MAX_LIST_PAGE)
    }

    /// Overlays flat properties on the defaults.
    ///
    /// Unknown properties are ignored; unparsable values are an
    /// [`FsError::InvalidArgument`].
    pub fn from_properties(props: &HashMap<String, String>) -> FsResult<Self> {
        let mut config = Self::default();
        if let Some(ms) = parse_prop::<u64>(props, PROP_CACHE_TTL)? {
            config.cache_ttl = Duration::from_millis(ms);
        }
        if let Some(size) = parse_prop::<u64>(props, PROP_CACHE_SIZE)? {
            config.cache_capacity = size;
        }
        if let Some(page) = parse_prop::<usize>(props, PROP_PAGE_SIZE)? {
            config.list_page_size = page;
        }
        if let Some(endpoint) = props.get(PROP_ENDPOINT) {
            config.endpoint.clone_from(endpoint);
        }
        config.access_key = props.get(PROP_ACCESS_KEY).cloned().or(config.access_key);
        config.identity = props.get(PROP_IDENTITY).cloned().or(config.identity);
        Ok(config)
    }
}

fn parse_prop<T: FromStr>(props: &HashMap<String, String>, name: &str) -> FsResult<Option<T>> {
    props
        .get(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                FsError::invalid_argument(format!("property {name} has invalid value {raw:?}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_remote_tuned() {
        let config = FsConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.endpoint, "s3.amazonaws.com");
        assert_eq!(config.effective_page_size(), MAX_LIST_PAGE);
    }

    #[test]
    fn test_builder_pattern() {
        let config = FsConfig::local()
            .with_cache_ttl(Duration::from_millis(250))
            .with_list_page_size(5000)
            .with_identity("u1");
        assert_eq!(config.cache_ttl, Duration::from_millis(250));
        assert_eq!(config.effective_page_size(), MAX_LIST_PAGE);
        assert_eq!(config.identity.as_deref(), Some("u1"));
    }

    #[test]
    fn test_from_properties() {
        let props: HashMap<String, String> = [
            (PROP_CACHE_TTL, "1500"),
            (PROP_CACHE_SIZE, "10"),
            (PROP_ENDPOINT, "minio.local:9000"),
            (PROP_ACCESS_KEY, "AKIA123"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = FsConfig::from_properties(&props).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_millis(1500));
        assert_eq!(config.cache_capacity, 10);
        assert_eq!(config.endpoint, "minio.local:9000");
        assert_eq!(config.access_key.as_deref(), Some("AKIA123"));
    }

    #[test]
    fn test_from_properties_rejects_garbage() {
        let props = HashMap::from([(PROP_CACHE_SIZE.to_string(), "lots".to_string())]);
        assert!(matches!(
            FsConfig::from_properties(&props),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_deserialize_humantime() {
        let config: FsConfig =
            serde_json::from_str(r#"{"cache_ttl": "2m 30s", "cache_capacity": 7}"#).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(150));
        assert_eq!(config.cache_capacity, 7);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}

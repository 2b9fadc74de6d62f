//! Sentinel connection strings.
//!
//! `tc:<image>:<tag>://<host>/<database>` names a database that does not exist
//! yet: the container-aware connector starts `<image>:<tag>` and rewrites the
//! URL to the container's real host and port.
//!
//! `postgresql` names the database type rather than an image and resolves to
//! the `postgres` image, so `tc:postgresql:11.2://localhost/test` starts
//! `postgres:11.2`.

use std::fmt;
use std::str::FromStr;

use crate::config::{ConfigurationError, SENTINEL_URL_PREFIX};

/// Database-type names mapped to the image that provides them
const IMAGE_ALIASES: &[(&str, &str)] = &[("postgresql", "postgres")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelUrl {
    pub image: String,
    pub tag: String,
    pub host: String,
    pub database: String,
}

impl SentinelUrl {
    pub fn parse(url: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| {
            ConfigurationError::invalid_value("database.url", url.to_string(), reason.to_string())
        };

        let rest = url
            .strip_prefix(SENTINEL_URL_PREFIX)
            .ok_or_else(|| invalid("sentinel URLs start with 'tc:'"))?;
        let (image_ref, location) = rest
            .split_once("://")
            .ok_or_else(|| invalid("expected 'tc:<image>:<tag>://<host>/<database>'"))?;

        // Tag is after the last ':' so registry ports stay part of the image
        let (image, tag) = image_ref
            .rsplit_once(':')
            .ok_or_else(|| invalid("image reference needs an explicit tag"))?;
        if image.is_empty() || tag.is_empty() || tag.contains('/') {
            return Err(invalid("image reference needs an explicit tag"));
        }

        let (host, database) = location
            .split_once('/')
            .ok_or_else(|| invalid("missing database name"))?;
        let database = database.split('?').next().unwrap_or_default();
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if database.is_empty() || database.contains('/') {
            return Err(invalid("missing database name"));
        }

        let image = IMAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == image)
            .map_or(image, |(_, target)| *target);

        Ok(Self {
            image: image.to_string(),
            tag: tag.to_string(),
            host: host.to_string(),
            database: database.to_string(),
        })
    }

    /// Plain connection URL once the container is reachable at `host:port`
    pub fn resolve(&self, host: &str, port: u16) -> String {
        format!("postgresql://{host}:{port}/{}", self.database)
    }
}

impl FromStr for SentinelUrl {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SentinelUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SENTINEL_URL_PREFIX}{}:{}://{}/{}",
            self.image, self.tag, self.host, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_postgres_sentinel() {
        let url = SentinelUrl::parse("tc:postgres:11.2://localhost/test").unwrap();
        assert_eq!(url.image, "postgres");
        assert_eq!(url.tag, "11.2");
        assert_eq!(url.host, "localhost");
        assert_eq!(url.database, "test");
        assert_eq!(url.resolve("127.0.0.1", 49153), "postgresql://127.0.0.1:49153/test");
    }

    #[test]
    fn test_registry_port_stays_in_image() {
        let url = SentinelUrl::parse("tc:registry.local:5000/postgres:15://db/app").unwrap();
        assert_eq!(url.image, "registry.local:5000/postgres");
        assert_eq!(url.tag, "15");
    }

    #[test]
    fn test_postgresql_resolves_to_postgres_image() {
        let url = SentinelUrl::parse("tc:postgresql:11.2://localhost/test").unwrap();
        assert_eq!(url.image, "postgres");
        assert_eq!(url.tag, "11.2");
        assert_eq!(url.to_string(), "tc:postgres:11.2://localhost/test");

        let custom = SentinelUrl::parse("tc:storm_tracker_db:latest://arbitrary/arbitrary").unwrap();
        assert_eq!(custom.image, "storm_tracker_db");
        assert_eq!(custom.tag, "latest");
    }

    #[test]
    fn test_query_string_is_dropped() {
        let url = SentinelUrl::parse("tc:postgres:11.2://localhost/test?sslmode=disable").unwrap();
        assert_eq!(url.database, "test");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "postgresql://localhost/test",
            "tc:postgres://localhost/test",
            "tc:postgres:11.2//localhost/test",
            "tc:postgres:11.2://localhost",
            "tc:postgres:11.2://localhost/",
            "tc:postgres:11.2:///test",
            "tc::11.2://localhost/test",
        ] {
            assert!(SentinelUrl::parse(bad).is_err(), "accepted {bad}");
        }
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(
            image in "[a-z][a-z0-9_-]{0,12}",
            tag in "[0-9]{1,2}(\\.[0-9]{1,2})?",
            host in "[a-z][a-z0-9-]{0,12}",
            database in "[a-z][a-z0-9_]{0,12}",
        ) {
            prop_assume!(IMAGE_ALIASES.iter().all(|(alias, _)| *alias != image));
            let url = SentinelUrl { image, tag, host, database };
            let parsed = SentinelUrl::parse(&url.to_string()).unwrap();
            prop_assert_eq!(parsed, url);
        }

        #[test]
        fn prop_without_prefix_is_rejected(s in "[a-z0-9:/._-]{0,40}") {
            prop_assume!(!s.starts_with(SENTINEL_URL_PREFIX));
            prop_assert!(SentinelUrl::parse(&s).is_err());
        }
    }
}

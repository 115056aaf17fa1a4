//! Database configuration types, deserialized directly from the app config.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ConnectOpts;

/// Connection config: a full DSN plus optional pool overrides.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DbConnConfig {
    #[serde(default = "default_dsn")]
    pub dsn: String,
    #[serde(default)]
    pub pool: Option<PoolCfg>,
}

fn default_dsn() -> String {
    "sqlite::memory:".to_string()
}

impl Default for DbConnConfig {
    fn default() -> Self {
        Self {
            dsn: default_dsn(),
            pool: None,
        }
    }
}

impl DbConnConfig {
    pub fn connect_opts(&self) -> ConnectOpts {
        self.pool
            .as_ref()
            .map(PoolCfg::to_connect_opts)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PoolCfg {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    #[serde(with = "humantime_serde", default)]
    pub acquire_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    pub max_lifetime: Option<Duration>,
    pub test_before_acquire: Option<bool>,
}

impl PoolCfg {
    /// Overlay these settings on the default connect options.
    pub fn to_connect_opts(&self) -> ConnectOpts {
        let mut opts = ConnectOpts::default();
        if let Some(n) = self.max_conns {
            opts.max_conns = Some(n);
        }
        if let Some(n) = self.min_conns {
            opts.min_conns = Some(n);
        }
        if let Some(t) = self.acquire_timeout {
            opts.acquire_timeout = Some(t);
        }
        if self.idle_timeout.is_some() {
            opts.idle_timeout = self.idle_timeout;
        }
        if self.max_lifetime.is_some() {
            opts.max_lifetime = self.max_lifetime;
        }
        if let Some(b) = self.test_before_acquire {
            opts.test_before_acquire = b;
        }
        opts
    }
}

/// Replace the password of a URL-shaped DSN with `***`.
pub fn redact_credentials(dsn: &str) -> String {
    match url::Url::parse(dsn) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_ok() {
                url.to_string()
            } else {
                dsn.to_string()
            }
        }
        _ => dsn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_overrides_apply_over_defaults() {
        let cfg: DbConnConfig = serde_yaml::from_str(
            r#"
dsn: "sqlite://data/admin.db?mode=rwc"
pool:
  max_conns: 4
  acquire_timeout: 5s
  idle_timeout: 10m
"#,
        )
        .unwrap();
        let opts = cfg.connect_opts();
        assert_eq!(opts.max_conns, Some(4));
        assert_eq!(opts.acquire_timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.idle_timeout, Some(Duration::from_secs(600)));
        assert!(opts.create_sqlite_dirs);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_yaml::from_str::<DbConnConfig>("dsn: x\nhost: y\n").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn redacts_password_only() {
        assert_eq!(
            redact_credentials("postgres://app:secret@db:5432/admin"),
            "postgres://app:***@db:5432/admin"
        );
        assert_eq!(redact_credentials("sqlite::memory:"), "sqlite::memory:");
    }
}

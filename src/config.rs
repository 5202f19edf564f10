// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Required |
//! | `AUTH_KEYS_DIR` | Directory holding `<kid>.pem` / `<kid>.pub.pem` | Required |
//! | `AUTH_ACTIVE_KID` | Key id used when issuing tokens | Optional |
//! | `AUTH_USER_ENABLED_CHECK` | Reject tokens of disabled accounts | `true` |
//! | `METRICS_SAMPLE_EVERY` | Concurrency gauge sampling interval | `1000` |
//! | `REQUEST_TIMEOUT_SECS` | Per-request deadline | `30` |
//! | `SEED_ADMIN_ID` | UUID of an enabled admin account created at startup | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::metrics::DEFAULT_SAMPLE_EVERY;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the expected token issuer.
///
/// Tokens whose `iss` differs are rejected by the authentication rule.
pub const AUTH_ISSUER_ENV: &str = "AUTH_ISSUER";

/// Environment variable name for the signing key directory.
pub const AUTH_KEYS_DIR_ENV: &str = "AUTH_KEYS_DIR";

pub const AUTH_ACTIVE_KID_ENV: &str = "AUTH_ACTIVE_KID";

/// Environment variable name for the account-enabled check.
///
/// Accepts `true`/`false`/`1`/`0`. When off, authentication never consults
/// the user lookup.
pub const AUTH_USER_ENABLED_CHECK_ENV: &str = "AUTH_USER_ENABLED_CHECK";

pub const METRICS_SAMPLE_EVERY_ENV: &str = "METRICS_SAMPLE_EVERY";
pub const REQUEST_TIMEOUT_SECS_ENV: &str = "REQUEST_TIMEOUT_SECS";

/// Environment variable name for the bootstrap admin account.
///
/// The in-memory user store starts empty; with the account-enabled check on,
/// no token is accepted until some account exists.
pub const SEED_ADMIN_ID_ENV: &str = "SEED_ADMIN_ID";

/// Environment variable name for the log output format.
///
/// Read by [`crate::telemetry::init`].
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub issuer: String,
    pub keys_dir: PathBuf,
    pub active_kid: Option<String>,
    pub user_enabled_check: bool,
    pub metrics_sample_every: u64,
    pub request_timeout: Duration,
    pub seed_admin_id: Option<Uuid>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| optional(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            host: optional(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(optional(PORT_ENV), PORT_ENV, DEFAULT_PORT)?,
            issuer: required(AUTH_ISSUER_ENV)?,
            keys_dir: PathBuf::from(required(AUTH_KEYS_DIR_ENV)?),
            active_kid: optional(AUTH_ACTIVE_KID_ENV),
            user_enabled_check: match optional(AUTH_USER_ENABLED_CHECK_ENV) {
                Some(value) => parse_bool(AUTH_USER_ENABLED_CHECK_ENV, &value)?,
                None => true,
            },
            metrics_sample_every: parse_or(
                optional(METRICS_SAMPLE_EVERY_ENV),
                METRICS_SAMPLE_EVERY_ENV,
                DEFAULT_SAMPLE_EVERY,
            )?,
            request_timeout: Duration::from_secs(parse_or(
                optional(REQUEST_TIMEOUT_SECS_ENV),
                REQUEST_TIMEOUT_SECS_ENV,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            seed_admin_id: parse_opt(optional(SEED_ADMIN_ID_ENV), SEED_ADMIN_ID_ENV)?,
        })
    }

    /// Socket address to listen on. `HOST` must be an IPv4 or IPv6 literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: HOST_ENV,
                value: self.host.clone(),
                reason: e.to_string(),
            })?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}

fn parse_opt<T>(value: Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_or<T>(value: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(value, var)?.unwrap_or(default))
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[(AUTH_ISSUER_ENV, "authgate"), (AUTH_KEYS_DIR_ENV, "/keys")];

    #[test]
    fn defaults_apply() {
        let s = settings(REQUIRED).unwrap();
        assert_eq!(s.host, DEFAULT_HOST);
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.issuer, "authgate");
        assert_eq!(s.keys_dir, PathBuf::from("/keys"));
        assert_eq!(s.active_kid, None);
        assert!(s.user_enabled_check);
        assert_eq!(s.metrics_sample_every, DEFAULT_SAMPLE_EVERY);
        assert_eq!(s.request_timeout, Duration::from_secs(30));
        assert_eq!(s.seed_admin_id, None);
        assert_eq!(s.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn required_variables_are_enforced() {
        assert_eq!(settings(&[]), Err(ConfigError::Missing(AUTH_ISSUER_ENV)));
        assert_eq!(
            settings(&[(AUTH_ISSUER_ENV, "authgate"), (AUTH_KEYS_DIR_ENV, "  ")]),
            Err(ConfigError::Missing(AUTH_KEYS_DIR_ENV))
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (PORT_ENV, "8443"),
            (AUTH_ACTIVE_KID_ENV, "k1"),
            (AUTH_USER_ENABLED_CHECK_ENV, "false"),
            (METRICS_SAMPLE_EVERY_ENV, "10"),
            (REQUEST_TIMEOUT_SECS_ENV, "5"),
            (SEED_ADMIN_ID_ENV, "5cf37266-3473-4006-984f-9325122678b7"),
        ]);
        let s = settings(&vars).unwrap();
        assert_eq!(s.port, 8443);
        assert_eq!(s.active_kid.as_deref(), Some("k1"));
        assert!(!s.user_enabled_check);
        assert_eq!(s.metrics_sample_every, 10);
        assert_eq!(s.request_timeout, Duration::from_secs(5));
        assert_eq!(
            s.seed_admin_id.map(|id| id.to_string()).as_deref(),
            Some("5cf37266-3473-4006-984f-9325122678b7")
        );
    }

    #[test]
    fn bind_addr_accepts_ipv4_and_ipv6() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([(HOST_ENV, "::"), (PORT_ENV, "8080")]);
        let addr = settings(&vars).unwrap().bind_addr().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 8080);

        let mut vars = REQUIRED.to_vec();
        vars.push((HOST_ENV, "127.0.0.1"));
        assert_eq!(
            settings(&vars).unwrap().bind_addr().unwrap().to_string(),
            "127.0.0.1:3000"
        );

        let mut vars = REQUIRED.to_vec();
        vars.push((HOST_ENV, "localhost"));
        assert!(matches!(
            settings(&vars).unwrap().bind_addr(),
            Err(ConfigError::Invalid { var: HOST_ENV, .. })
        ));
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut vars = REQUIRED.to_vec();
        vars.push((PORT_ENV, "eighty"));
        assert!(matches!(
            settings(&vars),
            Err(ConfigError::Invalid { var: PORT_ENV, .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push((AUTH_USER_ENABLED_CHECK_ENV, "maybe"));
        assert!(matches!(
            settings(&vars),
            Err(ConfigError::Invalid { var: AUTH_USER_ENABLED_CHECK_ENV, .. })
        ));
    }
}

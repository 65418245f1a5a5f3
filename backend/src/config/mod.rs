//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, token lifetimes and rate-limit thresholds.

use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for token lifetimes and the purge interval (ten years).
const MAX_LIFETIME_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

/// Upper bound for the rate-limit window (one day).
const MAX_RATE_LIMIT_WINDOW_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    pub refresh_token_purge_interval_seconds: u64,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

/// Settings consumed by the token service and password hashing.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub bcrypt_cost: u32,
    pub store_timeout_seconds: u64,
}

/// Sliding-window limiter settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl AuthConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_seconds)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 60,
            sweep_interval_seconds: 60,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;
        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)?;
        let refresh_token_purge_interval_seconds =
            parse_or(&lookup, "REFRESH_TOKEN_PURGE_INTERVAL_SECONDS", 3600u64)?;
        check_bounds(
            "REFRESH_TOKEN_PURGE_INTERVAL_SECONDS",
            refresh_token_purge_interval_seconds,
            MAX_LIFETIME_SECONDS,
        )?;

        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let auth = AuthConfig {
            jwt_secret,
            access_token_ttl_seconds: parse_or(&lookup, "ACCESS_TOKEN_TTL_SECONDS", 3600u64)?,
            refresh_token_ttl_seconds: parse_or(
                &lookup,
                "REFRESH_TOKEN_TTL_SECONDS",
                7 * 24 * 60 * 60u64,
            )?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            store_timeout_seconds: parse_or(&lookup, "STORE_TIMEOUT_SECONDS", 5u64)?,
        };

        check_bounds(
            "ACCESS_TOKEN_TTL_SECONDS",
            auth.access_token_ttl_seconds,
            MAX_LIFETIME_SECONDS,
        )?;
        check_bounds(
            "REFRESH_TOKEN_TTL_SECONDS",
            auth.refresh_token_ttl_seconds,
            MAX_LIFETIME_SECONDS,
        )?;

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?,
            window_seconds: parse_or(
                &lookup,
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.window_seconds,
            )?,
            sweep_interval_seconds: parse_or(
                &lookup,
                "RATE_LIMIT_SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            )?,
        };

        if rate_limit.max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be greater than zero");
        }
        check_bounds(
            "RATE_LIMIT_WINDOW_SECONDS",
            rate_limit.window_seconds,
            MAX_RATE_LIMIT_WINDOW_SECONDS,
        )?;
        if rate_limit.sweep_interval_seconds == 0 {
            bail!("RATE_LIMIT_SWEEP_INTERVAL_SECONDS must be greater than zero");
        }

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            refresh_token_purge_interval_seconds,
            auth,
            rate_limit,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        None => Ok(default),
    }
}

fn check_bounds(name: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        bail!("{} must be between 1 and {}", name, max);
    }
    Ok(())
}

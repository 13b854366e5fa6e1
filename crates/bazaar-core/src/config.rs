use uuid::Uuid;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = lookup("DATABASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty());
    let fulfillment_base_url = require("BAZAAR_FULFILLMENT_BASE_URL")?;

    let env = parse_environment(&or_default("BAZAAR_ENV", "development"))?;
    let log_level = or_default("BAZAAR_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BAZAAR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BAZAAR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BAZAAR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let fulfillment_api_key = lookup("BAZAAR_FULFILLMENT_API_KEY")
        .ok()
        .filter(|k| !k.is_empty());
    let fulfillment_timeout_secs = parse_u64("BAZAAR_FULFILLMENT_TIMEOUT_SECS", "30")?;
    let fulfillment_user_agent = or_default(
        "BAZAAR_FULFILLMENT_USER_AGENT",
        "bazaar/0.1 (catalog-import)",
    );
    let fulfillment_max_attempts = parse_u32("BAZAAR_FULFILLMENT_MAX_ATTEMPTS", "3")?;
    if fulfillment_max_attempts == 0 {
        return Err(invalid(
            "BAZAAR_FULFILLMENT_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let fulfillment_backoff_base_secs = parse_u64("BAZAAR_FULFILLMENT_BACKOFF_BASE_SECS", "1")?;
    let fulfillment_page_delay_ms = parse_u64("BAZAAR_FULFILLMENT_PAGE_DELAY_MS", "250")?;

    let cache_ttl_secs = parse_u64("BAZAAR_CACHE_TTL_SECS", "300")?;

    let import_chunk_size = parse_usize("BAZAAR_IMPORT_CHUNK_SIZE", "5")?;
    if import_chunk_size == 0 {
        return Err(invalid(
            "BAZAAR_IMPORT_CHUNK_SIZE",
            "must be at least 1".to_string(),
        ));
    }
    let import_vendor_id = match lookup("BAZAAR_IMPORT_VENDOR_ID") {
        Ok(raw) if !raw.is_empty() => Some(
            Uuid::parse_str(&raw).map_err(|e| invalid("BAZAAR_IMPORT_VENDOR_ID", e.to_string()))?,
        ),
        _ => None,
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        fulfillment_base_url,
        fulfillment_api_key,
        fulfillment_timeout_secs,
        fulfillment_user_agent,
        fulfillment_max_attempts,
        fulfillment_backoff_base_secs,
        fulfillment_page_delay_ms,
        cache_ttl_secs,
        import_chunk_size,
        import_vendor_id,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BAZAAR_ENV".to_string(),
            reason: format!("expected development, test, or production; got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

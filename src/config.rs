use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use crate::types::{invalid_argument, Result};

/// Signing parameters for bearer tokens.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub valid_for_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub timeout_seconds: u64,
    pub jwt: JwtSettings,
    pub bcrypt_cost: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        dotenv().ok();
        Ok(Config {
            database_url: required("DATABASE_URL")?,
            pool_size: parsed_or("DATABASE_POOL_SIZE", 8)?,
            timeout_seconds: parsed_or("DATABASE_TIMEOUT_SECONDS", 5)?,
            jwt: JwtSettings {
                secret: required("JWT_KEY")?,
                issuer: required("JWT_ISS")?,
                valid_for_seconds: parsed("JWT_VALID_FOR_SECONDS")?,
            },
            bcrypt_cost: parsed_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(ref value) if !value.trim().is_empty() => Ok(value.clone()),
        _ => Err(invalid_argument(format!(
            "Environment variable {} is required",
            key
        ))),
    }
}

fn parsed<T: FromStr>(key: &str) -> Result<T> {
    required(key)?.trim().parse::<T>().map_err(|_| {
        invalid_argument(format!(
            "Environment variable {} must be a valid number",
            key
        ))
    })
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(_) => parsed(key),
        Err(_) => Ok(default),
    }
}

//! API Configuration
//!
//! Values come from the process environment (after `.env` is loaded).

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use learning::LearningConfig;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

/// Server start-up configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub learning: LearningConfig,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 5u32)?;
        let bind_address = parse_or(
            "BIND_ADDRESS",
            SocketAddr::from_str(DEFAULT_BIND_ADDRESS).context("default bind address")?,
        )?;

        let frontend_origins = env::var("FRONTEND_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url,
            database_max_connections,
            bind_address,
            frontend_origins,
            learning: learning_config_from_env()?,
        })
    }
}

fn learning_config_from_env() -> anyhow::Result<LearningConfig> {
    let defaults = LearningConfig::default();

    let certificate_validity = match env::var("CERTIFICATE_VALIDITY_DAYS") {
        Ok(days) => {
            let days: u64 = days
                .trim()
                .parse()
                .context("CERTIFICATE_VALIDITY_DAYS must be a whole number of days")?;
            Some(Duration::from_secs(days * 24 * 3600))
        }
        Err(_) => defaults.certificate_validity,
    };

    let quiz_passing_percentage =
        parse_or("QUIZ_PASSING_PERCENTAGE", defaults.quiz_passing_percentage)?;
    if !(0.0..=100.0).contains(&quiz_passing_percentage) {
        bail!("QUIZ_PASSING_PERCENTAGE must be between 0 and 100");
    }

    Ok(LearningConfig {
        certificate_validity,
        issue_max_attempts: parse_or(
            "CERTIFICATE_ISSUE_MAX_ATTEMPTS",
            defaults.issue_max_attempts,
        )?,
        quiz_passing_percentage,
    })
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(default),
    }
}

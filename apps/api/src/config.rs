use anyhow::{Context, Result};

/// Name of the survey whose answers are copied onto the user's profile.
pub const DEFAULT_PROFILE_SURVEY_NAME: &str = "profile_completion";

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unset means in-memory stores (local development only).
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    pub profile_survey_name: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u32>()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            profile_survey_name: std::env::var("PROFILE_SURVEY_NAME")
                .unwrap_or_else(|_| DEFAULT_PROFILE_SURVEY_NAME.to_string()),
        })
    }

    /// Configuration for tests against in-memory stores.
    #[cfg(test)]
    pub fn local() -> Self {
        Config {
            database_url: None,
            db_max_connections: 1,
            port: 8080,
            rust_log: "debug".to_string(),
            profile_survey_name: DEFAULT_PROFILE_SURVEY_NAME.to_string(),
        }
    }
}

//! Server configuration parsed from environment variables.
//!
//! | Variable       | Required | Default   | Description                    |
//! |----------------|----------|-----------|--------------------------------|
//! | `DATABASE_URL` | Yes      | -         | SQLite connection string       |
//! | `JWT_SECRET`   | Yes      | -         | HS256 token-signing secret     |
//! | `PORT`         | No       | 5000      | HTTP listen port               |
//! | `UPLOAD_DIR`   | No       | `uploads` | Directory backing /uploads     |

use std::env;

use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub upload_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let jwt_secret = require("JWT_SECRET")?;
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => DEFAULT_PORT,
        };
        let upload_dir =
            env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            upload_dir,
        })
    }
}

fn require(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

//! Administrator account management.
//!
//! Public registration refuses the `ADMIN` role, so this is the only way to
//! create one.
//!
//! # Usage
//!
//! ```bash
//! cc-cli admin create -e admin@example.com -n "Admin Name" -p 'a long password'
//! ```
//!
//! # Environment Variables
//!
//! Reads the server configuration (`CAFE_DATABASE_URL`, `JWT_SECRET`, ...).

use cafe_calories_server::config::{ConfigError, ServerConfig};
use cafe_calories_server::db;
use cafe_calories_server::services::auth::Registration;
use cafe_calories_server::services::{AuthError, AuthService, TokenService};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error("{0}")]
    Auth(AuthError),
}

/// Create an `ADMIN` user and return its id.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let config = ServerConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    let tokens = TokenService::new(&config.auth);

    tracing::info!("Creating admin user: {}", email);
    let registration = Registration {
        email: email.to_owned(),
        name: name.to_owned(),
        password: password.to_owned(),
        ..Registration::default()
    };

    let user = AuthService::new(&pool, &tokens)
        .create_admin(&registration)
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => AdminError::UserExists(email.to_owned()),
            other => AdminError::Auth(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id.as_i32())
}

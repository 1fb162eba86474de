//! Authentication service.
//!
//! Accounts use email + password (Argon2id). A successful login yields an
//! access/refresh token pair; every authenticated request presents the access
//! token and is resolved back to a live, active user.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenKind, TokenPair, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::instrument;

use cafe_calories_core::{Email, Role};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Self-service registration input.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub name: String,
    pub password: String,
    /// Role name from the fixed table; `None` means `USER`.
    pub role: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub sex: Option<String>,
    pub dob: Option<NaiveDate>,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, tokens: &'a TokenService) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
        }
    }

    /// Register a new account through the public API.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::InvalidRole`,
    /// `AuthError::WeakPassword` or `AuthError::InvalidProfile` for bad input,
    /// `AuthError::AdminRegistration` for the admin role, and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: &Registration) -> Result<User, AuthError> {
        let role = match input.role.as_deref() {
            Some(name) => name.parse::<Role>()?,
            None => Role::User,
        };
        if role == Role::Admin {
            return Err(AuthError::AdminRegistration);
        }
        self.create_account(input, role).await
    }

    /// Create an administrator. Only reachable from the CLI.
    ///
    /// # Errors
    ///
    /// Same validation errors as [`AuthService::register`].
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_admin(&self, input: &Registration) -> Result<User, AuthError> {
        self.create_account(input, Role::Admin).await
    }

    async fn create_account(&self, input: &Registration, role: Role) -> Result<User, AuthError> {
        let email = Email::parse(&input.email)?;
        validate_password(&input.password)?;
        validate_profile(input)?;

        let name = input.name.trim();
        let new_user = NewUser {
            email,
            name: if name.is_empty() {
                input.email.trim().to_string()
            } else {
                name.to_string()
            },
            password_hash: hash_password(&input.password)?,
            role,
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
            sex: input.sex.clone(),
            dob: input.dob,
        };

        let user = self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Check credentials and issue a token pair.
    ///
    /// If `expected_role` is given, the account must hold exactly that role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email, wrong
    /// password, inactive account or role mismatch.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        expected_role: Option<Role>,
    ) -> Result<(User, TokenPair), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active || expected_role.is_some_and(|role| role != user.role) {
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.tokens.issue_pair(&user, Utc::now())?;
        Ok((user, tokens))
    }

    /// Resolve an access token to its live, active user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token does not verify or the
    /// user no longer exists or is inactive.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify_access(token)?;

        let user = self
            .users
            .get_by_id(claims.uid)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InvalidToken)?;

        Ok(user)
    }

    /// Deactivate the caller's own account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the update fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn deactivate(&self, user: &User) -> Result<(), AuthError> {
        self.users.set_active(user.id, false).await?;
        tracing::info!("Account deactivated");
        Ok(())
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_profile(input: &Registration) -> Result<(), AuthError> {
    let positive = |value: Option<f64>| value.is_none_or(|v| v.is_finite() && v > 0.0);
    if !positive(input.height_cm) {
        return Err(AuthError::InvalidProfile("height_cm must be positive".to_string()));
    }
    if !positive(input.weight_kg) {
        return Err(AuthError::InvalidProfile("weight_kg must be positive".to_string()));
    }
    if input.dob.is_some_and(|dob| dob > Utc::now().date_naive()) {
        return Err(AuthError::InvalidProfile("dob cannot be in the future".to_string()));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same-password").unwrap(), hash_password("same-password").unwrap());
    }

    #[test]
    fn garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn short_password_rejected() {
        assert!(matches!(validate_password("1234567"), Err(AuthError::WeakPassword(_))));
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn profile_ranges() {
        let ok = Registration {
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            ..Registration::default()
        };
        assert!(validate_profile(&ok).is_ok());

        let bad = Registration {
            weight_kg: Some(-3.0),
            ..Registration::default()
        };
        assert!(matches!(validate_profile(&bad), Err(AuthError::InvalidProfile(_))));
    }
}

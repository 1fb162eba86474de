//! Signed bearer tokens (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use cafe_calories_core::{Role, UserId};

use super::AuthError;
use crate::config::AuthConfig;
use crate::models::User;

/// Which of the pair a token is. Only access tokens authenticate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's email.
    pub sub: String,
    pub uid: UserId,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Response body of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
}

/// Issues and verifies tokens with the configured secret and lifetimes.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue an access/refresh pair for `user`, issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenKind::Access, now)?,
            refresh_token: self.issue(user, TokenKind::Refresh, now)?,
            token_type: "bearer",
        })
    }

    fn issue(&self, user: &User, kind: TokenKind, now: DateTime<Utc>) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.email.to_string(),
            uid: user.id,
            role: user.role,
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Check signature and expiry of an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, expired, forged or
    /// refresh token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;

        if data.claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use cafe_calories_core::Email;

    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from(secret),
            access_ttl: chrono::Duration::minutes(60),
            refresh_ttl: chrono::Duration::days(7),
        })
    }

    fn user() -> User {
        User {
            id: UserId::new(17),
            email: Email::parse("driver@example.com").unwrap(),
            name: "Dana".to_string(),
            role: Role::Driver,
            is_active: true,
            height_cm: None,
            weight_kg: None,
            sex: None,
            dob: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trips() {
        let tokens = service("k3y-Material-9f8e7d6c5b4a3210");
        let pair = tokens.issue_pair(&user(), Utc::now()).unwrap();

        let claims = tokens.verify_access(&pair.access_token).unwrap();
        assert_eq!(claims.uid, UserId::new(17));
        assert_eq!(claims.sub, "driver@example.com");
        assert_eq!(claims.role, Role::Driver);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(pair.token_type, "bearer");
    }

    #[test]
    fn refresh_token_does_not_authenticate() {
        let tokens = service("k3y-Material-9f8e7d6c5b4a3210");
        let pair = tokens.issue_pair(&user(), Utc::now()).unwrap();
        assert!(matches!(
            tokens.verify_access(&pair.refresh_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service("k3y-Material-9f8e7d6c5b4a3210");
        let issued = Utc::now() - chrono::Duration::hours(2);
        let pair = tokens.issue_pair(&user(), issued).unwrap();
        assert!(tokens.verify_access(&pair.access_token).is_err());
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let pair = service("k3y-Material-9f8e7d6c5b4a3210")
            .issue_pair(&user(), Utc::now())
            .unwrap();
        let other = service("0therK3y-Material-aabbccddeeff");
        assert!(other.verify_access(&pair.access_token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service("k3y-Material-9f8e7d6c5b4a3210");
        assert!(tokens.verify_access("not.a.jwt").is_err());
        assert!(tokens.verify_access("").is_err());
    }
}

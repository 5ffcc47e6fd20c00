pub mod password;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::AccountId;

pub use password::{Argon2Hasher, PasswordError};

/// Wire format of the JWT payload
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Account id, decimal
    sub: String,
    /// Token id, checked against the revocation list
    jti: Uuid,
    iat: i64,
    exp: i64,
}

/// Identity proven by a verified session token.
///
/// Only `TokenSigner::verify` produces this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    account_id: AccountId,
    token_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn token_id(&self) -> Uuid {
        self.token_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// A freshly signed session token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Remaining lifetime in whole seconds
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

/// Signs and verifies HS256 session tokens with a fixed lifetime
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        let ttl = i64::try_from(security.token_ttl_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .ok_or_else(|| JwtError::TokenGeneration("token lifetime out of range".to_string()))?;
        Self::new(&security.jwt_secret, ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, account_id: AccountId) -> Result<IssuedToken, JwtError> {
        self.sign_at(account_id, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`
    pub(crate) fn sign_at(&self, account_id: AccountId, issued_at: DateTime<Utc>) -> Result<IssuedToken, JwtError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| JwtError::TokenGeneration("expiry out of range".to_string()))?;
        let claims = TokenClaims {
            sub: account_id.to_string(),
            jti: Uuid::new_v4(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Check signature, shape and expiry. Revocation is the caller's concern.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))?;
        let claims = token_data.claims;

        let account_id = claims
            .sub
            .parse::<i64>()
            .map(AccountId)
            .map_err(|_| JwtError::InvalidToken("subject is not an account id".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| JwtError::InvalidToken("expiry out of range".to_string()))?;

        Ok(Claims {
            account_id,
            token_id: claims.jti,
            expires_at,
        })
    }
}

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{Argon2Hasher, Claims, IssuedToken, JwtError, PasswordError, TokenSigner};
use crate::database::models::{AccountId, NewAccount};
use crate::database::{AccountStore, RevocationStore, StoreError};

const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Account registration, credential checks and session tokens
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    revocations: Arc<dyn RevocationStore>,
    passwords: Arc<Argon2Hasher>,
    tokens: TokenSigner,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        revocations: Arc<dyn RevocationStore>,
        passwords: Argon2Hasher,
        tokens: TokenSigner,
    ) -> Self {
        Self {
            accounts,
            revocations,
            passwords: Arc::new(passwords),
            tokens,
        }
    }

    /// Create an account and return its id
    pub async fn register(&self, username: &str, password: &str) -> Result<AccountId, AuthError> {
        validate_username_format(username).map_err(|message| AuthError::Validation {
            field: "username",
            message,
        })?;
        validate_password(password).map_err(|message| AuthError::Validation {
            field: "password",
            message,
        })?;

        if self.accounts.find_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let password_hash = self.hash_password(password).await?;
        let new_account = NewAccount {
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        // The unique constraint catches a concurrent registration of the same name
        let account = match self.accounts.insert(new_account).await {
            Ok(account) => account,
            Err(StoreError::Conflict(_)) => return Err(AuthError::DuplicateUsername),
            Err(e) => return Err(e.into()),
        };

        info!(account_id = %account.id, username = %account.username, "Account registered");
        Ok(account.id)
    }

    /// Check credentials and issue a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let account = self.accounts.find_by_username(username).await?;

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let hasher = Arc::clone(&self.passwords);
        let password = password.to_owned();
        let matches = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => hasher.verify_dummy(&password),
        })
        .await
        .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))??;

        let account = match account {
            Some(account) if matches => account,
            _ => {
                warn!(username = %username, "Login failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.tokens.sign(account.id)?;
        info!(account_id = %account.id, "Session token issued");
        Ok(issued)
    }

    /// Verify signature, expiry and revocation status of a bearer token
    pub async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(reason = %e, "Token rejected");
            AuthError::InvalidToken
        })?;

        if self.revocations.is_revoked(claims.token_id()).await? {
            debug!(token_id = %claims.token_id(), "Token rejected: revoked");
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Revoke a token before its natural expiry.
    ///
    /// Durability follows the revocation store: the memory backend forgets
    /// revocations on restart.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.verify_token(token).await?;

        self.revocations
            .revoke(claims.token_id(), claims.expires_at())
            .await?;

        info!(account_id = %claims.account_id(), "Session token revoked");
        Ok(())
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.passwords);
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))??;
        Ok(hash)
    }
}

/// Validate username format and requirements
pub fn validate_username_format(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }

    if username.len() < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }

    if username.len() > 50 {
        return Err("Username must be at most 50 characters".to_string());
    }

    // Allow alphanumeric, underscore, hyphen
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }

    if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err("Username must start with a letter or number".to_string());
    }

    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password cannot be empty".to_string());
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!("Password must be at most {} bytes", MAX_PASSWORD_BYTES));
    }

    Ok(())
}

use std::sync::Arc;

use thiserror::Error;

use crate::{
    constants::TOKEN_KEYWORDS,
    error::StoreError,
    schema::User,
    store::Store,
};

use super::cryptography::{generate_token_key, token_digest};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    NotProvided,
    #[error("Invalid token header. No credentials provided.")]
    MissingCredentials,
    #[error("Invalid token header. Token string should not contain spaces.")]
    ContainsSpaces,
    #[error("Invalid token.")]
    InvalidToken,
    #[error("User inactive or deleted.")]
    Inactive,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum TokenConfigError {
    #[error("secret key must not be empty")]
    EmptySecret,
}

/// Issues token keys and resolves presented keys back to users. Keys are
/// stored only as HMAC digests under the server secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, TokenConfigError> {
        if secret.is_empty() {
            return Err(TokenConfigError::EmptySecret);
        }
        Ok(Self {
            secret: Arc::from(secret.as_bytes()),
        })
    }

    pub fn digest(&self, key: &str) -> String {
        token_digest(&self.secret, key)
    }

    /// Creates a new key for `user`, replacing whatever token they held.
    pub async fn issue(&self, store: &dyn Store, user: &User) -> Result<String, StoreError> {
        let key = generate_token_key();
        store.replace_token(user.id, &self.digest(&key)).await?;

        log::debug!("Issued token for user {}", user.id);
        Ok(key)
    }

    pub async fn authenticate(
        &self,
        store: &dyn Store,
        header: Option<&str>,
    ) -> Result<User, AuthError> {
        let key = parse_authorization(header)?;
        let user = store
            .user_by_token(&self.digest(key))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }
}

/// Extracts the key from `Authorization: Token <key>` (or `Bearer <key>`).
/// Other schemes count as no credentials at all.
pub fn parse_authorization(header: Option<&str>) -> Result<&str, AuthError> {
    let mut words = header.unwrap_or_default().split_whitespace();

    let keyword = words.next().ok_or(AuthError::NotProvided)?;
    if !TOKEN_KEYWORDS
        .iter()
        .any(|known| keyword.eq_ignore_ascii_case(known))
    {
        return Err(AuthError::NotProvided);
    }

    let key = words.next().ok_or(AuthError::MissingCredentials)?;
    if words.next().is_some() {
        return Err(AuthError::ContainsSpaces);
    }
    Ok(key)
}

use thiserror::Error;

use crate::{
    error::StoreError,
    form::is_valid_email,
    schema::{NewUser, User},
    store::Store,
};

use super::cryptography::{hash_password, verify_password};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Users must have an email address.")]
    MissingEmail,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("could not hash password: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::Hash(value.to_string())
    }
}

/// Lower-cases the domain part of an address. The local part is left alone
/// since some mail servers treat it as case sensitive.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

async fn insert(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: &str,
    privileged: bool,
) -> Result<User, AccountError> {
    if email.is_empty() {
        return Err(AccountError::MissingEmail);
    }

    let user = NewUser {
        email: normalize_email(email),
        name: name.to_string(),
        password: hash_password(password)?,
        is_staff: privileged,
        is_superuser: privileged,
    };
    Ok(store.create_user(user).await?)
}

pub async fn create_user(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, AccountError> {
    insert(store, email, password, name, false).await
}

pub async fn create_superuser(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, AccountError> {
    if !email.is_empty() && !is_valid_email(email) {
        return Err(AccountError::InvalidEmail);
    }

    let user = insert(store, email, password, name, true).await?;
    log::info!("Created superuser {}", user.email);
    Ok(user)
}

/// Returns the active user owning `email` when `password` matches.
pub async fn authenticate(
    store: &dyn Store,
    email: &str,
    password: &str,
) -> Result<Option<User>, AccountError> {
    let Some(user) = store.user_by_email(&normalize_email(email)).await? else {
        return Ok(None);
    };

    if !user.is_active || !verify_password(password, &user.password)? {
        return Ok(None);
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn email_domain_is_normalized() {
        let cases = [
            ("text1@EXAMPLE.com", "text1@example.com"),
            ("Rext1@EXAMPLE.COM", "Rext1@example.com"),
            ("texT2@EXAMPLE.COM", "texT2@example.com"),
            ("texT3@example.COM", "texT3@example.com"),
            ("test@example.COM", "test@example.com"),
        ];
        for (given, expected) in cases {
            assert_eq!(normalize_email(given), expected);
        }
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[tokio::test]
    async fn created_user_has_hashed_password() {
        let store = MemoryStore::new();
        let user = create_user(&store, "test@EXAMPLE.com", "testpass123", "Test")
            .await
            .unwrap();

        assert_eq!(user.email, "test@example.com");
        assert_ne!(user.password, "testpass123");
        assert!(verify_password("testpass123", &user.password).unwrap());
        assert!(user.is_active);
        assert!(!user.is_staff && !user.is_superuser);
    }

    #[tokio::test]
    async fn empty_email_is_refused() {
        let store = MemoryStore::new();

        assert!(matches!(
            create_user(&store, "", "testpass123", "Test").await,
            Err(AccountError::MissingEmail)
        ));
    }

    #[tokio::test]
    async fn superuser_is_staff() {
        let store = MemoryStore::new();
        let user = create_superuser(&store, "admin@example.com", "testpass123", "Admin")
            .await
            .unwrap();

        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[tokio::test]
    async fn superuser_needs_a_usable_email() {
        let store = MemoryStore::new();

        assert!(matches!(
            create_superuser(&store, "admin", "testpass123", "Admin").await,
            Err(AccountError::InvalidEmail)
        ));
        assert!(matches!(
            create_superuser(&store, "", "testpass123", "Admin").await,
            Err(AccountError::MissingEmail)
        ));
        assert!(store.user_by_email("admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        create_user(&store, "test@example.com", "testpass123", "A")
            .await
            .unwrap();

        assert!(matches!(
            create_user(&store, "test@EXAMPLE.COM", "testpass123", "B").await,
            Err(AccountError::Store(StoreError::Conflict { field: "email", .. }))
        ));
    }

    #[tokio::test]
    async fn authenticate_checks_password_and_activity() {
        let store = MemoryStore::new();
        let user = create_user(&store, "test@example.com", "testpass123", "Test")
            .await
            .unwrap();

        let found = authenticate(&store, "test@EXAMPLE.com", "testpass123")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(authenticate(&store, "test@example.com", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(authenticate(&store, "nobody@example.com", "testpass123")
            .await
            .unwrap()
            .is_none());

        store.deactivate(user.id).await;
        assert!(authenticate(&store, "test@example.com", "testpass123")
            .await
            .unwrap()
            .is_none());
    }
}

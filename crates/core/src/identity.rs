//! Accounts and user profiles.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Passwords shorter than this are rejected, as Firebase does.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Identifies an account in an [`IdentityStore`].
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an identifier issued by a store.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a user declared about themselves at signup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The department the user works in.
    #[serde(default)]
    pub department: String,
    /// Topics the user is interested in.
    #[serde(default)]
    pub interests: BTreeSet<String>,
    /// Skills the user has.
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl UserProfile {
    /// Builds a profile from the raw signup fields, where interests and
    /// skills are comma-separated lists.
    pub fn from_fields(
        department: &str,
        interests: &str,
        skills: &str,
    ) -> Self {
        Self {
            department: department.trim().to_owned(),
            interests: parse_list(interests),
            skills: parse_list(skills),
        }
    }
}

/// Splits a comma-separated list, dropping blank items.
pub fn parse_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Errors returned by an [`IdentityStore`].
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// An account with the email address already exists.
    #[error("email already exists")]
    DuplicateEmail,
    /// No account has the email address.
    #[error("account not found")]
    AccountNotFound,
    /// The password does not match.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The email address is malformed.
    #[error("invalid email address")]
    InvalidEmail,
    /// The password is too weak.
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    /// The backing service failed.
    #[error("identity backend error: {0}")]
    Backend(String),
}

/// Where accounts and profiles are kept.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Registers a new account.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError>;

    /// Looks an account up by email address.
    async fn find_account(&self, email: &str)
    -> Result<AccountId, IdentityError>;

    /// Checks the password of an account.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError>;

    /// Returns the stored profile of an account, if there is one.
    async fn profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<UserProfile>, IdentityError>;

    /// Stores the profile of an account, replacing any previous one.
    async fn set_profile(
        &self,
        id: &AccountId,
        profile: &UserProfile,
    ) -> Result<(), IdentityError>;

    /// Removes an account together with its profile.
    async fn delete_account(&self, id: &AccountId)
    -> Result<(), IdentityError>;
}

/// Checks that `email` looks like an address.
pub fn validate_email(email: &str) -> Result<(), IdentityError> {
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(())
        }
        _ => Err(IdentityError::InvalidEmail),
    }
}

/// Checks the email and password rules shared by every store.
pub fn validate_credentials(
    email: &str,
    password: &str,
) -> Result<(), IdentityError> {
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::WeakPassword);
    }
    Ok(())
}

struct Account {
    id: AccountId,
    password: String,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    profiles: HashMap<AccountId, UserProfile>,
}

/// A process-local [`IdentityStore`].
///
/// Passwords are kept in memory as given. Use it for development and tests
/// only.
#[derive(Default)]
pub struct MemoryIdentityStore {
    accounts: RwLock<Accounts>,
}

impl MemoryIdentityStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

#[inline]
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        validate_email(email)?;
        let mut accounts = self.accounts.write().await;
        let normalized = normalize_email(email);
        if accounts.by_email.contains_key(&normalized) {
            return Err(IdentityError::DuplicateEmail);
        }
        validate_credentials(email, password)?;
        let id = AccountId::new(Uuid::new_v4().simple().to_string());
        debug!("created account {id}");
        accounts.by_email.insert(
            normalized,
            Account {
                id: id.clone(),
                password: password.to_owned(),
            },
        );
        Ok(id)
    }

    async fn find_account(
        &self,
        email: &str,
    ) -> Result<AccountId, IdentityError> {
        let accounts = self.accounts.read().await;
        accounts
            .by_email
            .get(&normalize_email(email))
            .map(|account| account.id.clone())
            .ok_or(IdentityError::AccountNotFound)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .by_email
            .get(&normalize_email(email))
            .ok_or(IdentityError::AccountNotFound)?;
        if account.password != password {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(account.id.clone())
    }

    async fn profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<UserProfile>, IdentityError> {
        Ok(self.accounts.read().await.profiles.get(id).cloned())
    }

    async fn set_profile(
        &self,
        id: &AccountId,
        profile: &UserProfile,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        if !accounts.by_email.values().any(|account| &account.id == id) {
            return Err(IdentityError::AccountNotFound);
        }
        accounts.profiles.insert(id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_account(
        &self,
        id: &AccountId,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.by_email.len();
        accounts.by_email.retain(|_, account| &account.id != id);
        if accounts.by_email.len() == before {
            return Err(IdentityError::AccountNotFound);
        }
        accounts.profiles.remove(id);
        debug!("deleted account {id}");
        Ok(())
    }
}

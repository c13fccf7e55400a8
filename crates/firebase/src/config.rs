use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Builder for [`FirebaseConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FirebaseConfigBuilder {
    api_key: String,
    database_url: String,
    auth_url: Option<String>,
    database_secret: Option<String>,
    admin_token: Option<String>,
    timeout: Option<Duration>,
}

impl FirebaseConfigBuilder {
    /// Creates a builder with the web API key of the project and the URL
    /// of its Realtime Database.
    #[inline]
    pub fn with_api_key<K, U>(api_key: K, database_url: U) -> Self
    where
        K: Into<String>,
        U: Into<String>,
    {
        Self {
            api_key: api_key.into(),
            database_url: database_url.into(),
            auth_url: None,
            database_secret: None,
            admin_token: None,
            timeout: None,
        }
    }

    /// Sets a custom Identity Toolkit URL, e.g. the auth emulator.
    #[inline]
    pub fn with_auth_url<S: Into<String>>(mut self, auth_url: S) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    /// Sets the secret used to read and write profiles.
    #[inline]
    pub fn with_database_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.database_secret = Some(secret.into());
        self
    }

    /// Sets the OAuth token that allows looking accounts up by email.
    #[inline]
    pub fn with_admin_token<S: Into<String>>(mut self, token: S) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    /// Sets how long a single HTTP request may take.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> FirebaseConfig {
        let auth_url =
            self.auth_url.unwrap_or_else(|| DEFAULT_AUTH_URL.to_owned());
        FirebaseConfig {
            api_key: self.api_key,
            database_url: self.database_url.trim_end_matches('/').to_owned(),
            auth_url: auth_url.trim_end_matches('/').to_owned(),
            database_secret: self.database_secret,
            admin_token: self.admin_token,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl Debug for FirebaseConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfigBuilder")
            .field("api_key", &"<deducted>")
            .field("database_url", &self.database_url)
            .field("auth_url", &self.auth_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Configuration for [`FirebaseIdentityStore`](crate::FirebaseIdentityStore).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FirebaseConfig {
    pub(crate) api_key: String,
    pub(crate) database_url: String,
    pub(crate) auth_url: String,
    pub(crate) database_secret: Option<String>,
    pub(crate) admin_token: Option<String>,
    pub(crate) timeout: Duration,
}

impl FirebaseConfig {
    pub(crate) fn auth_endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{method}?key={}", self.auth_url, self.api_key)
    }

    pub(crate) fn profile_endpoint(&self, id: &str) -> String {
        match &self.database_secret {
            Some(secret) => {
                format!("{}/users/{id}.json?auth={secret}", self.database_url)
            }
            None => format!("{}/users/{id}.json", self.database_url),
        }
    }
}

impl Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"<deducted>")
            .field("database_url", &self.database_url)
            .field("auth_url", &self.auth_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

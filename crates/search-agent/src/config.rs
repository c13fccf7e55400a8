use std::env;
use std::sync::Arc;

use search_agent_core::identity::{IdentityStore, MemoryIdentityStore};
use search_agent_firebase::{
    FirebaseConfig, FirebaseConfigBuilder, FirebaseIdentityStore,
};
use search_agent_openai_model::{
    OpenAIConfig, OpenAIConfigBuilder, OpenAIProvider,
};
use search_agent_tavily::{TavilyConfig, TavilyConfigBuilder, TavilyProvider};

use crate::SessionBuilder;

/// Errors found while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One of the required API keys is not set.
    #[error("Please set OPENAI_API_KEY and TAVILY_API_KEY in your .env file")]
    MissingApiKeys,
    /// A variable is set to something unusable.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Name of the variable.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Everything needed to assemble a [`Session`](crate::Session).
#[derive(Clone, Debug)]
pub struct Config {
    /// The completion service.
    pub openai: OpenAIConfig,
    /// The search service.
    pub tavily: TavilyConfig,
    /// Overrides the default limit of tool invocations per query.
    pub max_iterations: Option<usize>,
    /// The identity store. Accounts are kept in memory when unset.
    pub firebase: Option<FirebaseConfig>,
}

impl Config {
    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let (Some(openai_key), Some(tavily_key)) =
            (var("OPENAI_API_KEY"), var("TAVILY_API_KEY"))
        else {
            return Err(ConfigError::MissingApiKeys);
        };

        let mut openai = OpenAIConfigBuilder::with_api_key(openai_key);
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            openai = openai.with_model(model);
        }

        let max_iterations = match var("SEARCH_AGENT_MAX_ITERATIONS") {
            Some(value) => Some(value.parse().map_err(|_| {
                ConfigError::InvalidValue {
                    name: "SEARCH_AGENT_MAX_ITERATIONS",
                    value,
                }
            })?),
            None => None,
        };

        let firebase_vars =
            (var("FIREBASE_API_KEY"), var("FIREBASE_DATABASE_URL"));
        let firebase = match firebase_vars {
            (Some(api_key), Some(database_url)) => {
                let mut builder =
                    FirebaseConfigBuilder::with_api_key(api_key, database_url);
                if let Some(secret) = var("FIREBASE_DATABASE_SECRET") {
                    builder = builder.with_database_secret(secret);
                }
                if let Some(token) = var("FIREBASE_ADMIN_TOKEN") {
                    builder = builder.with_admin_token(token);
                }
                Some(builder.build())
            }
            _ => None,
        };

        Ok(Self {
            openai: openai.build(),
            tavily: TavilyConfigBuilder::with_api_key(tavily_key).build(),
            max_iterations,
            firebase,
        })
    }

    /// Creates a session builder wired to the configured services.
    pub fn session_builder(self) -> SessionBuilder {
        let identity_store: Arc<dyn IdentityStore> = match self.firebase {
            Some(config) => Arc::new(FirebaseIdentityStore::new(config)),
            None => {
                warn!("Firebase is not configured, accounts live in memory");
                Arc::new(MemoryIdentityStore::new())
            }
        };
        let mut builder = SessionBuilder::with_providers(
            OpenAIProvider::new(self.openai),
            TavilyProvider::new(self.tavily),
        )
        .with_identity_store(identity_store);
        if let Some(max_iterations) = self.max_iterations {
            builder = builder.with_max_iterations(max_iterations);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_missing_keys() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKeys));
        assert_eq!(
            err.to_string(),
            "Please set OPENAI_API_KEY and TAVILY_API_KEY in your .env file"
        );

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "  "),
            ("TAVILY_API_KEY", "tvly"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKeys));
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("TAVILY_API_KEY", "tvly"),
            ("SEARCH_AGENT_MAX_ITERATIONS", "4"),
            ("FIREBASE_API_KEY", "web-key"),
            ("FIREBASE_DATABASE_URL", "https://demo.firebaseio.com"),
        ]))
        .unwrap();
        assert_eq!(config.openai.model(), "gpt-4o-mini");
        assert_eq!(config.max_iterations, Some(4));
        assert!(config.firebase.is_some());
    }

    #[test]
    fn test_defaults_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("TAVILY_API_KEY", "tvly"),
            ("FIREBASE_API_KEY", "web-key"),
        ]))
        .unwrap();
        assert_eq!(config.openai.model(), "gpt-3.5-turbo");
        assert_eq!(config.max_iterations, None);
        assert!(config.firebase.is_none());

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk"),
            ("TAVILY_API_KEY", "tvly"),
            ("SEARCH_AGENT_MAX_ITERATIONS", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name, .. }
                if name == "SEARCH_AGENT_MAX_ITERATIONS"
        ));
    }
}

//! An identity store backed by Firebase.
//!
//! Accounts live in Firebase Authentication and are managed through the
//! Identity Toolkit REST API. Profiles are kept in the Realtime Database
//! under `users/{account id}`.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use search_agent_core::identity::{
    AccountId, IdentityError, IdentityStore, UserProfile,
};
use serde::de::DeserializeOwned;

pub use config::{FirebaseConfig, FirebaseConfigBuilder};
use proto::{
    AccountResponse, DeleteRequest, ErrorBody, LookupRequest, LookupResponse,
    PasswordRequest,
};

#[inline]
fn backend_error(err: reqwest::Error) -> IdentityError {
    IdentityError::Backend(format!("{err}"))
}

/// Firebase identity store.
#[derive(Clone, Debug)]
pub struct FirebaseIdentityStore {
    client: Client,
    config: Arc<FirebaseConfig>,
}

impl FirebaseIdentityStore {
    /// Creates a new `FirebaseIdentityStore` with the given configuration.
    #[inline]
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        let req = self
            .client
            .post(self.config.auth_endpoint(method))
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            });
        let resp: AccountResponse = self.send(req).await?;
        Ok(AccountId::new(resp.local_id))
    }

    fn admin_token(&self, action: &str) -> Result<&str, IdentityError> {
        self.config.admin_token.as_deref().ok_or_else(|| {
            IdentityError::Backend(format!(
                "{action} accounts requires an admin token"
            ))
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, IdentityError> {
        let resp = req
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(backend_error)?;
        let resp = check_status(resp).await?;
        resp.json().await.map_err(backend_error)
    }
}

async fn check_status(resp: Response) -> Result<Response, IdentityError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(body) => proto::convert_error(&body.error.message),
        Err(_) => IdentityError::Backend(format!("{status}: {body}")),
    };
    if matches!(err, IdentityError::Backend(_)) {
        warn!("firebase request failed with {status}: {body}");
    }
    Err(err)
}

#[async_trait]
impl IdentityStore for FirebaseIdentityStore {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        let id = self.password_call("signUp", email, password).await?;
        info!("created account {id}");
        Ok(id)
    }

    async fn find_account(
        &self,
        email: &str,
    ) -> Result<AccountId, IdentityError> {
        let token = self.admin_token("looking up")?;
        let req = self
            .client
            .post(format!("{}/accounts:lookup", self.config.auth_url))
            .bearer_auth(token)
            .json(&LookupRequest { email: [email] });
        let resp: LookupResponse = self.send(req).await?;
        resp.users
            .into_iter()
            .next()
            .map(|user| AccountId::new(user.local_id))
            .ok_or(IdentityError::AccountNotFound)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccountId, IdentityError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn profile(
        &self,
        id: &AccountId,
    ) -> Result<Option<UserProfile>, IdentityError> {
        let req = self.client.get(self.config.profile_endpoint(id.as_str()));
        // The database answers `null` for a missing key.
        self.send(req).await
    }

    async fn set_profile(
        &self,
        id: &AccountId,
        profile: &UserProfile,
    ) -> Result<(), IdentityError> {
        let req = self
            .client
            .put(self.config.profile_endpoint(id.as_str()))
            .json(profile);
        let _: serde_json::Value = self.send(req).await?;
        debug!("stored profile of {id}");
        Ok(())
    }

    async fn delete_account(
        &self,
        id: &AccountId,
    ) -> Result<(), IdentityError> {
        let token = self.admin_token("deleting")?;
        let req = self
            .client
            .delete(self.config.profile_endpoint(id.as_str()));
        let _: serde_json::Value = self.send(req).await?;
        let req = self
            .client
            .post(format!("{}/accounts:delete", self.config.auth_url))
            .bearer_auth(token)
            .json(&DeleteRequest {
                local_id: id.as_str(),
            });
        let _: serde_json::Value = self.send(req).await?;
        info!("deleted account {id}");
        Ok(())
    }
}

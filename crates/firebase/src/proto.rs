use search_agent_core::identity::IdentityError;
use serde::{Deserialize, Serialize};

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub return_secure_token: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LookupRequest<'a> {
    pub email: [&'a str; 1],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub local_id: &'a str,
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub local_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub users: Vec<AccountResponse>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// Maps an Identity Toolkit error message to an [`IdentityError`].
///
/// Messages look like `EMAIL_EXISTS` or `WEAK_PASSWORD : Password should
/// be at least 6 characters`.
pub fn convert_error(message: &str) -> IdentityError {
    let code = message.split(" : ").next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => IdentityError::DuplicateEmail,
        "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => IdentityError::AccountNotFound,
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            IdentityError::InvalidCredentials
        }
        "INVALID_EMAIL" | "MISSING_EMAIL" => IdentityError::InvalidEmail,
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => IdentityError::WeakPassword,
        _ => IdentityError::Backend(message.to_owned()),
    }
}

use crate::utils::error::{Result, TelemetryError};
use serde::Deserialize;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The subset of a Firebase service-account key this service reads.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("account_type", &self.account_type)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| TelemetryError::Credentials {
            message: format!("service account JSON is invalid: {}", e),
        })
    }

    pub fn from_env(var_name: &str) -> Result<Self> {
        let raw = std::env::var(var_name).map_err(|_| TelemetryError::Credentials {
            message: format!("Firebase credentials not found in ${}", var_name),
        })?;
        Self::from_json(&raw)
    }

    /// True when the key can sign its own OAuth2 assertions.
    pub fn can_sign(&self) -> bool {
        self.client_email.is_some() && self.private_key.is_some()
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

/// Project id from explicit configuration, else from the service account.
pub fn resolve_project_id(explicit: Option<&str>, account: Option<&ServiceAccount>) -> Result<String> {
    if let Some(project_id) = explicit {
        return Ok(project_id.to_string());
    }
    let account = account.ok_or_else(|| TelemetryError::Credentials {
        message: "no project id configured and no service account loaded".to_string(),
    })?;
    tracing::debug!(
        "Using project {} from service account {}",
        account.project_id,
        account.client_email.as_deref().unwrap_or("<unknown>")
    );
    Ok(account.project_id.clone())
}

/// Loads the service account from `credentials_env`, logging instead of
/// failing when it is absent or malformed.
pub fn load_service_account(credentials_env: &str) -> Option<ServiceAccount> {
    match ServiceAccount::from_env(credentials_env) {
        Ok(account) => Some(account),
        Err(e) => {
            tracing::debug!("No service account available: {}", e);
            None
        }
    }
}

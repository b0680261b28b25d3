//! GoTrue admin API adapter.
//!
//! Implements `AccountProvisioner` against a GoTrue-compatible auth server
//! using its service-role key.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::billing::normalize_email;
use crate::domain::foundation::{AccountId, DomainError, ErrorCode};
use crate::ports::{AccountProvisioner, Identity, NewIdentity};

#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Auth server admin base URL, e.g. `https://auth.example.com/auth/v1`.
    pub base_url: String,
    service_key: SecretString,
    /// Where the activation link lands after the password is set.
    pub redirect_url: Option<String>,
    pub timeout: Duration,
}

impl GoTrueConfig {
    pub fn new(base_url: impl Into<String>, service_key: SecretString) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key,
            redirect_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    #[serde(default)]
    users: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    email_confirm: bool,
    user_metadata: UserMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UserMetadata<'a> {
    role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct GenerateLinkRequest<'a> {
    #[serde(rename = "type")]
    link_type: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateLinkResponse {
    action_link: String,
}

pub struct GoTrueProvisioner {
    config: GoTrueConfig,
    client: Client,
}

impl GoTrueProvisioner {
    pub fn new(config: GoTrueConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let key = self.config.service_key.expose_secret();
        builder.bearer_auth(key).header("apikey", key.as_str())
    }
}

fn identity_error(message: impl Into<String>) -> DomainError {
    DomainError::external("identity", message)
}

fn to_identity(user: UserResponse, fallback_email: &str) -> Identity {
    Identity {
        id: AccountId::from_uuid(user.id),
        email: normalize_email(user.email.as_deref().unwrap_or(fallback_email)),
    }
}

#[async_trait]
impl AccountProvisioner for GoTrueProvisioner {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, DomainError> {
        let email = normalize_email(email);
        let response = self
            .authorized(self.client.get(format!("{}/admin/users", self.config.base_url)))
            .query(&[("filter", email.as_str())])
            .send()
            .await
            .map_err(|e| identity_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(identity_error(format!(
                "user lookup returned {}",
                response.status()
            )));
        }

        let list: UserListResponse = response
            .json()
            .await
            .map_err(|e| identity_error(format!("invalid user list: {}", e)))?;

        // The filter is a substring match; only an exact email counts.
        Ok(list
            .users
            .into_iter()
            .find(|u| u.email.as_deref().map(normalize_email).as_deref() == Some(email.as_str()))
            .map(|u| to_identity(u, &email)))
    }

    async fn create_identity(&self, identity: &NewIdentity) -> Result<Identity, DomainError> {
        let email = normalize_email(&identity.email);
        let body = CreateUserRequest {
            email: &email,
            email_confirm: true,
            user_metadata: UserMetadata {
                role: identity.role.as_str(),
                full_name: identity.full_name.as_deref(),
                phone: identity.phone.as_deref(),
            },
        };

        let response = self
            .authorized(self.client.post(format!("{}/admin/users", self.config.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| identity_error(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let user: UserResponse = response
                    .json()
                    .await
                    .map_err(|e| identity_error(format!("invalid user response: {}", e)))?;
                Ok(to_identity(user, &email))
            }
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => Err(DomainError::new(
                ErrorCode::AccountExists,
                "Email already registered",
            )),
            status => {
                let detail = response.text().await.unwrap_or_default();
                Err(identity_error(format!(
                    "user creation returned {}: {}",
                    status, detail
                )))
            }
        }
    }

    async fn generate_activation_link(&self, email: &str) -> Result<String, DomainError> {
        let email = normalize_email(email);
        let body = GenerateLinkRequest {
            link_type: "recovery",
            email: &email,
            redirect_to: self.config.redirect_url.as_deref(),
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/admin/generate_link", self.config.base_url)),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| identity_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(identity_error(format!(
                "link generation returned {}",
                response.status()
            )));
        }

        let link: GenerateLinkResponse = response
            .json()
            .await
            .map_err(|e| identity_error(format!("invalid link response: {}", e)))?;
        Ok(link.action_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Role;

    #[test]
    fn create_request_carries_role_and_profile() {
        let email = "e@x.com";
        let body = CreateUserRequest {
            email,
            email_confirm: true,
            user_metadata: UserMetadata {
                role: Role::Student.as_str(),
                full_name: Some("Eve"),
                phone: None,
            },
        };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["user_metadata"]["role"], "student");
        assert_eq!(json["user_metadata"]["full_name"], "Eve");
        assert!(json["user_metadata"].get("phone").is_none());
    }

    #[test]
    fn identity_email_is_normalized() {
        let user: UserResponse = serde_json::from_value(serde_json::json!({
            "id": "6f1c6a0e-4a8e-4b59-9df4-6b2d3c1e0a11",
            "email": "E@X.com "
        }))
        .unwrap();

        assert_eq!(to_identity(user, "fallback@x.com").email, "e@x.com");
    }

    #[test]
    fn config_trims_trailing_slash() {
        let config = GoTrueConfig::new("https://auth.test/", SecretString::new("k".to_string()));
        assert_eq!(config.base_url, "https://auth.test");
    }
}

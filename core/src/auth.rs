//! Credential acquisition.
//!
//! # Design
//! Only two strategies exist, so they are a closed enum rather than a trait.
//! The strategy runs exactly once, inside `Client::new`; the resulting
//! `Credentials` are reused for the lifetime of the client and never
//! refreshed.

use serde::{Deserialize, Serialize};

/// How the client obtains its access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticator {
    /// Exchange an email and password for a token via `POST auth/login`.
    PasswordExchange { email: String, password: String },
    /// Use a pre-issued API token as a bearer token.
    StaticToken { token: String },
}

impl Authenticator {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Authenticator::PasswordExchange {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Authenticator::StaticToken { token: token.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub expires_at: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub credentials: Credentials,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_is_bearer() {
        let creds = Credentials::bearer("abc");
        assert_eq!(creds.authorization(), "Bearer abc");
        assert!(creds.expires_at.is_none());
    }

    #[test]
    fn login_response_decodes_credentials() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"credentials":{"access_token":"t0k","token_type":"Bearer","expires_at":"2030-01-01 00:00:00"}}"#,
        )
        .unwrap();
        assert_eq!(resp.credentials.authorization(), "Bearer t0k");
        assert_eq!(resp.credentials.expires_at.as_deref(), Some("2030-01-01 00:00:00"));
    }

    #[test]
    fn empty_expiry_is_none() {
        let creds: Credentials =
            serde_json::from_str(r#"{"access_token":"x","token_type":"Bearer","expires_at":""}"#).unwrap();
        assert!(creds.expires_at.is_none());
    }
}

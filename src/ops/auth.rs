//! Login and logout.
//!
//! These are the only operations that return errors to the caller instead
//! of notifying them: a CLI or embedding UI needs the exact failure to show
//! on its login prompt.

use reqwest::header::{HeaderValue, CONTENT_TYPE};

use super::Session;
use crate::client::RequestOptions;
use crate::credential::Credential;
use crate::error::ApiError;
use crate::models::TokenResponse;
use crate::notify::Severity;
use crate::routes::Route;

impl Session {
    /// Exchanges a user name and password for a bearer token and persists
    /// it. Nothing is stored when the server rejects the credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        if username.trim().is_empty() {
            return Err(ApiError::Validation("Enter a user name".to_string()));
        }
        let options = RequestOptions::new()
            .form(vec![
                ("username".to_string(), username.to_string()),
                ("password".to_string(), password.to_string()),
                ("grant_type".to_string(), "password".to_string()),
            ])
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );

        let token: TokenResponse = self.client.post(&Route::Token, options).await?;
        let credential = Credential {
            username: username.to_string(),
            token: token.access_token,
        };
        self.client.credentials().set(&credential)?;
        tracing::info!(username = %credential.username, "logged in");
        Ok(credential)
    }

    /// Ends the server session. The local credential is cleared only when
    /// the server answers `200`; any other answer leaves it in place.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let status = self
            .client
            .post_status(&Route::Disconnect, RequestOptions::new())
            .await?;
        if status != 200 {
            return Err(ApiError::Http {
                status,
                detail: "unexpected logout response".to_string(),
            });
        }
        self.client.credentials().clear()?;
        self.notify(Severity::Info, "Logged out");
        Ok(())
    }
}

//! Authentication service endpoints
//!
//! Every request carries the project's anon key in the `apikey` header. Calls
//! made on behalf of a user also carry the user's access token as a bearer
//! token; the table and storage services use it to apply row-level security.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, info};

use super::client::BackendClient;
use super::error::BackendError;
use super::models::{Credentials, Session, SignUpResponse, TokenResponse, User};

/// Outcome of creating an account
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Account created and signed in
    SignedIn(Session),
    /// Account created, email confirmation pending
    ConfirmationRequired(User),
}

/// Build the headers identifying the project and, if present, the user
pub fn auth_headers(anon_key: &str, access_token: Option<&str>) -> Result<HeaderMap, BackendError> {
    let mut headers = HeaderMap::new();

    let apikey =
        HeaderValue::from_str(anon_key).map_err(|_| BackendError::InvalidHeader("anon key"))?;
    headers.insert("apikey", apikey);

    let bearer = format!("Bearer {}", access_token.unwrap_or(anon_key));
    let mut bearer =
        HeaderValue::from_str(&bearer).map_err(|_| BackendError::InvalidHeader("access token"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Ok(headers)
}

impl BackendClient {
    /// Create an account with email and password
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
        debug!("Signing up {}", email);

        let response: SignUpResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "/auth/v1/signup")?
                    .json(&Credentials { email, password }),
            )
            .await?;

        Ok(match response {
            SignUpResponse::Session(token) => {
                info!("Account created for {}", email);
                SignUpOutcome::SignedIn(Session::from_token(token))
            }
            SignUpResponse::User(user) => {
                info!("Account created for {}, confirmation pending", email);
                SignUpOutcome::ConfirmationRequired(user)
            }
        })
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        debug!("Signing in {}", email);

        let token: TokenResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "/auth/v1/token")?
                    .query(&[("grant_type", "password")])
                    .json(&Credentials { email, password }),
            )
            .await?;

        Ok(Session::from_token(token))
    }

    /// Exchange a refresh token for a new session
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        debug!("Refreshing session");

        let token: TokenResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "/auth/v1/token")?
                    .query(&[("grant_type", "refresh_token")])
                    .json(&serde_json::json!({ "refresh_token": refresh_token })),
            )
            .await?;

        Ok(Session::from_token(token))
    }

    /// Revoke the current session on the server
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        if self.access_token().is_none() {
            return Err(BackendError::Unauthorized);
        }

        debug!("Signing out");
        self.send_empty(self.request(reqwest::Method::POST, "/auth/v1/logout")?)
            .await
    }

    /// Fetch the user the current access token belongs to
    pub async fn get_user(&self) -> Result<User, BackendError> {
        if self.access_token().is_none() {
            return Err(BackendError::Unauthorized);
        }

        self.send_json(self.request(reqwest::Method::GET, "/auth/v1/user")?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_headers_anonymous() {
        let headers = auth_headers("anon-key", None).unwrap();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon-key");
    }

    #[test]
    fn test_auth_headers_user_token() {
        let headers = auth_headers("anon-key", Some("user-jwt")).unwrap();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer user-jwt");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_auth_headers_reject_invalid_key() {
        let err = auth_headers("bad\nkey", None).unwrap_err();
        assert!(matches!(err, BackendError::InvalidHeader("anon key")));

        let err = auth_headers("anon-key", Some("bad\ntoken")).unwrap_err();
        assert!(matches!(err, BackendError::InvalidHeader("access token")));
    }
}

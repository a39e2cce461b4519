//! Keyring-based session storage

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info, warn};

use journal::backend::{BackendClient, BackendError, Session, SignUpOutcome};
use journal::config::BackendSettings;

const KEYRING_SERVICE: &str = "journal";
const SESSION_KEY: &str = "session";

/// Reject empty credentials before contacting the auth service
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        anyhow::bail!("Email and password are required");
    }
    Ok(())
}

/// Manages the signed-in session
pub struct SessionManager;

impl SessionManager {
    /// Fill in missing credentials interactively
    ///
    /// With `confirm` set the password is asked for twice, as when creating an account.
    pub fn prompt_credentials(
        email: Option<String>,
        password: Option<String>,
        confirm: bool,
    ) -> Result<(String, String)> {
        let email = match email {
            Some(email) => email,
            None => Input::new()
                .with_prompt("Email")
                .interact_text()
                .context("Failed to read email")?,
        };

        let password = match password {
            Some(password) => password,
            None => {
                let mut prompt = Password::new().with_prompt("Password");
                if confirm {
                    prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
                }
                prompt.interact().context("Failed to read password")?
            }
        };

        let email = email.trim().to_string();
        validate_credentials(&email, &password)?;
        Ok((email, password))
    }

    /// Create an account, storing the session if the account is usable right away
    pub async fn sign_up(client: &BackendClient, email: &str, password: &str) -> Result<SignUpOutcome> {
        let outcome = client
            .sign_up(email, password)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .context("Failed to sign up")?;

        if let SignUpOutcome::SignedIn(session) = &outcome {
            Self::store(session)?;
        }

        Ok(outcome)
    }

    /// Sign in and store the session
    pub async fn login(client: &BackendClient, email: &str, password: &str) -> Result<Session> {
        let session = client
            .sign_in(email, password)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .context("Failed to sign in")?;

        Self::store(&session)?;
        info!("Signed in as {}", email);
        Ok(session)
    }

    /// Sign out remotely and clear the local session
    ///
    /// The local session is cleared even if the server cannot be reached.
    pub async fn logout(settings: &BackendSettings) -> Result<bool> {
        let session = match Self::load() {
            Ok(session) => session,
            Err(_) => return Ok(false),
        };

        let client = BackendClient::new(&settings.url, &settings.anon_key)?
            .with_access_token(&session.access_token);
        if let Err(e) = client.sign_out().await {
            warn!("Remote sign out failed: {}", e);
        }

        Self::clear()?;
        Ok(true)
    }

    /// Client acting as the signed-in user, refreshing an expired session
    pub async fn client(settings: &BackendSettings) -> Result<(BackendClient, Session)> {
        let mut session = Self::load()
            .map_err(|_| anyhow::anyhow!("Not signed in. Run 'journal login' first."))?;

        let client = BackendClient::new(&settings.url, &settings.anon_key)?;

        if session.is_expired() {
            debug!("Session expired at {}, refreshing", session.expires_at);
            session = match client.refresh(&session.refresh_token).await {
                Ok(session) => session,
                Err(BackendError::Transport(e)) => {
                    return Err(e).context("Failed to reach the backend");
                }
                Err(e @ BackendError::InvalidHeader(_)) => return Err(e.into()),
                Err(e) => {
                    debug!("Refresh failed: {}", e);
                    Self::clear()?;
                    anyhow::bail!("Session expired. Run 'journal login' again.");
                }
            };
            Self::store(&session)?;
        }

        let client = client.with_access_token(&session.access_token);
        Ok((client, session))
    }

    /// Load the session from the keyring
    pub fn load() -> Result<Session> {
        let secret = Self::get_entry()?
            .get_password()
            .context("No session in keyring")?;

        serde_json::from_str(&secret).context("Failed to parse stored session")
    }

    /// Store the session in the keyring
    pub fn store(session: &Session) -> Result<()> {
        let secret = serde_json::to_string(session).context("Failed to serialize session")?;

        Self::get_entry()?
            .set_password(&secret)
            .context("Failed to store session in keyring")?;

        debug!("Session stored in keyring");
        Ok(())
    }

    /// Clear the stored session
    pub fn clear() -> Result<()> {
        let _ = Self::get_entry()?.delete_credential();
        info!("Session cleared from keyring");
        Ok(())
    }

    fn get_entry() -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, SESSION_KEY).context("Failed to access keyring")
    }
}

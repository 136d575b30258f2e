//! Identity provider seam.
//!
//! The state layer only needs authenticate / complete-new-password / silent
//! session retrieval / sign-out. [`CognitoIdentity`] implements that against a
//! Cognito user pool's JSON API. Refresh tokens stay in process memory unless
//! a token file is set with [`CognitoIdentity::with_token_file`].

use crate::config::IdentityConfig;
use crate::models::Session;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Actions are logged with `{:?}`; keep the password out of the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Handed back when the provider refuses to finish sign-in until the user picks
/// a new password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPasswordChallenge {
    pub username: String,
    pub session: String,
    pub required_attributes: Vec<String>,
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum IdentityError {
    #[error("a new password is required")]
    NewPasswordRequired(NewPasswordChallenge),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("no signed in user")]
    NoCurrentUser,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("identity provider is not configured: {0}")]
    NotConfigured(String),
}

impl IdentityError {
    /// Text fit for a toast. `NotAuthorized` carries the provider's own
    /// wording; everything else hides the details.
    pub fn user_message(&self) -> String {
        match self {
            IdentityError::NewPasswordRequired(_) => "A new password is required to sign in".into(),
            IdentityError::NotAuthorized(message) if !message.is_empty() => message.clone(),
            IdentityError::NotAuthorized(_) => "Incorrect username or password".into(),
            IdentityError::NoCurrentUser => "Please sign in".into(),
            IdentityError::Unavailable(_) => {
                "Sign in is unavailable right now, please try again later".into()
            }
            IdentityError::NotConfigured(_) => "Sign in is not configured".into(),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Prepares the provider client. Called before any other operation.
    async fn load(&self) -> Result<(), IdentityError>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, IdentityError>;

    async fn complete_new_password(
        &self,
        challenge: &NewPasswordChallenge,
        new_password: &str,
    ) -> Result<Session, IdentityError>;

    /// The user remembered by the provider, if any.
    async fn current_user(&self) -> Option<String>;

    /// Silent session retrieval for the current user, refreshing if needed.
    async fn current_session(&self) -> Result<Session, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;
}

const NEW_PASSWORD_REQUIRED: &str = "NEW_PASSWORD_REQUIRED";

#[derive(Debug, Clone)]
struct CognitoTokens {
    username: String,
    id_token: String,
    access_token: String,
    refresh_token: Option<String>,
    expiration: i64,
}

impl CognitoTokens {
    /// Tokens known only from the token file: expired, so the first
    /// `current_session` refreshes them.
    fn restored(stored: StoredTokens) -> Self {
        Self {
            username: stored.username,
            id_token: String::new(),
            access_token: String::new(),
            refresh_token: Some(stored.refresh_token),
            expiration: 0,
        }
    }

    fn session(&self) -> Session {
        Session {
            username: self.username.clone(),
            token: self.id_token.clone(),
            expiration: self.expiration,
        }
    }
}

/// What survives a restart: enough to refresh, never the short-lived tokens.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredTokens {
    username: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'a str,
    client_id: &'a str,
    auth_parameters: HashMap<&'a str, &'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RespondToAuthChallengeRequest<'a> {
    challenge_name: &'a str,
    client_id: &'a str,
    session: &'a str,
    challenge_responses: HashMap<&'a str, &'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GlobalSignOutRequest<'a> {
    access_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
    session: Option<String>,
    #[serde(default)]
    challenge_parameters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: String,
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

impl ErrorResponse {
    fn into_identity_error(self) -> IdentityError {
        let kind = self.kind.rsplit('#').next().unwrap_or_default();
        match kind {
            "NotAuthorizedException"
            | "UserNotFoundException"
            | "UserNotConfirmedException"
            | "PasswordResetRequiredException"
            | "InvalidPasswordException" => IdentityError::NotAuthorized(self.message),
            _ => IdentityError::Unavailable(format!("{kind}: {}", self.message)),
        }
    }
}

pub struct CognitoIdentity {
    endpoint: String,
    client_id: String,
    client: OnceCell<reqwest::Client>,
    tokens: Mutex<Option<CognitoTokens>>,
    token_path: Option<PathBuf>,
}

impl CognitoIdentity {
    pub fn new(config: &IdentityConfig) -> Self {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com/", config.region));
        Self {
            endpoint,
            client_id: config.client_id.clone(),
            client: OnceCell::new(),
            tokens: Mutex::new(None),
            token_path: None,
        }
    }

    /// Keeps the username and refresh token in `path`, so the user stays signed
    /// in across restarts. Tokens already in the file are picked up here.
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<StoredTokens>(&content).ok())
            .map(CognitoTokens::restored);
        if let Some(tokens) = &restored {
            debug!(username = %tokens.username, path = %path.display(), "restored identity tokens");
        }
        self.tokens = Mutex::new(restored);
        self.token_path = Some(path);
        self
    }

    fn stored_tokens(&self) -> Option<CognitoTokens> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_tokens(&self, tokens: Option<CognitoTokens>) {
        self.persist_tokens(tokens.as_ref());
        *self.tokens.lock().unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    fn persist_tokens(&self, tokens: Option<&CognitoTokens>) {
        let Some(path) = &self.token_path else {
            return;
        };
        let stored = tokens.and_then(|tokens| {
            tokens.refresh_token.clone().map(|refresh_token| StoredTokens {
                username: tokens.username.clone(),
                refresh_token,
            })
        });
        let result = match stored {
            Some(stored) => serde_json::to_string(&stored)
                .map_err(std::io::Error::from)
                .and_then(|content| std::fs::write(path, content)),
            None => match std::fs::remove_file(path) {
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(error) = result {
            warn!(path = %path.display(), %error, "could not persist identity tokens");
        }
    }

    async fn call<B, R>(&self, target: &str, body: &B) -> Result<R, IdentityError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        self.load().await?;
        let client = self
            .client
            .get()
            .ok_or_else(|| IdentityError::Unavailable("client not loaded".to_string()))?;
        let body = serde_json::to_vec(body).map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        debug!(target, "identity provider call");
        let response = client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("AWSCognitoIdentityProviderService.{target}"))
            .header(CONTENT_TYPE, "application/x-amz-json-1.1")
            .body(body)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await.unwrap_or_default();
            return Err(error.into_identity_error());
        }
        response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))
    }

    /// Turns an auth answer into stored tokens, or the challenge it carries.
    fn accept(
        &self,
        username: &str,
        response: AuthResponse,
        previous_refresh_token: Option<String>,
    ) -> Result<Session, IdentityError> {
        let tokens = tokens_from_response(
            username,
            response,
            previous_refresh_token,
            chrono::Utc::now().timestamp(),
        )?;
        let session = tokens.session();
        self.store_tokens(Some(tokens));
        Ok(session)
    }

    async fn refresh(&self, tokens: CognitoTokens) -> Result<Session, IdentityError> {
        let refresh_token = tokens.refresh_token.clone().ok_or(IdentityError::NoCurrentUser)?;
        let request = InitiateAuthRequest {
            auth_flow: "REFRESH_TOKEN_AUTH",
            client_id: &self.client_id,
            auth_parameters: HashMap::from([("REFRESH_TOKEN", refresh_token.as_str())]),
        };
        let response: AuthResponse = self.call("InitiateAuth", &request).await?;
        self.accept(&tokens.username, response, Some(refresh_token))
    }
}

fn tokens_from_response(
    username: &str,
    response: AuthResponse,
    previous_refresh_token: Option<String>,
    now: i64,
) -> Result<CognitoTokens, IdentityError> {
    if let Some(result) = response.authentication_result {
        return Ok(CognitoTokens {
            username: username.to_string(),
            id_token: result.id_token,
            access_token: result.access_token,
            refresh_token: result.refresh_token.or(previous_refresh_token),
            expiration: now + result.expires_in,
        });
    }
    match response.challenge_name.as_deref() {
        Some(NEW_PASSWORD_REQUIRED) => {
            let required_attributes = response
                .challenge_parameters
                .get("requiredAttributes")
                .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
                .unwrap_or_default();
            Err(IdentityError::NewPasswordRequired(NewPasswordChallenge {
                username: username.to_string(),
                session: response.session.unwrap_or_default(),
                required_attributes,
            }))
        }
        Some(other) => Err(IdentityError::Unavailable(format!(
            "unsupported challenge {other}"
        ))),
        None => Err(IdentityError::Unavailable(
            "empty authentication response".to_string(),
        )),
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn load(&self) -> Result<(), IdentityError> {
        self.client
            .get_or_try_init(|| async {
                if self.client_id.is_empty() {
                    return Err(IdentityError::NotConfigured("client_id is empty".to_string()));
                }
                info!(endpoint = %self.endpoint, "identity provider loaded");
                Ok(reqwest::Client::new())
            })
            .await
            .map(|_| ())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, IdentityError> {
        let request = InitiateAuthRequest {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: &self.client_id,
            auth_parameters: HashMap::from([
                ("USERNAME", credentials.username.as_str()),
                ("PASSWORD", credentials.password.as_str()),
            ]),
        };
        let response: AuthResponse = self.call("InitiateAuth", &request).await?;
        self.accept(&credentials.username, response, None)
    }

    async fn complete_new_password(
        &self,
        challenge: &NewPasswordChallenge,
        new_password: &str,
    ) -> Result<Session, IdentityError> {
        let request = RespondToAuthChallengeRequest {
            challenge_name: NEW_PASSWORD_REQUIRED,
            client_id: &self.client_id,
            session: &challenge.session,
            challenge_responses: HashMap::from([
                ("USERNAME", challenge.username.as_str()),
                ("NEW_PASSWORD", new_password),
            ]),
        };
        let response: AuthResponse = self.call("RespondToAuthChallenge", &request).await?;
        self.accept(&challenge.username, response, None)
    }

    async fn current_user(&self) -> Option<String> {
        self.stored_tokens().map(|tokens| tokens.username)
    }

    async fn current_session(&self) -> Result<Session, IdentityError> {
        let tokens = self.stored_tokens().ok_or(IdentityError::NoCurrentUser)?;
        if tokens.expiration > chrono::Utc::now().timestamp() {
            return Ok(tokens.session());
        }
        self.refresh(tokens).await
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let Some(tokens) = self.stored_tokens() else {
            return Ok(());
        };
        self.store_tokens(None);
        if tokens.access_token.is_empty() {
            return Ok(());
        }
        let request = GlobalSignOutRequest {
            access_token: &tokens.access_token,
        };
        if let Err(error) = self.call::<_, serde_json::Value>("GlobalSignOut", &request).await {
            warn!(%error, "remote sign out failed");
            return Err(error);
        }
        Ok(())
    }
}

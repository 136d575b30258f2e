use crate::config::ConfigError;
use crate::identity::{IdentityError, NewPasswordChallenge};
use crate::store::StoreError;
use thiserror::Error;

/// A network failure or a non-2xx answer from the articles API.
///
/// When the server did answer, `status` and the raw response `body` are kept so
/// callers can inspect what came back.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("{message}")]
pub struct FetchError {
    pub url: String,
    pub status: Option<u16>,
    pub body: Option<String>,
    pub message: String,
}

impl FetchError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        let url = url.into();
        let message = format!("request to {url} failed: {}", message.into());
        Self {
            url,
            status: None,
            body: None,
            message,
        }
    }

    pub fn status(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            message: format!("{url} responded with status {status}"),
            url,
            status: Some(status),
            body: Some(body.into()),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        let url = url.into();
        let message = format!("could not decode response from {url}: {}", message.into());
        Self {
            url,
            status: None,
            body: None,
            message,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// Authentication failed, the session expired or the user has to sign in.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("{message}")]
pub struct AuthError {
    message: String,
    #[source]
    cause: Option<IdentityError>,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(message: impl Into<String>, cause: IdentityError) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause),
        }
    }

    pub fn please_sign_in() -> Self {
        Self::new("Please sign in")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&IdentityError> {
        self.cause.as_ref()
    }
}

/// Every failure a saga can run into.
///
/// Sagas branch on the variant, never on the message text.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum GazetteError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A load for the same resource is already in flight.
    #[error("resource is already loading")]
    AlreadyLoading,

    /// Control flow only: converted into the new password sub-flow and never shown.
    #[error("a new password is required")]
    NewPasswordRequired(NewPasswordChallenge),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GazetteError {
    pub fn is_fetch(&self) -> bool {
        matches!(self, GazetteError::Fetch(_))
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GazetteError::Auth(_))
    }

    pub fn is_already_loading(&self) -> bool {
        matches!(self, GazetteError::AlreadyLoading)
    }

    pub fn is_new_password_required(&self) -> bool {
        matches!(self, GazetteError::NewPasswordRequired(_))
    }
}

impl From<IdentityError> for GazetteError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::NewPasswordRequired(challenge) => {
                GazetteError::NewPasswordRequired(challenge)
            }
            other => GazetteError::Auth(AuthError::with_cause(other.user_message(), other)),
        }
    }
}

pub type Result<T, E = GazetteError> = std::result::Result<T, E>;

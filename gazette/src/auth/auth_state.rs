use crate::identity::Credentials;
use crate::models::Session;
use crate::Action;

const MIN_PASSWORD_LENGTH: usize = 16;

/// Validation flags shown while the user picks a new password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewPasswordValidation {
    pub length_ok: bool,
    pub characters_ok: bool,
    pub matching_ok: bool,
}

impl NewPasswordValidation {
    pub fn is_valid(&self) -> bool {
        self.length_ok && self.characters_ok && self.matching_ok
    }
}

fn has_mixed_case(value: &str) -> bool {
    value.chars().any(char::is_uppercase) && value.chars().any(char::is_lowercase)
}

/// Length and character rules pass when either field satisfies them; a valid
/// submission also needs both fields equal, so at submit time both comply.
pub fn validate_new_password(password: &str, confirmation: &str) -> NewPasswordValidation {
    NewPasswordValidation {
        length_ok: password.chars().count() > MIN_PASSWORD_LENGTH
            || confirmation.chars().count() > MIN_PASSWORD_LENGTH,
        characters_ok: has_mixed_case(password) || has_mixed_case(confirmation),
        matching_ok: !confirmation.is_empty() && password == confirmation,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPasswordForm {
    pub validation: NewPasswordValidation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    SignIn(Credentials),
    /// Restore a previous session at startup, if there was one.
    LoadInfo,
    StartLoading,
    Receive(Session),
    /// Clears the session; dispatched by the shared auth error handler.
    ReceiveAuthError,
    /// Startup restore found nothing to restore.
    SessionUnavailable,
    SignOut,
    NewPasswordRequired,
    ValidateNewPassword {
        password: String,
        confirmation: String,
    },
    NewPasswordValidated(NewPasswordValidation),
    SubmitNewPassword {
        password: String,
        confirmation: String,
    },
    CancelNewPassword,
}

impl Action for AuthAction {
    fn kind(&self) -> &'static str {
        match self {
            AuthAction::SignIn(_) => "auth/sign-in",
            AuthAction::LoadInfo => "auth/load-info",
            AuthAction::StartLoading => "auth/start-loading",
            AuthAction::Receive(_) => "auth/receive",
            AuthAction::ReceiveAuthError => "auth/receive-auth-error",
            AuthAction::SessionUnavailable => "auth/session-unavailable",
            AuthAction::SignOut => "auth/sign-out",
            AuthAction::NewPasswordRequired => "auth/new-password-required",
            AuthAction::ValidateNewPassword { .. } => "auth/validate-new-password",
            AuthAction::NewPasswordValidated(_) => "auth/new-password-validated",
            AuthAction::SubmitNewPassword { .. } => "auth/submit-new-password",
            AuthAction::CancelNewPassword => "auth/cancel-new-password",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub username: String,
    pub token: String,
    /// Seconds since the Unix epoch.
    pub expiration: i64,
    pub is_loading: bool,
    pub new_password: Option<NewPasswordForm>,
}

impl AuthState {
    /// A token counts only while it has not expired.
    pub fn is_valid(&self, now: i64) -> bool {
        !self.token.is_empty() && self.expiration > now
    }

    pub fn is_signed_in(&self) -> bool {
        !self.token.is_empty()
    }

    pub fn reduce(self, action: &AuthAction) -> Self {
        match action {
            AuthAction::SignIn(_)
            | AuthAction::LoadInfo
            | AuthAction::ValidateNewPassword { .. }
            | AuthAction::SubmitNewPassword { .. } => self,
            AuthAction::StartLoading => Self {
                is_loading: true,
                ..self
            },
            AuthAction::Receive(session) => Self {
                username: session.username.clone(),
                token: session.token.clone(),
                expiration: session.expiration,
                is_loading: false,
                new_password: None,
            },
            AuthAction::ReceiveAuthError | AuthAction::SessionUnavailable | AuthAction::SignOut => {
                Self::default()
            }
            AuthAction::NewPasswordRequired => Self {
                is_loading: false,
                new_password: Some(NewPasswordForm::default()),
                ..self
            },
            AuthAction::NewPasswordValidated(validation) => Self {
                new_password: self.new_password.map(|_| NewPasswordForm {
                    validation: *validation,
                }),
                ..self
            },
            AuthAction::CancelNewPassword => Self {
                new_password: None,
                ..self
            },
        }
    }
}

/// The current token if it is still valid at `now`.
pub fn select_token(state: &AuthState, now: i64) -> Option<String> {
    state.is_valid(now).then(|| state.token.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expiration: i64) -> Session {
        Session {
            username: "ada".into(),
            token: "token".into(),
            expiration,
        }
    }

    #[test]
    fn test_validation_of_compliant_password() {
        let validation = validate_new_password("Abcdefghijklmnop1", "Abcdefghijklmnop1");
        assert!(validation.length_ok);
        assert!(validation.characters_ok);
        assert!(validation.matching_ok);
        assert!(validation.is_valid());
    }

    #[test]
    fn test_empty_confirmation_never_matches() {
        assert!(!validate_new_password("Abcdefghijklmnop1", "").matching_ok);
        assert!(!validate_new_password("", "").matching_ok);
    }

    #[test]
    fn test_rules_pass_when_either_field_complies() {
        let validation = validate_new_password("Abcdefghijklmnop1", "short");
        assert!(validation.length_ok);
        assert!(validation.characters_ok);
        assert!(!validation.matching_ok);
        assert!(!validation.is_valid());

        let validation = validate_new_password("abcdefghijklmnopq", "abcdefghijklmnopq");
        assert!(validation.length_ok);
        assert!(!validation.characters_ok);

        let validation = validate_new_password("Abcdefghijklmnop", "Abcdefghijklmnop");
        assert!(!validation.length_ok);
    }

    #[test]
    fn test_receive_and_clear() {
        let state = AuthState::default()
            .reduce(&AuthAction::StartLoading)
            .reduce(&AuthAction::Receive(session(100)));
        assert!(!state.is_loading);
        assert_eq!(state.username, "ada");
        assert!(state.is_valid(99));
        assert!(!state.is_valid(100));
        assert_eq!(select_token(&state, 50).as_deref(), Some("token"));
        assert_eq!(select_token(&state, 150), None);

        assert_eq!(state.clone().reduce(&AuthAction::SignOut), AuthState::default());
        assert_eq!(state.reduce(&AuthAction::ReceiveAuthError), AuthState::default());
    }

    #[test]
    fn test_new_password_form() {
        let state = AuthState::default()
            .reduce(&AuthAction::StartLoading)
            .reduce(&AuthAction::NewPasswordRequired);
        assert!(!state.is_loading);
        assert!(state.new_password.is_some());

        let validation = validate_new_password("Abcdefghijklmnop1", "Abcdefghijklmnop1");
        let state = state.reduce(&AuthAction::NewPasswordValidated(validation));
        assert_eq!(state.new_password.as_ref().unwrap().validation, validation);

        let state = state.reduce(&AuthAction::Receive(session(100)));
        assert!(state.new_password.is_none());
    }

    #[test]
    fn test_validation_ignored_outside_sub_flow() {
        let state = AuthState::default().reduce(&AuthAction::NewPasswordValidated(
            NewPasswordValidation::default(),
        ));
        assert!(state.new_password.is_none());
    }
}

use super::{select_token, validate_new_password, AuthAction};
use crate::app::{AppAction, SagaContext};
use crate::identity::{Credentials, IdentityError};
use crate::models::Session;
use crate::toasts::spawn_info_toast;
use crate::{ActionStream, AuthError, GazetteError};
use tracing::{debug, info, instrument, warn};

enum AuthRequest {
    SignIn(Credentials),
    Restore,
}

enum NewPasswordStep {
    Validate { password: String, confirmation: String },
    Submit { password: String, confirmation: String },
    Cancel,
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Signs in (or restores the previous session), then waits for the session to end.
///
/// Runs forever. An authentication failure goes through [`handle_auth_error`]
/// and the loop starts over; anything else ends the saga.
#[instrument(name = "auth", skip_all)]
pub async fn auth_flow_saga(
    ctx: SagaContext,
    mut actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    loop {
        let request = actions
            .take_map(|action| match action {
                AppAction::Auth(AuthAction::SignIn(credentials)) => {
                    Some(AuthRequest::SignIn(credentials))
                }
                AppAction::Auth(AuthAction::LoadInfo) => Some(AuthRequest::Restore),
                _ => None,
            })
            .await?;

        match start_session(&ctx, &mut actions, request).await {
            Ok(Some(session)) => {
                info!(username = %session.username, "signed in");
                ctx.session().set_has_session(true);
            }
            Ok(None) => continue,
            Err(GazetteError::Auth(error)) => {
                handle_auth_error(&ctx, &error).await?;
                continue;
            }
            Err(error) => return Err(error),
        }

        let signed_out = actions
            .take_map(|action| match action {
                AppAction::Auth(AuthAction::SignOut) => Some(true),
                AppAction::Auth(AuthAction::ReceiveAuthError) => Some(false),
                _ => None,
            })
            .await?;
        if signed_out {
            if let Err(error) = ctx.identity().sign_out().await {
                warn!(%error, "identity provider sign out failed");
            }
            ctx.session().set_has_session(false);
            info!("signed out");
        }
    }
}

async fn start_session(
    ctx: &SagaContext,
    actions: &mut ActionStream<AppAction>,
    request: AuthRequest,
) -> Result<Option<Session>, GazetteError> {
    match request {
        AuthRequest::SignIn(credentials) => {
            ctx.identity().load().await?;
            put_auth_data(ctx, actions, &credentials).await.map(Some)
        }
        AuthRequest::Restore => {
            if !ctx.session().has_session() {
                debug!("no previous session to restore");
                ctx.put(AuthAction::SessionUnavailable).await?;
                return Ok(None);
            }
            ctx.put(AuthAction::StartLoading).await?;
            let session = refresh_session(ctx).await?;
            ctx.put(AuthAction::Receive(session.clone())).await?;
            Ok(Some(session))
        }
    }
}

/// Interactive sign-in. When the provider insists on a new password, runs the
/// new password sub-flow and completes sign-in with the chosen password.
pub async fn put_auth_data(
    ctx: &SagaContext,
    actions: &mut ActionStream<AppAction>,
    credentials: &Credentials,
) -> Result<Session, GazetteError> {
    ctx.put(AuthAction::StartLoading).await?;
    let mut result = ctx.identity().authenticate(credentials).await;
    loop {
        match result {
            Ok(session) => {
                ctx.put(AuthAction::Receive(session.clone())).await?;
                return Ok(session);
            }
            Err(IdentityError::NewPasswordRequired(challenge)) => {
                info!(username = %challenge.username, "new password required");
                let password = request_new_password(ctx, actions).await?;
                ctx.put(AuthAction::StartLoading).await?;
                result = ctx
                    .identity()
                    .complete_new_password(&challenge, &password)
                    .await;
            }
            Err(error) => return Err(error.into()),
        }
    }
}

/// Blocks until the user submits a valid new password or cancels.
pub async fn request_new_password(
    ctx: &SagaContext,
    actions: &mut ActionStream<AppAction>,
) -> Result<String, GazetteError> {
    ctx.put(AuthAction::NewPasswordRequired).await?;
    loop {
        let step = actions
            .take_map(|action| match action {
                AppAction::Auth(AuthAction::ValidateNewPassword {
                    password,
                    confirmation,
                }) => Some(NewPasswordStep::Validate {
                    password,
                    confirmation,
                }),
                AppAction::Auth(AuthAction::SubmitNewPassword {
                    password,
                    confirmation,
                }) => Some(NewPasswordStep::Submit {
                    password,
                    confirmation,
                }),
                AppAction::Auth(AuthAction::CancelNewPassword) => Some(NewPasswordStep::Cancel),
                _ => None,
            })
            .await?;
        match step {
            NewPasswordStep::Validate {
                password,
                confirmation,
            } => {
                let validation = validate_new_password(&password, &confirmation);
                ctx.put(AuthAction::NewPasswordValidated(validation)).await?;
            }
            NewPasswordStep::Submit {
                password,
                confirmation,
            } => {
                let validation = validate_new_password(&password, &confirmation);
                ctx.put(AuthAction::NewPasswordValidated(validation)).await?;
                if validation.is_valid() {
                    return Ok(password);
                }
                debug!(?validation, "new password rejected");
            }
            NewPasswordStep::Cancel => {
                return Err(AuthError::new("A new password is required to sign in").into());
            }
        }
    }
}

/// Returns a token that is valid now, refreshing the session first if needed.
///
/// Concurrent callers share one refresh: whoever waits on the gate re-checks
/// the token before asking the identity provider again.
pub async fn refresh_auth(ctx: &SagaContext) -> Result<String, GazetteError> {
    if let Some(token) = ctx.select(|state| select_token(&state.auth, now())) {
        return Ok(token);
    }
    let _gate = ctx.refresh_gate().lock().await;
    if let Some(token) = ctx.select(|state| select_token(&state.auth, now())) {
        debug!("token refreshed by another task");
        return Ok(token);
    }
    let session = refresh_session(ctx).await?;
    ctx.put(AuthAction::Receive(session.clone())).await?;
    info!(username = %session.username, "session refreshed");
    Ok(session.token)
}

/// Silent session retrieval. Only attempted when the user signed in before.
pub async fn refresh_session(ctx: &SagaContext) -> Result<Session, GazetteError> {
    if !ctx.session().has_session() {
        return Err(AuthError::please_sign_in().into());
    }
    let identity = ctx.identity();
    identity.load().await?;
    let Some(username) = identity.current_user().await else {
        return Err(AuthError::please_sign_in().into());
    };
    debug!(%username, "retrieving current session");
    identity
        .current_session()
        .await
        .map_err(|error| -> GazetteError {
            match error {
                IdentityError::NewPasswordRequired(_) => {
                    AuthError::with_cause(AuthError::please_sign_in().message(), error).into()
                }
                other => other.into(),
            }
        })
}

/// The one place authentication failures end up: tell the user, clear the
/// session and forget that there was one.
pub async fn handle_auth_error(ctx: &SagaContext, error: &AuthError) -> Result<(), GazetteError> {
    warn!(%error, cause = ?error.cause(), "authentication failed");
    spawn_info_toast(ctx, error.message());
    ctx.put(AuthAction::ReceiveAuthError).await?;
    ctx.session().set_has_session(false);
    Ok(())
}

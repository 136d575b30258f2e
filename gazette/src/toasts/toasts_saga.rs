use super::{Toast, ToastButton, ToastId, ToastsAction};
use crate::app::{AppAction, AppState, SagaContext};
use crate::{GazetteError, StateStore};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Closes the toast if the waiting task goes away before the toast was closed.
struct CloseOnDrop {
    store: StateStore<AppState>,
    id: ToastId,
    armed: bool,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!(id = self.id, "toast released by cancelled task");
            let _ = self.store.dispatch(
                ToastsAction::Close {
                    id: self.id,
                    button_id: None,
                }
                .into(),
            );
        }
    }
}

fn spawn_timer(store: StateStore<AppState>, id: ToastId, duration: Duration) -> CancellationToken {
    let token = CancellationToken::new();
    let timer_token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = timer_token.cancelled() => {}
            _ = tokio::time::sleep(duration) => {
                debug!(id, "toast timed out");
                let _ = store.dispatch(ToastsAction::Close { id, button_id: None }.into());
            }
        }
    });
    token
}

async fn run_toast(
    ctx: &SagaContext,
    text: String,
    buttons: Vec<ToastButton>,
    timeout: Option<Duration>,
) -> Result<Option<String>, GazetteError> {
    let id = ctx.next_toast_id();
    let mut actions = ctx.actions();
    let mut release = CloseOnDrop {
        store: ctx.store().clone(),
        id,
        armed: true,
    };
    ctx.put(ToastsAction::Create(Toast { id, text, buttons }))
        .await?;
    let _timer = timeout.map(|duration| spawn_timer(ctx.store().clone(), id, duration).drop_guard());

    let button_id = actions
        .take_map(|action| match action {
            AppAction::Toasts(ToastsAction::Close {
                id: closed,
                button_id,
            }) if closed == id => Some(button_id),
            _ => None,
        })
        .await?;
    release.armed = false;
    Ok(button_id)
}

/// Shows a toast and waits until it is closed.
///
/// Resolves with the id of the button that closed it, if any.
pub async fn create_toast(
    ctx: &SagaContext,
    text: impl Into<String>,
    buttons: Vec<ToastButton>,
) -> Result<Option<String>, GazetteError> {
    run_toast(ctx, text.into(), buttons, None).await
}

/// Like [`create_toast`], but closes itself with no button after `duration`.
/// The timer is cancelled as soon as the toast closes some other way.
pub async fn create_timed_toast(
    ctx: &SagaContext,
    text: impl Into<String>,
    buttons: Vec<ToastButton>,
    duration: Duration,
) -> Result<Option<String>, GazetteError> {
    run_toast(ctx, text.into(), buttons, Some(duration)).await
}

/// A toast with a single "Close" button that expires after the configured duration.
pub async fn create_info_toast(
    ctx: &SagaContext,
    text: impl Into<String>,
) -> Result<Option<String>, GazetteError> {
    let duration = ctx.config().toasts.duration();
    create_timed_toast(ctx, text, vec![ToastButton::close()], duration).await
}

/// Fire-and-forget [`create_info_toast`].
pub fn spawn_info_toast(ctx: &SagaContext, text: impl Into<String>) {
    let toast_ctx = ctx.clone();
    let text = text.into();
    ctx.fork("toasts/info", async move {
        create_info_toast(&toast_ctx, text).await?;
        Ok(())
    });
}

/// Fire-and-forget short notice without buttons, such as "Submitting...".
pub fn spawn_transient_toast(ctx: &SagaContext, text: impl Into<String>) {
    let toast_ctx = ctx.clone();
    let text = text.into();
    ctx.fork("toasts/transient", async move {
        let duration = toast_ctx.config().toasts.transient_duration();
        create_timed_toast(&toast_ctx, text, Vec::new(), duration).await?;
        Ok(())
    });
}

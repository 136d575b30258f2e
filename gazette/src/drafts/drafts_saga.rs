use super::{select_draft, DraftsAction, NEW_ARTICLE_ID};
use crate::app::{take_every, AppAction, SagaContext};
use crate::articles::{display_title, load_full_article, ArticlesAction};
use crate::auth::{handle_auth_error, refresh_auth};
use crate::models::Article;
use crate::navigation::NavigationAction;
use crate::toasts::{spawn_info_toast, spawn_transient_toast};
use crate::{ActionStream, GazetteError};
use tracing::{debug, info, instrument, warn};

#[instrument(name = "drafts_load", skip_all)]
pub async fn load_drafts_saga(
    ctx: SagaContext,
    actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    take_every(
        &ctx,
        actions,
        "drafts/load",
        |action| match action {
            AppAction::Drafts(DraftsAction::Load {
                publication_id,
                article_id,
            }) => Some((publication_id, article_id)),
            _ => None,
        },
        |(publication_id, article_id)| {
            let ctx = ctx.clone();
            async move { load_draft(&ctx, &publication_id, &article_id).await }
        },
    )
    .await
}

/// Makes sure a draft exists for `article_id`: reuses the one in progress,
/// else seeds it from the article, fetching the full article when needed.
/// Navigates back when the article cannot be fetched.
pub async fn load_draft(
    ctx: &SagaContext,
    publication_id: &str,
    article_id: &str,
) -> Result<(), GazetteError> {
    if ctx.select(|state| state.drafts.drafts.contains_key(article_id)) {
        debug!(article_id, "reusing draft in progress");
        return Ok(());
    }
    if article_id == NEW_ARTICLE_ID {
        return ctx
            .put(DraftsAction::Create {
                article_id: NEW_ARTICLE_ID.to_string(),
                source: None,
            })
            .await;
    }

    let cached = ctx.select(|state| {
        state
            .articles
            .get(article_id)
            .filter(|article| article.is_full())
            .cloned()
    });
    let source = match cached {
        Some(article) => article,
        None => match load_full_article(ctx, publication_id, article_id).await {
            Ok(article) => Article::from(article),
            Err(GazetteError::AlreadyLoading) => {
                debug!(article_id, "article already loading");
                return Ok(());
            }
            Err(GazetteError::Fetch(error)) => {
                warn!(%error, article_id, "could not load article for editing");
                return ctx.put(NavigationAction::Back).await;
            }
            Err(error) => return Err(error),
        },
    };
    ctx.put(DraftsAction::Create {
        article_id: article_id.to_string(),
        source: Some(source),
    })
    .await
}

#[instrument(name = "drafts_submit", skip_all)]
pub async fn submit_drafts_saga(
    ctx: SagaContext,
    actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    take_every(
        &ctx,
        actions,
        "drafts/submit",
        |action| match action {
            AppAction::Drafts(DraftsAction::Submit {
                publication_id,
                article_id,
            }) => Some((publication_id, article_id)),
            _ => None,
        },
        |(publication_id, article_id)| {
            let ctx = ctx.clone();
            async move { submit_draft(&ctx, &publication_id, &article_id).await }
        },
    )
    .await
}

/// Creates the article when `article_id` is empty, else saves the edit.
///
/// On success the draft is dropped and the view goes back. A failed request
/// keeps the draft so the user can try again.
pub async fn submit_draft(
    ctx: &SagaContext,
    publication_id: &str,
    article_id: &str,
) -> Result<(), GazetteError> {
    let Some(_submitting) = ctx.claim("drafts/submit", article_id) else {
        debug!(article_id, "draft is already being submitted");
        return Ok(());
    };
    let Some(draft) = ctx.select(|state| select_draft(&state.drafts, article_id)) else {
        warn!(article_id, "submit requested without a draft");
        return Ok(());
    };
    ctx.put(DraftsAction::StartSubmit {
        article_id: article_id.to_string(),
    })
    .await?;

    let token = match refresh_auth(ctx).await {
        Ok(token) => token,
        Err(GazetteError::Auth(error)) => {
            ctx.put(DraftsAction::ReceiveSubmitError {
                article_id: article_id.to_string(),
            })
            .await?;
            return handle_auth_error(ctx, &error).await;
        }
        Err(error) => return Err(error),
    };

    spawn_transient_toast(ctx, "Submitting...");
    let is_new = article_id == NEW_ARTICLE_ID;
    let result = if is_new {
        ctx.api().create_article(publication_id, &draft, &token).await
    } else {
        ctx.api()
            .update_article(publication_id, article_id, &draft, &token)
            .await
    };

    match result {
        Ok(article) => {
            info!(article_id = %article.summary.id, is_new, "article saved");
            ctx.put(DraftsAction::ReceiveSubmitSuccess {
                article_id: article_id.to_string(),
                article: article.clone(),
                is_new,
            })
            .await?;
            ctx.put(ArticlesAction::ReceiveArticle(article)).await?;
            ctx.put(NavigationAction::Back).await
        }
        Err(error) => {
            warn!(%error, article_id, "could not save article");
            ctx.put(DraftsAction::ReceiveSubmitError {
                article_id: article_id.to_string(),
            })
            .await?;
            spawn_info_toast(
                ctx,
                format!("Could not save \"{}\"", display_title(&draft.title)),
            );
            Ok(())
        }
    }
}

/// The reducer drops the draft; this only leaves the editor.
#[instrument(name = "drafts_discard", skip_all)]
pub async fn discard_drafts_saga(
    ctx: SagaContext,
    mut actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    loop {
        actions
            .take(|action| matches!(action, AppAction::Drafts(DraftsAction::Discard { .. })))
            .await?;
        ctx.put(NavigationAction::Back).await?;
    }
}

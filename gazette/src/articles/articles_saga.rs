use super::{select_is_loading_publication, select_page_cursor};
use super::{ArticlesAction, PageCursor};
use crate::app::{take_every, AppAction, SagaContext};
use crate::auth::{handle_auth_error, refresh_auth};
use crate::models::FullArticle;
use crate::toasts::{create_timed_toast, spawn_info_toast, ToastButton, UNDO_BUTTON};
use crate::{ActionStream, GazetteError};
use tracing::{debug, info, instrument, warn};

const TITLE_LIMIT: usize = 20;
const TITLE_HEAD: usize = 15;
const TITLE_TAIL: usize = 5;

/// Shortens a title for toast text: long titles keep their first 15 and last
/// 5 characters.
pub fn display_title(title: &str) -> String {
    if title.is_empty() {
        return "Untitled".to_string();
    }
    let chars: Vec<char> = title.chars().collect();
    if chars.len() <= TITLE_LIMIT {
        return title.to_string();
    }
    let head: String = chars[..TITLE_HEAD].iter().collect();
    let tail: String = chars[chars.len() - TITLE_TAIL..].iter().collect();
    format!("{}...{}", head.trim(), tail.trim())
}

/// How an optimistic delete ended. The article is removed locally while the
/// delete is pending, i.e. from the removal until the toast resolves and the
/// remote call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing was removed: no token, or the article is not loaded.
    NotStarted,
    /// The remote delete succeeded.
    Confirmed,
    /// Undone by the user, or the remote delete failed; the article is back.
    RolledBack,
    /// Authentication failed before the remote call. The article stays removed
    /// locally but still exists remotely.
    Abandoned,
}

/// Turns a recoverable load failure into a toast; anything else ends the saga.
async fn report_load_error(
    ctx: &SagaContext,
    error: GazetteError,
    message: &str,
) -> Result<(), GazetteError> {
    match error {
        GazetteError::AlreadyLoading => {
            debug!("load already in flight");
            Ok(())
        }
        GazetteError::Fetch(error) => {
            warn!(%error, "{message}");
            spawn_info_toast(ctx, message);
            Ok(())
        }
        other => Err(other),
    }
}

/// Reloads a publication's first page on every refresh request.
///
/// The list is cleared before the fetch, so a failed fetch leaves it empty.
#[instrument(name = "articles_refresh", skip_all)]
pub async fn refresh_articles_saga(
    ctx: SagaContext,
    mut actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    loop {
        let publication_id = actions
            .take_map(|action| match action {
                AppAction::Articles(ArticlesAction::Refresh { publication_id }) => {
                    Some(publication_id)
                }
                _ => None,
            })
            .await?;
        if let Err(error) = refresh_publication(&ctx, &publication_id).await {
            report_load_error(&ctx, error, "Could not load articles").await?;
        }
    }
}

pub async fn refresh_publication(
    ctx: &SagaContext,
    publication_id: &str,
) -> Result<(), GazetteError> {
    if ctx.select(|state| select_is_loading_publication(&state.articles, publication_id)) {
        return Err(GazetteError::AlreadyLoading);
    }
    ctx.put(ArticlesAction::ClearPublication {
        publication_id: publication_id.to_string(),
    })
    .await?;
    fetch_page(ctx, publication_id, "").await
}

#[instrument(name = "articles_next_page", skip_all)]
pub async fn load_next_page_saga(
    ctx: SagaContext,
    mut actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    loop {
        let publication_id = actions
            .take_map(|action| match action {
                AppAction::Articles(ArticlesAction::LoadNextPage { publication_id }) => {
                    Some(publication_id)
                }
                _ => None,
            })
            .await?;
        if let Err(error) = load_next_page(&ctx, &publication_id).await {
            report_load_error(&ctx, error, "Could not load more articles").await?;
        }
    }
}

pub async fn load_next_page(ctx: &SagaContext, publication_id: &str) -> Result<(), GazetteError> {
    let (cursor, is_loading) = ctx.select(|state| {
        (
            select_page_cursor(&state.articles, publication_id),
            select_is_loading_publication(&state.articles, publication_id),
        )
    });
    if is_loading {
        return Err(GazetteError::AlreadyLoading);
    }
    match cursor {
        PageCursor::Exhausted => {
            debug!(publication_id, "no more pages");
            Ok(())
        }
        PageCursor::First => fetch_page(ctx, publication_id, "").await,
        PageCursor::Next(token) => fetch_page(ctx, publication_id, &token).await,
    }
}

async fn fetch_page(
    ctx: &SagaContext,
    publication_id: &str,
    page_token: &str,
) -> Result<(), GazetteError> {
    ctx.put(ArticlesAction::StartLoadingPage {
        publication_id: publication_id.to_string(),
    })
    .await?;
    match ctx.api().list_articles(publication_id, page_token).await {
        Ok(page) => {
            debug!(publication_id, items = page.items.len(), "articles page received");
            ctx.put(ArticlesAction::ReceivePage {
                publication_id: publication_id.to_string(),
                page,
            })
            .await
        }
        Err(error) => {
            ctx.put(ArticlesAction::ReceivePageError {
                publication_id: publication_id.to_string(),
            })
            .await?;
            Err(error.into())
        }
    }
}

/// Fetches one article in full and stores it. Returns the article to the caller.
pub async fn load_full_article(
    ctx: &SagaContext,
    publication_id: &str,
    article_id: &str,
) -> Result<FullArticle, GazetteError> {
    let Some(_loading) = ctx.claim("articles/load", article_id) else {
        return Err(GazetteError::AlreadyLoading);
    };
    ctx.put(ArticlesAction::StartLoadingArticle {
        article_id: article_id.to_string(),
    })
    .await?;
    match ctx.api().get_article(publication_id, article_id).await {
        Ok(article) => {
            ctx.put(ArticlesAction::ReceiveArticle(article.clone())).await?;
            Ok(article)
        }
        Err(error) => {
            ctx.put(ArticlesAction::ReceiveArticleError {
                article_id: article_id.to_string(),
            })
            .await?;
            Err(error.into())
        }
    }
}

/// Runs one delete flow per delete request; flows for different articles are
/// independent of each other.
#[instrument(name = "articles_delete", skip_all)]
pub async fn delete_articles_saga(
    ctx: SagaContext,
    actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    take_every(
        &ctx,
        actions,
        "articles/delete",
        |action| match action {
            AppAction::Articles(ArticlesAction::Delete {
                publication_id,
                article_id,
            }) => Some((publication_id, article_id)),
            _ => None,
        },
        |(publication_id, article_id)| {
            let ctx = ctx.clone();
            async move {
                let outcome = delete_article(&ctx, &publication_id, &article_id).await?;
                info!(%article_id, ?outcome, "delete finished");
                Ok(())
            }
        },
    )
    .await
}

pub async fn delete_article(
    ctx: &SagaContext,
    publication_id: &str,
    article_id: &str,
) -> Result<DeleteOutcome, GazetteError> {
    let has_token = ctx.select(|state| !state.auth.token.is_empty());
    if !has_token {
        spawn_info_toast(ctx, "Please sign in to delete articles");
        return Ok(DeleteOutcome::NotStarted);
    }
    let Some(_deleting) = ctx.claim("articles/delete", article_id) else {
        debug!(article_id, "article is already being deleted");
        return Ok(DeleteOutcome::NotStarted);
    };
    let Some(article) = ctx.select(|state| state.articles.get(article_id).cloned()) else {
        warn!(article_id, "delete requested for an article that is not loaded");
        return Ok(DeleteOutcome::NotStarted);
    };
    let title = display_title(article.title());

    ctx.put(ArticlesAction::Remove {
        article_id: article_id.to_string(),
    })
    .await?;
    debug!(article_id, "delete pending");

    let button = create_timed_toast(
        ctx,
        format!("Deleted \"{title}\""),
        vec![ToastButton::undo(), ToastButton::close()],
        ctx.config().toasts.duration(),
    )
    .await?;
    if button.as_deref() == Some(UNDO_BUTTON) {
        ctx.put(ArticlesAction::Undelete(article)).await?;
        return Ok(DeleteOutcome::RolledBack);
    }

    let token = match refresh_auth(ctx).await {
        Ok(token) => token,
        Err(GazetteError::Auth(error)) => {
            handle_auth_error(ctx, &error).await?;
            return Ok(DeleteOutcome::Abandoned);
        }
        Err(error) => return Err(error),
    };

    match ctx.api().delete_article(publication_id, article_id, &token).await {
        Ok(()) => Ok(DeleteOutcome::Confirmed),
        Err(error) => {
            warn!(%error, article_id, "remote delete failed");
            ctx.put(ArticlesAction::Undelete(article)).await?;
            spawn_info_toast(ctx, format!("Could not delete \"{title}\""));
            Ok(DeleteOutcome::RolledBack)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_title() {
        assert_eq!(display_title(""), "Untitled");
        assert_eq!(display_title("Short title"), "Short title");
        assert_eq!(display_title("Exactly twenty chars"), "Exactly twenty chars");
        assert_eq!(
            display_title("A very long article title indeed"),
            "A very long art...ndeed"
        );
        assert_eq!(
            display_title("Trailing spaces in head and tail"),
            "Trailing spaces...tail"
        );
    }
}

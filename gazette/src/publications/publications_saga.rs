use super::{select_default_publication_id, PublicationsAction};
use crate::app::{AppAction, SagaContext};
use crate::navigation::{NavigationAction, Route};
use crate::toasts::spawn_info_toast;
use crate::{ActionStream, GazetteError};
use tracing::{info, instrument, warn};

/// Waits for the startup selection, then loads every page of publications.
///
/// A fetch error is toasted and ends the saga; it is not retried. When nothing
/// was pre-selected, redirects to the alphabetically first publication.
#[instrument(name = "publications", skip_all)]
pub async fn load_publications_saga(
    ctx: SagaContext,
    mut actions: ActionStream<AppAction>,
) -> Result<(), GazetteError> {
    let selected = actions
        .take_map(|action| match action {
            AppAction::Publications(PublicationsAction::Select { publication_id }) => {
                Some(publication_id)
            }
            _ => None,
        })
        .await?;

    match load_all_publications(&ctx).await {
        Ok(count) => info!(count, "publications loaded"),
        Err(error) => {
            if error.is_fetch() {
                warn!(%error, "could not load publications");
                ctx.put(PublicationsAction::ReceiveError).await?;
                spawn_info_toast(&ctx, "Could not load publications");
            }
            return Err(error);
        }
    }

    if selected.is_empty() {
        let default_id = ctx.select(|state| select_default_publication_id(&state.publications));
        if let Some(publication_id) = default_id {
            ctx.put(NavigationAction::Replace(Route::Publication { publication_id }))
                .await?;
        }
    }
    Ok(())
}

async fn load_all_publications(ctx: &SagaContext) -> Result<usize, GazetteError> {
    let page_size = ctx.config().api.page_size;
    let mut page_token = String::new();
    let mut count = 0;
    loop {
        ctx.put(PublicationsAction::StartLoading).await?;
        let page = ctx.api().list_publications(&page_token, page_size).await?;
        let is_last = page.is_last();
        count += page.items.len();
        page_token = page.next_page_token;
        ctx.put(PublicationsAction::Receive(page.items)).await?;
        if is_last {
            return Ok(count);
        }
    }
}

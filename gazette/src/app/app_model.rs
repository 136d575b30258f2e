use super::{AppAction, AppState, SagaContext};
use crate::api::ArticleApi;
use crate::articles::{
    delete_articles_saga, load_next_page_saga, refresh_articles_saga, ArticlesAction,
};
use crate::auth::{auth_flow_saga, AuthAction};
use crate::config::GazetteConfig;
use crate::drafts::{
    discard_drafts_saga, load_drafts_saga, submit_drafts_saga, DraftUpdater, DraftsAction,
    NEW_ARTICLE_ID,
};
use crate::identity::{Credentials, IdentityProvider};
use crate::navigation::{NavigationAction, Route};
use crate::publications::{load_publications_saga, PublicationsAction};
use crate::session_storage::SessionStorage;
use crate::toasts::{ToastId, ToastsAction, CLOSE_BUTTON, UNDO_BUTTON};
use crate::{ActionStream, GazetteError, StateStore, StoreError};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The running application: the store plus every saga, started together.
///
/// The view layer talks to it through the intent methods, which only dispatch
/// actions, and watches [`StateStore::to_signal`] for changes.
pub struct GazetteApp {
    context: SagaContext,
    sagas: Vec<JoinHandle<()>>,
}

impl GazetteApp {
    /// Must be called from inside a tokio runtime.
    pub fn start(
        config: GazetteConfig,
        api: Arc<dyn ArticleApi>,
        identity: Arc<dyn IdentityProvider>,
        session: Arc<dyn SessionStorage>,
    ) -> Self {
        let store = StateStore::new(AppState::default());
        let context = SagaContext::new(store, api, identity, session, config);
        let mut app = Self {
            context,
            sagas: Vec::new(),
        };
        app.spawn_saga("auth", auth_flow_saga);
        app.spawn_saga("publications", load_publications_saga);
        app.spawn_saga("articles/refresh", refresh_articles_saga);
        app.spawn_saga("articles/next-page", load_next_page_saga);
        app.spawn_saga("articles/delete", delete_articles_saga);
        app.spawn_saga("drafts/load", load_drafts_saga);
        app.spawn_saga("drafts/submit", submit_drafts_saga);
        app.spawn_saga("drafts/discard", discard_drafts_saga);
        info!(sagas = app.sagas.len(), "application started");
        app
    }

    /// Subscribes before spawning, so the saga sees every action dispatched
    /// after `start` returns.
    fn spawn_saga<F, Fut>(&mut self, name: &'static str, saga: F)
    where
        F: FnOnce(SagaContext, ActionStream<AppAction>) -> Fut,
        Fut: Future<Output = Result<(), GazetteError>> + Send + 'static,
    {
        let actions = self.context.actions();
        let task = saga(self.context.clone(), actions);
        self.sagas.push(tokio::spawn(async move {
            match task.await {
                Ok(()) => info!(saga = name, "saga finished"),
                Err(error) => error!(saga = name, %error, "saga stopped"),
            }
        }));
    }

    pub fn store(&self) -> &StateStore<AppState> {
        self.context.store()
    }

    pub fn context(&self) -> &SagaContext {
        &self.context
    }

    pub fn dispatch(&self, action: impl Into<AppAction>) -> Result<(), StoreError> {
        self.context.store().dispatch(action.into())
    }

    /// Aborts every saga and cancels the work they forked, such as a delete
    /// waiting on its undo toast. The store keeps its last state.
    pub fn shutdown(&mut self) {
        self.context.cancel_forks();
        for saga in self.sagas.drain(..) {
            saga.abort();
        }
    }

    /// Fired once at startup; an empty id lets the app pick the first publication.
    pub fn select_publication(&self, publication_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(PublicationsAction::Select {
            publication_id: publication_id.into(),
        })
    }

    pub fn open_publication(&self, publication_id: impl Into<String>) -> Result<(), StoreError> {
        let publication_id = publication_id.into();
        self.dispatch(NavigationAction::Push(Route::Publication {
            publication_id: publication_id.clone(),
        }))?;
        self.refresh_articles(publication_id)
    }

    pub fn refresh_articles(&self, publication_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(ArticlesAction::Refresh {
            publication_id: publication_id.into(),
        })
    }

    pub fn load_next_page(&self, publication_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(ArticlesAction::LoadNextPage {
            publication_id: publication_id.into(),
        })
    }

    pub fn delete_article(
        &self,
        publication_id: impl Into<String>,
        article_id: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(ArticlesAction::Delete {
            publication_id: publication_id.into(),
            article_id: article_id.into(),
        })
    }

    pub fn click_toast(&self, id: ToastId, button_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(ToastsAction::Close {
            id,
            button_id: Some(button_id.into()),
        })
    }

    pub fn undo(&self, id: ToastId) -> Result<(), StoreError> {
        self.click_toast(id, UNDO_BUTTON)
    }

    pub fn close_toast(&self, id: ToastId) -> Result<(), StoreError> {
        self.click_toast(id, CLOSE_BUTTON)
    }

    /// Restores the previous session, if the user signed in before.
    pub fn load_auth_info(&self) -> Result<(), StoreError> {
        self.dispatch(AuthAction::LoadInfo)
    }

    pub fn sign_in(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(AuthAction::SignIn(Credentials::new(username, password)))
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.dispatch(AuthAction::SignOut)
    }

    pub fn validate_new_password(
        &self,
        password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(AuthAction::ValidateNewPassword {
            password: password.into(),
            confirmation: confirmation.into(),
        })
    }

    pub fn submit_new_password(
        &self,
        password: impl Into<String>,
        confirmation: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(AuthAction::SubmitNewPassword {
            password: password.into(),
            confirmation: confirmation.into(),
        })
    }

    pub fn cancel_new_password(&self) -> Result<(), StoreError> {
        self.dispatch(AuthAction::CancelNewPassword)
    }

    /// Opens the editor; an empty `article_id` starts a new article.
    pub fn load_draft(
        &self,
        publication_id: impl Into<String>,
        article_id: impl Into<String>,
    ) -> Result<(), StoreError> {
        let publication_id = publication_id.into();
        let article_id = article_id.into();
        let route = if article_id == NEW_ARTICLE_ID {
            Route::NewArticle {
                publication_id: publication_id.clone(),
            }
        } else {
            Route::EditArticle {
                publication_id: publication_id.clone(),
                article_id: article_id.clone(),
            }
        };
        self.dispatch(NavigationAction::Push(route))?;
        self.dispatch(DraftsAction::Load {
            publication_id,
            article_id,
        })
    }

    pub fn update_draft(
        &self,
        article_id: impl Into<String>,
        updater: DraftUpdater,
    ) -> Result<(), StoreError> {
        self.dispatch(DraftsAction::Update {
            article_id: article_id.into(),
            updater,
        })
    }

    pub fn submit_draft(
        &self,
        publication_id: impl Into<String>,
        article_id: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.dispatch(DraftsAction::Submit {
            publication_id: publication_id.into(),
            article_id: article_id.into(),
        })
    }

    pub fn discard_draft(&self, article_id: impl Into<String>) -> Result<(), StoreError> {
        self.dispatch(DraftsAction::Discard {
            article_id: article_id.into(),
        })
    }
}

impl Drop for GazetteApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}

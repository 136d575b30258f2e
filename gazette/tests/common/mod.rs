#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use gazette::config::GazetteConfig;
use gazette::mock::{MockArticleApi, MockIdentity};
use gazette::models::{Author, FullArticle, PaginatedPage, Publication, ShortArticle};
use gazette::session_storage::{MemorySessionStorage, SessionStorage};
use gazette::toasts::Toast;
use gazette::{AppAction, AppState, GazetteApp};
use std::sync::Arc;
use std::time::Duration;

pub const WAIT_LIMIT: Duration = Duration::from_secs(60);

pub struct Harness {
    pub app: GazetteApp,
    pub api: Arc<MockArticleApi>,
    pub identity: Arc<MockIdentity>,
    pub session: Arc<MemorySessionStorage>,
}

impl Harness {
    pub fn start(api: MockArticleApi, identity: MockIdentity, has_session: bool) -> Self {
        let api = Arc::new(api);
        let identity = Arc::new(identity);
        let session = Arc::new(MemorySessionStorage::new(has_session));
        let app = GazetteApp::start(
            GazetteConfig::default(),
            api.clone(),
            identity.clone(),
            session.clone(),
        );
        Self {
            app,
            api,
            identity,
            session,
        }
    }

    pub fn with_defaults() -> Self {
        Self::start(MockArticleApi::new(), MockIdentity::new(), false)
    }

    pub fn has_session(&self) -> bool {
        self.session.has_session()
    }

    /// Waits, with a generous limit, for a state matching `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> AppState
    where
        F: FnMut(&AppState) -> bool,
    {
        tokio::time::timeout(WAIT_LIMIT, self.app.store().wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .expect("store closed")
    }

    pub async fn wait_for_toast(&self, text: &str) -> Toast {
        let state = self
            .wait_for(|state| state.toasts.toasts.iter().any(|toast| toast.text == text))
            .await;
        state
            .toasts
            .toasts
            .into_iter()
            .find(|toast| toast.text == text)
            .unwrap()
    }

    /// State once everything dispatched so far has been reduced.
    pub async fn settle(&self) -> AppState {
        self.app.store().await_state().await.expect("store closed")
    }

    pub async fn sign_in(&self, username: &str, password: &str) {
        self.identity.add_user(username, password);
        self.app.sign_in(username, password).unwrap();
        self.wait_for(|state| !state.auth.token.is_empty()).await;
        let session = self.session.clone();
        eventually(move || session.has_session()).await;
    }
}

/// Polls `condition` until it holds, letting other tasks run in between.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held");
}

/// Collects action kinds until one matching `last` arrives.
pub async fn collect_kinds_until(
    actions: &mut gazette::ActionStream<AppAction>,
    last: &str,
) -> Vec<&'static str> {
    use gazette::Action;
    let mut kinds = Vec::new();
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let action = actions.next().await.expect("store closed");
            kinds.push(action.kind());
            if action.kind() == last {
                break;
            }
        }
    })
    .await
    .expect("action never arrived");
    kinds
}

pub fn publication(id: &str, name: &str) -> Publication {
    Publication {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn short_article(publication_id: &str, id: &str, title: &str, day: u32) -> ShortArticle {
    ShortArticle {
        id: id.to_string(),
        publication_id: publication_id.to_string(),
        title: title.to_string(),
        authors: vec![Author::new("Ada Lovelace", "ada@example.com")],
        publish_date: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).single(),
        header_image: None,
    }
}

pub fn full_article(publication_id: &str, id: &str, title: &str) -> FullArticle {
    FullArticle {
        summary: short_article(publication_id, id, title, 1),
        content: format!("Content of {title}"),
        edit_date: None,
    }
}

pub fn article_page(publication_id: &str, ids: &[(&str, &str, u32)], next: &str) -> PaginatedPage<ShortArticle> {
    PaginatedPage::new(
        ids.iter()
            .map(|(id, title, day)| short_article(publication_id, id, title, *day))
            .collect(),
        next,
    )
}

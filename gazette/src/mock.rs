//! In-memory collaborators for tests and the offline demo.
//!
//! Both mocks record every call so tests can assert on what reached the
//! network, and both can be slowed down to widen race windows.

use crate::api::ArticleApi;
use crate::identity::{Credentials, IdentityError, IdentityProvider, NewPasswordChallenge};
use crate::models::{ArticleDraft, FullArticle, PaginatedPage, Publication, Session, ShortArticle};
use crate::FetchError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

const MOCK_ROOT: &str = "mock://api";

/// A call that reached [`MockArticleApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListPublications {
        page_token: String,
    },
    ListArticles {
        publication_id: String,
        page_token: String,
    },
    GetArticle {
        publication_id: String,
        article_id: String,
    },
    CreateArticle {
        publication_id: String,
        draft: ArticleDraft,
        token: String,
    },
    UpdateArticle {
        publication_id: String,
        article_id: String,
        draft: ArticleDraft,
        token: String,
    },
    DeleteArticle {
        publication_id: String,
        article_id: String,
        token: String,
    },
}

impl ApiCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApiCall::CreateArticle { .. } | ApiCall::UpdateArticle { .. } | ApiCall::DeleteArticle { .. }
        )
    }
}

/// Scripted articles API. Pages are keyed by their page token, `""` being
/// the first page. Anything not scripted answers 404.
#[derive(Default)]
pub struct MockArticleApi {
    publication_pages: Mutex<HashMap<String, Result<PaginatedPage<Publication>, FetchError>>>,
    article_pages: Mutex<HashMap<(String, String), Result<PaginatedPage<ShortArticle>, FetchError>>>,
    articles: Mutex<HashMap<String, FullArticle>>,
    fail_mutations: AtomicBool,
    created: AtomicU64,
    calls: Mutex<Vec<ApiCall>>,
    delay: Option<Duration>,
}

impl MockArticleApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_publication_page(&self, page_token: &str, page: PaginatedPage<Publication>) {
        self.publication_pages
            .lock()
            .unwrap()
            .insert(page_token.to_string(), Ok(page));
    }

    pub fn fail_publication_page(&self, page_token: &str) {
        let error = FetchError::status(format!("{MOCK_ROOT}/publications"), 500, "boom");
        self.publication_pages
            .lock()
            .unwrap()
            .insert(page_token.to_string(), Err(error));
    }

    pub fn add_article_page(
        &self,
        publication_id: &str,
        page_token: &str,
        page: PaginatedPage<ShortArticle>,
    ) {
        self.article_pages
            .lock()
            .unwrap()
            .insert((publication_id.to_string(), page_token.to_string()), Ok(page));
    }

    pub fn fail_article_page(&self, publication_id: &str, page_token: &str) {
        let url = format!("{MOCK_ROOT}/publications/{publication_id}/articles");
        self.article_pages.lock().unwrap().insert(
            (publication_id.to_string(), page_token.to_string()),
            Err(FetchError::status(url, 500, "boom")),
        );
    }

    pub fn add_article(&self, article: FullArticle) {
        self.articles
            .lock()
            .unwrap()
            .insert(article.summary.id.clone(), article);
    }

    /// Makes create, update and delete answer 500.
    pub fn set_fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<ApiCall> {
        self.calls().into_iter().filter(ApiCall::is_mutation).collect()
    }

    async fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
    }

    fn check_mutation(&self, url: String) -> Result<(), FetchError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(FetchError::status(url, 500, "mutation rejected"));
        }
        Ok(())
    }

    fn article_from_draft(publication_id: &str, article_id: &str, draft: &ArticleDraft) -> FullArticle {
        FullArticle {
            summary: ShortArticle {
                id: article_id.to_string(),
                publication_id: publication_id.to_string(),
                title: draft.title.clone(),
                authors: draft.authors.clone(),
                publish_date: Some(chrono::Utc::now()),
                header_image: draft.header_image.clone(),
            },
            content: draft.content.clone(),
            edit_date: Some(chrono::Utc::now()),
        }
    }
}

#[async_trait]
impl ArticleApi for MockArticleApi {
    async fn list_publications(
        &self,
        page_token: &str,
        _page_size: u32,
    ) -> Result<PaginatedPage<Publication>, FetchError> {
        self.record(ApiCall::ListPublications {
            page_token: page_token.to_string(),
        })
        .await;
        self.publication_pages
            .lock()
            .unwrap()
            .get(page_token)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::status(format!("{MOCK_ROOT}/publications"), 404, ""))
            })
    }

    async fn list_articles(
        &self,
        publication_id: &str,
        page_token: &str,
    ) -> Result<PaginatedPage<ShortArticle>, FetchError> {
        self.record(ApiCall::ListArticles {
            publication_id: publication_id.to_string(),
            page_token: page_token.to_string(),
        })
        .await;
        self.article_pages
            .lock()
            .unwrap()
            .get(&(publication_id.to_string(), page_token.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                let url = format!("{MOCK_ROOT}/publications/{publication_id}/articles");
                Err(FetchError::status(url, 404, ""))
            })
    }

    async fn get_article(
        &self,
        publication_id: &str,
        article_id: &str,
    ) -> Result<FullArticle, FetchError> {
        self.record(ApiCall::GetArticle {
            publication_id: publication_id.to_string(),
            article_id: article_id.to_string(),
        })
        .await;
        self.articles
            .lock()
            .unwrap()
            .get(article_id)
            .cloned()
            .ok_or_else(|| {
                let url = format!("{MOCK_ROOT}/publications/{publication_id}/articles/{article_id}");
                FetchError::status(url, 404, "")
            })
    }

    async fn create_article(
        &self,
        publication_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError> {
        self.record(ApiCall::CreateArticle {
            publication_id: publication_id.to_string(),
            draft: draft.clone(),
            token: token.to_string(),
        })
        .await;
        self.check_mutation(format!("{MOCK_ROOT}/publications/{publication_id}/articles"))?;
        let id = format!("created-{}", self.created.fetch_add(1, Ordering::SeqCst) + 1);
        let article = Self::article_from_draft(publication_id, &id, draft);
        self.add_article(article.clone());
        Ok(article)
    }

    async fn update_article(
        &self,
        publication_id: &str,
        article_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError> {
        self.record(ApiCall::UpdateArticle {
            publication_id: publication_id.to_string(),
            article_id: article_id.to_string(),
            draft: draft.clone(),
            token: token.to_string(),
        })
        .await;
        self.check_mutation(format!(
            "{MOCK_ROOT}/publications/{publication_id}/articles/{article_id}"
        ))?;
        let article = Self::article_from_draft(publication_id, article_id, draft);
        self.add_article(article.clone());
        Ok(article)
    }

    async fn delete_article(
        &self,
        publication_id: &str,
        article_id: &str,
        token: &str,
    ) -> Result<(), FetchError> {
        self.record(ApiCall::DeleteArticle {
            publication_id: publication_id.to_string(),
            article_id: article_id.to_string(),
            token: token.to_string(),
        })
        .await;
        self.check_mutation(format!(
            "{MOCK_ROOT}/publications/{publication_id}/articles/{article_id}"
        ))?;
        self.articles.lock().unwrap().remove(article_id);
        Ok(())
    }
}

/// A call that reached [`MockIdentity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCall {
    Load,
    Authenticate { username: String },
    CompleteNewPassword { username: String },
    CurrentUser,
    CurrentSession,
    SignOut,
}

/// Identity provider backed by a user table. Sessions it hands out expire
/// after `session_ttl` seconds.
pub struct MockIdentity {
    users: Mutex<HashMap<String, String>>,
    new_password_required: Mutex<HashSet<String>>,
    current: Mutex<Option<Session>>,
    refresh_fails: AtomicBool,
    issued: AtomicU64,
    session_ttl: i64,
    calls: Mutex<Vec<IdentityCall>>,
    delay: Option<Duration>,
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            new_password_required: Mutex::new(HashSet::new()),
            current: Mutex::new(None),
            refresh_fails: AtomicBool::new(false),
            issued: AtomicU64::new(0),
            session_ttl: 3600,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_session_ttl(mut self, seconds: i64) -> Self {
        self.session_ttl = seconds;
        self
    }

    pub fn add_user(&self, username: &str, password: &str) {
        self.users
            .lock()
            .unwrap()
            .insert(username.to_string(), password.to_string());
    }

    /// The next sign-in of `username` is answered with a new password challenge.
    pub fn require_new_password(&self, username: &str) {
        self.new_password_required
            .lock()
            .unwrap()
            .insert(username.to_string());
    }

    /// Pretends the provider remembers `username` from an earlier run.
    pub fn remember_user(&self, username: &str) {
        let session = self.issue(username);
        *self.current.lock().unwrap() = Some(session);
    }

    pub fn set_refresh_fails(&self, fails: bool) {
        self.refresh_fails.store(fails, Ordering::SeqCst);
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.users.lock().unwrap().get(username).cloned()
    }

    pub fn calls(&self) -> Vec<IdentityCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &IdentityCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    async fn record(&self, call: IdentityCall) {
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
    }

    fn issue(&self, username: &str) -> Session {
        let serial = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Session {
            username: username.to_string(),
            token: format!("token-{username}-{serial}"),
            expiration: chrono::Utc::now().timestamp() + self.session_ttl,
        }
    }

    fn start_session(&self, username: &str) -> Session {
        let session = self.issue(username);
        *self.current.lock().unwrap() = Some(session.clone());
        session
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn load(&self) -> Result<(), IdentityError> {
        self.record(IdentityCall::Load).await;
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, IdentityError> {
        self.record(IdentityCall::Authenticate {
            username: credentials.username.clone(),
        })
        .await;
        let known = self.password_of(&credentials.username);
        if known.as_deref() != Some(credentials.password.as_str()) {
            return Err(IdentityError::NotAuthorized(
                "Incorrect username or password.".to_string(),
            ));
        }
        if self
            .new_password_required
            .lock()
            .unwrap()
            .contains(&credentials.username)
        {
            return Err(IdentityError::NewPasswordRequired(NewPasswordChallenge {
                username: credentials.username.clone(),
                session: format!("challenge-{}", credentials.username),
                required_attributes: Vec::new(),
            }));
        }
        Ok(self.start_session(&credentials.username))
    }

    async fn complete_new_password(
        &self,
        challenge: &NewPasswordChallenge,
        new_password: &str,
    ) -> Result<Session, IdentityError> {
        self.record(IdentityCall::CompleteNewPassword {
            username: challenge.username.clone(),
        })
        .await;
        self.new_password_required
            .lock()
            .unwrap()
            .remove(&challenge.username);
        self.add_user(&challenge.username, new_password);
        Ok(self.start_session(&challenge.username))
    }

    async fn current_user(&self) -> Option<String> {
        self.record(IdentityCall::CurrentUser).await;
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.username.clone())
    }

    async fn current_session(&self) -> Result<Session, IdentityError> {
        self.record(IdentityCall::CurrentSession).await;
        if self.refresh_fails.load(Ordering::SeqCst) {
            return Err(IdentityError::NotAuthorized(
                "Refresh Token has expired".to_string(),
            ));
        }
        let username = self
            .current
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.username.clone())
            .ok_or(IdentityError::NoCurrentUser)?;
        Ok(self.start_session(&username))
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.record(IdentityCall::SignOut).await;
        *self.current.lock().unwrap() = None;
        Ok(())
    }
}

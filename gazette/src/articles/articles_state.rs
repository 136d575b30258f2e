use crate::models::{Article, FullArticle, PaginatedPage, ShortArticle, LAST_PAGE};
use crate::Action;
use im::OrdMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticlesAction {
    Refresh {
        publication_id: String,
    },
    LoadNextPage {
        publication_id: String,
    },
    Delete {
        publication_id: String,
        article_id: String,
    },
    /// Drops every article of a publication and forgets its page cursor.
    ClearPublication {
        publication_id: String,
    },
    StartLoadingPage {
        publication_id: String,
    },
    ReceivePage {
        publication_id: String,
        page: PaginatedPage<ShortArticle>,
    },
    ReceivePageError {
        publication_id: String,
    },
    StartLoadingArticle {
        article_id: String,
    },
    ReceiveArticle(FullArticle),
    ReceiveArticleError {
        article_id: String,
    },
    Remove {
        article_id: String,
    },
    Undelete(Article),
}

impl Action for ArticlesAction {
    fn kind(&self) -> &'static str {
        match self {
            ArticlesAction::Refresh { .. } => "articles/refresh",
            ArticlesAction::LoadNextPage { .. } => "articles/load-next-page",
            ArticlesAction::Delete { .. } => "articles/delete",
            ArticlesAction::ClearPublication { .. } => "articles/clear-publication",
            ArticlesAction::StartLoadingPage { .. } => "articles/start-loading-page",
            ArticlesAction::ReceivePage { .. } => "articles/receive-page",
            ArticlesAction::ReceivePageError { .. } => "articles/receive-page-error",
            ArticlesAction::StartLoadingArticle { .. } => "articles/start-loading-article",
            ArticlesAction::ReceiveArticle(_) => "articles/receive-article",
            ArticlesAction::ReceiveArticleError { .. } => "articles/receive-article-error",
            ArticlesAction::Remove { .. } => "articles/remove",
            ArticlesAction::Undelete(_) => "articles/undelete",
        }
    }
}

/// Where the next page of a publication's articles starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    First,
    Next(String),
    Exhausted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlesState {
    pub articles: OrdMap<String, Article>,
    /// Keyed by publication id; absent until the first page arrived.
    pub next_page_tokens: OrdMap<String, String>,
    pub loading_publications: Vec<String>,
    pub loading_articles: Vec<String>,
}

fn add_id(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

fn remove_id(ids: &mut Vec<String>, id: &str) {
    ids.retain(|existing| existing != id);
}

impl ArticlesState {
    pub fn reduce(mut self, action: &ArticlesAction) -> Self {
        match action {
            ArticlesAction::Refresh { .. }
            | ArticlesAction::LoadNextPage { .. }
            | ArticlesAction::Delete { .. } => {}
            ArticlesAction::ClearPublication { publication_id } => {
                let stale: Vec<String> = self
                    .articles
                    .iter()
                    .filter(|(_, article)| article.publication_id() == publication_id)
                    .map(|(id, _)| id.clone())
                    .collect();
                for id in stale {
                    self.articles.remove(&id);
                }
                self.next_page_tokens.remove(publication_id);
            }
            ArticlesAction::StartLoadingPage { publication_id } => {
                add_id(&mut self.loading_publications, publication_id);
            }
            ArticlesAction::ReceivePage {
                publication_id,
                page,
            } => {
                for summary in &page.items {
                    let article = match self.articles.remove(&summary.id) {
                        Some(existing) => existing.merge_summary(summary.clone()),
                        None => Article::from(summary.clone()),
                    };
                    self.articles.insert(summary.id.clone(), article);
                }
                self.next_page_tokens
                    .insert(publication_id.clone(), page.next_page_token.clone());
                remove_id(&mut self.loading_publications, publication_id);
            }
            ArticlesAction::ReceivePageError { publication_id } => {
                remove_id(&mut self.loading_publications, publication_id);
            }
            ArticlesAction::StartLoadingArticle { article_id } => {
                add_id(&mut self.loading_articles, article_id);
            }
            ArticlesAction::ReceiveArticle(article) => {
                let id = article.summary.id.clone();
                remove_id(&mut self.loading_articles, &id);
                self.articles.insert(id, Article::from(article.clone()));
            }
            ArticlesAction::ReceiveArticleError { article_id } => {
                remove_id(&mut self.loading_articles, article_id);
            }
            ArticlesAction::Remove { article_id } => {
                self.articles.remove(article_id);
            }
            ArticlesAction::Undelete(article) => {
                self.articles
                    .insert(article.id().to_string(), article.clone());
            }
        }
        self
    }

    pub fn get(&self, article_id: &str) -> Option<&Article> {
        self.articles.get(article_id)
    }
}

pub fn select_page_cursor(state: &ArticlesState, publication_id: &str) -> PageCursor {
    match state.next_page_tokens.get(publication_id) {
        None => PageCursor::First,
        Some(token) if token == LAST_PAGE => PageCursor::Exhausted,
        Some(token) => PageCursor::Next(token.clone()),
    }
}

pub fn select_is_loading_publication(state: &ArticlesState, publication_id: &str) -> bool {
    state
        .loading_publications
        .iter()
        .any(|id| id == publication_id)
}

pub fn select_is_loading_article(state: &ArticlesState, article_id: &str) -> bool {
    state.loading_articles.iter().any(|id| id == article_id)
}

/// A publication's articles, newest first. Undated articles go last.
pub fn select_articles_for_publication(state: &ArticlesState, publication_id: &str) -> Vec<Article> {
    let mut articles: Vec<Article> = state
        .articles
        .values()
        .filter(|article| article.publication_id() == publication_id)
        .cloned()
        .collect();
    articles.sort_by(|a, b| {
        b.summary
            .publish_date
            .cmp(&a.summary.publish_date)
            .then_with(|| a.id().cmp(b.id()))
    });
    articles
}

//! Wire and store models for publications and articles.
//!
//! All wire JSON is camelCase. Dates are RFC 3339 timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Token value meaning "this was the last page".
pub const LAST_PAGE: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Author {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// The list-view summary of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortArticle {
    pub id: String,
    pub publication_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub header_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullArticle {
    #[serde(flatten)]
    pub summary: ShortArticle,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub edit_date: Option<DateTime<Utc>>,
}

/// What the articles map holds: a summary, plus the detail once it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub summary: ShortArticle,
    pub content: Option<String>,
    pub edit_date: Option<DateTime<Utc>>,
}

impl Article {
    pub fn id(&self) -> &str {
        &self.summary.id
    }

    pub fn publication_id(&self) -> &str {
        &self.summary.publication_id
    }

    pub fn title(&self) -> &str {
        &self.summary.title
    }

    pub fn is_full(&self) -> bool {
        self.content.is_some()
    }

    /// Takes the incoming summary fields and keeps the detail already held.
    pub fn merge_summary(self, summary: ShortArticle) -> Self {
        Self { summary, ..self }
    }
}

impl From<ShortArticle> for Article {
    fn from(summary: ShortArticle) -> Self {
        Self {
            summary,
            content: None,
            edit_date: None,
        }
    }
}

impl From<FullArticle> for Article {
    fn from(article: FullArticle) -> Self {
        Self {
            summary: article.summary,
            content: Some(article.content),
            edit_date: article.edit_date,
        }
    }
}

/// The create/edit buffer sent as the body of POST and PATCH requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: String,
    pub authors: Vec<Author>,
    pub header_image: Option<String>,
    pub content: String,
}

impl ArticleDraft {
    /// Template for a brand new article: everything blank, one empty author row.
    pub fn empty() -> Self {
        Self {
            authors: vec![Author::default()],
            ..Self::default()
        }
    }
}

impl From<&Article> for ArticleDraft {
    fn from(article: &Article) -> Self {
        Self {
            title: article.summary.title.clone(),
            authors: article.summary.authors.clone(),
            header_image: article.summary.header_image.clone(),
            content: article.content.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, deserialize_with = "null_as_last_page")]
    pub next_page_token: String,
}

impl<T> PaginatedPage<T> {
    pub fn new(items: Vec<T>, next_page_token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.into(),
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, LAST_PAGE)
    }

    pub fn is_last(&self) -> bool {
        self.next_page_token == LAST_PAGE
    }
}

fn null_as_last_page<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A signed-in session as handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub token: String,
    /// Seconds since the Unix epoch.
    pub expiration: i64,
}

impl Session {
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.token.is_empty() && self.expiration > now
    }
}

//! Client for the publications/articles REST API.

use crate::config::{ConfigError, GazetteConfig};
use crate::models::{ArticleDraft, FullArticle, PaginatedPage, Publication, ShortArticle};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

/// The six endpoints the state layer talks to.
///
/// Mutating calls carry the identity provider token in `Authorization`.
#[async_trait]
pub trait ArticleApi: Send + Sync {
    async fn list_publications(
        &self,
        page_token: &str,
        page_size: u32,
    ) -> Result<PaginatedPage<Publication>, FetchError>;

    async fn list_articles(
        &self,
        publication_id: &str,
        page_token: &str,
    ) -> Result<PaginatedPage<ShortArticle>, FetchError>;

    async fn get_article(
        &self,
        publication_id: &str,
        article_id: &str,
    ) -> Result<FullArticle, FetchError>;

    async fn create_article(
        &self,
        publication_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError>;

    async fn update_article(
        &self,
        publication_id: &str,
        article_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError>;

    async fn delete_article(
        &self,
        publication_id: &str,
        article_id: &str,
        token: &str,
    ) -> Result<(), FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpArticleApi {
    client: reqwest::Client,
    root: Url,
}

impl HttpArticleApi {
    pub fn new(root: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            root,
        }
    }

    pub fn from_config(config: &GazetteConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.api_root()?))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute(&self, request: RequestBuilder, url: &Url) -> Result<Response, FetchError> {
        debug!(%url, "api request");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "api request rejected");
            return Err(FetchError::status(url.as_str(), status.as_u16(), body));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, FetchError> {
        self.execute(request, url)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FetchError::decode(url.as_str(), e.to_string()))
    }
}

#[async_trait]
impl ArticleApi for HttpArticleApi {
    async fn list_publications(
        &self,
        page_token: &str,
        page_size: u32,
    ) -> Result<PaginatedPage<Publication>, FetchError> {
        let mut url = self.endpoint(&["publications"]);
        {
            let mut query = url.query_pairs_mut();
            if !page_token.is_empty() {
                query.append_pair("pageToken", page_token);
            }
            query.append_pair("pageSize", &page_size.to_string());
        }
        self.fetch_json(self.client.get(url.clone()), &url).await
    }

    async fn list_articles(
        &self,
        publication_id: &str,
        page_token: &str,
    ) -> Result<PaginatedPage<ShortArticle>, FetchError> {
        let mut url = self.endpoint(&["publications", publication_id, "articles"]);
        if !page_token.is_empty() {
            url.query_pairs_mut().append_pair("pageToken", page_token);
        }
        self.fetch_json(self.client.get(url.clone()), &url).await
    }

    async fn get_article(
        &self,
        publication_id: &str,
        article_id: &str,
    ) -> Result<FullArticle, FetchError> {
        let url = self.endpoint(&["publications", publication_id, "articles", article_id]);
        self.fetch_json(self.client.get(url.clone()), &url).await
    }

    async fn create_article(
        &self,
        publication_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError> {
        let url = self.endpoint(&["publications", publication_id, "articles"]);
        let request = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, token)
            .json(draft);
        self.fetch_json(request, &url).await
    }

    async fn update_article(
        &self,
        publication_id: &str,
        article_id: &str,
        draft: &ArticleDraft,
        token: &str,
    ) -> Result<FullArticle, FetchError> {
        let url = self.endpoint(&["publications", publication_id, "articles", article_id]);
        let request = self
            .client
            .patch(url.clone())
            .header(AUTHORIZATION, token)
            .json(draft);
        self.fetch_json(request, &url).await
    }

    async fn delete_article(
        &self,
        publication_id: &str,
        article_id: &str,
        token: &str,
    ) -> Result<(), FetchError> {
        let url = self.endpoint(&["publications", publication_id, "articles", article_id]);
        let request = self.client.delete(url.clone()).header(AUTHORIZATION, token);
        self.execute(request, &url).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> HttpArticleApi {
        HttpArticleApi::new(Url::parse("https://api.example.com/v1/").unwrap())
    }

    #[test]
    fn test_endpoint_paths() {
        let api = api();
        assert_eq!(
            api.endpoint(&["publications"]).as_str(),
            "https://api.example.com/v1/publications"
        );
        assert_eq!(
            api.endpoint(&["publications", "p 1", "articles", "a1"]).as_str(),
            "https://api.example.com/v1/publications/p%201/articles/a1"
        );
    }

    #[test]
    fn test_from_config_normalises_root() {
        let mut config = GazetteConfig::default();
        config.api.root_url = "https://api.example.com/v1".to_string();
        let api = HttpArticleApi::from_config(&config).unwrap();
        assert_eq!(
            api.endpoint(&["publications"]).as_str(),
            "https://api.example.com/v1/publications"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_fetch_error() {
        let api = HttpArticleApi::new(Url::parse("http://127.0.0.1:1/").unwrap());
        let error = api.list_publications("", 10).await.unwrap_err();
        assert_eq!(error.status, None);
        assert!(error.url.starts_with("http://127.0.0.1:1/publications"));
    }
}

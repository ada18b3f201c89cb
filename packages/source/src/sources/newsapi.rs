//! NewsAPI crime article source.
//!
//! Searches the NewsAPI "everything" endpoint for crime-related
//! articles. Articles carry no natural primary key, so identity is a
//! content hash over the article URL and published timestamp.
//! Endpoint: <https://newsapi.org/v2/everything>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crime_feed_models::{CanonicalIncident, Source};
use serde::Deserialize;

use crate::{CrimeSource, NormalizeError, RawRecord, SourceError, identity, parsing};

const API_URL: &str = "https://newsapi.org/v2/everything";

/// Keyword filter for crime-related coverage.
const QUERY: &str = "(crime OR shooting OR murder OR theft) AND (police OR arrest)";

/// Maximum articles per request (NewsAPI page cap).
const PAGE_SIZE: u32 = 100;

/// NewsAPI article source.
pub struct NewsApiSource {
    api_key: Option<String>,
}

impl NewsApiSource {
    /// Creates a news source with an explicit API key.
    #[must_use]
    pub const fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Creates a news source reading its key from `NEWS_API_KEY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("NEWS_API_KEY").ok())
    }
}

/// Nested publisher object on a NewsAPI article.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsPublisher {
    /// Publisher display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw article shape from the NewsAPI search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsArticle {
    /// Article URL; half of the identity hash input.
    #[serde(default)]
    pub url: Option<String>,
    /// RFC 3339 publication time; the other half of the hash input.
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<String>,
    /// Article summary text.
    #[serde(default)]
    pub description: Option<String>,
    /// Publishing outlet.
    #[serde(default)]
    pub source: NewsPublisher,
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[async_trait]
impl CrimeSource for NewsApiSource {
    fn source(&self) -> Source {
        Source::Newsapi
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, SourceError> {
        let Some(api_key) = &self.api_key else {
            return Err(SourceError::MissingCredential {
                key: "NEWS_API_KEY",
            });
        };

        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("q", QUERY.to_string()),
            ("language", "en".to_string()),
            ("pageSize", page_size),
            ("sortBy", "publishedAt".to_string()),
        ];
        if let Some(since) = since {
            params.push(("from", since.to_rfc3339()));
        }

        log::info!("Fetching news articles (since={since:?})");
        let response = client
            .get(API_URL)
            .header("X-Api-Key", api_key)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let body: NewsResponse = super::decode_body(&body)?;

        if body.status != "ok" {
            return Err(SourceError::Api {
                message: body
                    .message
                    .unwrap_or_else(|| format!("NewsAPI status: {}", body.status)),
            });
        }

        log::info!("Downloaded {} news articles", body.articles.len());
        Ok(body.articles.into_iter().map(RawRecord::News).collect())
    }

    fn normalize(&self, raw: &RawRecord) -> Result<CanonicalIncident, NormalizeError> {
        let RawRecord::News(article) = raw else {
            return Err(NormalizeError::SourceMismatch {
                expected: self.source(),
            });
        };

        let url = article.url.as_deref().unwrap_or_default();
        let published_at = article.published_at.as_deref().unwrap_or_default();
        let incident_id = identity::derived_key(&[url, published_at]);

        let occurred_at = article
            .published_at
            .as_deref()
            .and_then(parsing::parse_feed_date);

        Ok(CanonicalIncident {
            incident_id,
            occurred_at,
            description: article.description.clone().unwrap_or_default(),
            location: article
                .source
                .name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            crime_type: "news_report".to_string(),
            source: Source::Newsapi,
            latitude: None,
            longitude: None,
        })
    }
}

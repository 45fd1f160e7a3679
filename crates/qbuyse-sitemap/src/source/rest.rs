//! [`PostStore`] backed by the hosted backend's PostgREST endpoint.
//!
//! Rows are read from `{rest_url}/{table}` selecting only the columns the
//! sitemap needs (`id`, `created_at`, `state`, `category`). Eligibility
//! (published, not deleted) is expressed as PostgREST filters in
//! [`RestStoreConfig::filters`], e.g. `("status", "eq.active")`. At least one
//! filter is required: [`RestStoreConfig::new`] takes the first one and
//! [`RestPostStore::new`] rejects a config whose filters were cleared.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{PostRecord, PostStore};
use crate::{Error, Result};

const SELECT_COLUMNS: &str = "id,created_at,state,category";
const ORDER: &str = "created_at.desc,id.asc";

/// Connection settings for [`RestPostStore`].
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// PostgREST root, e.g. `https://project.supabase.co/rest/v1`.
    pub rest_url: String,
    /// Anonymous or service API key.
    pub api_key: String,
    /// Table holding listings.
    pub table: String,
    /// Eligibility filters (`column=operator.value`) applied to every query.
    pub filters: Vec<(String, String)>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl RestStoreConfig {
    /// Settings for the `posts` table, keeping only rows where `column`
    /// matches `condition` (e.g. `"status"`, `"eq.active"`).
    pub fn new(
        rest_url: impl Into<String>,
        api_key: impl Into<String>,
        column: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            rest_url: rest_url.into(),
            api_key: api_key.into(),
            table: "posts".to_string(),
            filters: vec![(column.into(), condition.into())],
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Add another eligibility filter.
    #[must_use]
    pub fn with_filter(mut self, column: impl Into<String>, condition: impl Into<String>) -> Self {
        self.filters.push((column.into(), condition.into()));
        self
    }
}

/// Post store that queries PostgREST over HTTP.
pub struct RestPostStore {
    client: Client,
    endpoint: String,
    filters: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct PostRow {
    id: RowId,
    created_at: DateTime<Utc>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let id = match row.id {
            RowId::Number(n) => n.to_string(),
            RowId::Text(s) => s,
        };
        Self {
            id,
            created_at: row.created_at,
            state: row.state,
            category: row.category,
        }
    }
}

impl RestPostStore {
    /// Build a store with a configured HTTP client.
    ///
    /// Fails with [`Error::Configuration`] when no eligibility filter is set,
    /// since the store would otherwise list deleted and unpublished posts.
    pub fn new(config: RestStoreConfig) -> Result<Self> {
        if config.filters.is_empty() {
            return Err(Error::Configuration(
                "post store needs at least one eligibility filter".into(),
            ));
        }

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| Error::Configuration("API key contains invalid characters".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::Configuration("API key contains invalid characters".into()))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("qbuyse-sitemap/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/{}",
            config.rest_url.trim_end_matches('/'),
            config.table.trim_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            filters: config.filters,
        })
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(Error::Database(format!(
            "post store returned {status}: {snippet}"
        )))
    }
}

/// Extract the total from a `Content-Range` header (`0-24/1234` or `*/1234`).
fn parse_content_range_total(value: &str) -> Result<u64> {
    value
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| Error::Database(format!("unexpected Content-Range header: {value}")))
}

#[async_trait]
impl PostStore for RestPostStore {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn count_posts(&self) -> Result<u64> {
        let response = self
            .client
            .head(&self.endpoint)
            .query(&[("select", "id")])
            .query(&self.filters)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Database("count response has no Content-Range".into()))?;
        let total = parse_content_range_total(range)?;

        debug!(total, "Counted eligible posts");
        Ok(total)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_posts(&self, offset: u64, limit: u32) -> Result<Vec<PostRecord>> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("select", SELECT_COLUMNS),
                ("order", ORDER),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .query(&self.filters)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let rows: Vec<PostRow> = response.json().await?;

        debug!(rows = rows.len(), "Fetched post page");
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> RestPostStore {
        let config = RestStoreConfig::new(
            format!("{}/rest/v1/", server.uri()),
            "anon-key",
            "status",
            "eq.active",
        )
        .with_filter("deleted_at", "is.null");
        RestPostStore::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_posts_builds_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(query_param("select", "id,created_at,state,category"))
            .and(query_param("order", "created_at.desc,id.asc"))
            .and(query_param("offset", "100"))
            .and(query_param("limit", "50"))
            .and(query_param("status", "eq.active"))
            .and(query_param("deleted_at", "is.null"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[
                    {"id": 7, "created_at": "2024-03-15T10:30:00.123456+00:00", "state": "Kerala", "category": "Mobiles"},
                    {"id": "9f0c", "created_at": "2024-03-14T08:00:00Z", "state": null}
                ]"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let posts = store_for(&server).fetch_posts(100, 50).await.unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "7");
        assert_eq!(posts[0].state.as_deref(), Some("Kerala"));
        assert_eq!(posts[0].created_at.date_naive().to_string(), "2024-03-15");
        assert_eq!(posts[1].id, "9f0c");
        assert!(posts[1].category.is_none());
    }

    #[tokio::test]
    async fn test_count_posts_reads_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/posts"))
            .and(header("prefer", "count=exact"))
            .and(query_param("status", "eq.active"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/50001"))
            .mount(&server)
            .await;

        assert_eq!(store_for(&server).count_posts().await.unwrap(), 50_001);
    }

    #[tokio::test]
    async fn test_server_error_is_database_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_posts(0, 10).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("503"));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_database_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"not": "rows"}"#))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_posts(0, 10).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/1234").unwrap(), 1234);
        assert_eq!(parse_content_range_total("*/0").unwrap(), 0);
        assert!(parse_content_range_total("0-24/*").is_err());
        assert!(parse_content_range_total("garbage").is_err());
    }

    #[test]
    fn test_invalid_api_key_is_rejected() {
        let config = RestStoreConfig::new(
            "https://example.supabase.co/rest/v1",
            "bad\nkey",
            "status",
            "eq.active",
        );
        assert!(matches!(
            RestPostStore::new(config),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_store_without_eligibility_filter_is_rejected() {
        let mut config = RestStoreConfig::new(
            "https://example.supabase.co/rest/v1",
            "anon-key",
            "status",
            "eq.active",
        );
        assert_eq!(config.filters, [("status".to_string(), "eq.active".to_string())]);

        config.filters.clear();
        let Err(Error::Configuration(message)) = RestPostStore::new(config) else {
            panic!("expected configuration error");
        };
        assert!(message.contains("eligibility filter"));
    }
}

//! HTTP client for the cloud-management API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Header carrying server-side list filters.
pub const FILTER_HEADER: &str = "X-Filter";

/// Paginated collection envelope returned by list endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default = "first_page")]
    pub page: u32,

    #[serde(default = "first_page")]
    pub pages: u32,

    #[serde(default)]
    pub results: u64,
}

fn first_page() -> u32 {
    1
}

/// Authenticated API client bound to one account token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client from config.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.token))
                .map_err(|_| ApiError::InvalidToken)?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode("GET", path, response).await
    }

    /// Make a GET request with an `X-Filter` header.
    pub async fn get_json_filtered<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: &serde_json::Value,
    ) -> Result<T, ApiError> {
        debug!(path, %filter, "GET (filtered)");
        let response = self
            .client
            .get(self.url(path))
            .header(FILTER_HEADER, filter.to_string())
            .send()
            .await?;
        Self::decode("GET", path, response).await
    }

    /// Make a POST request.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode("POST", path, response).await
    }

    /// Make a PUT request.
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "PUT");
        let response = self.client.put(self.url(path)).json(body).send().await?;
        Self::decode("PUT", path, response).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!(path, "DELETE");
        let response = self.client.delete(self.url(path)).send().await?;
        Self::check("DELETE", path, response).await.map(|_| ())
    }

    /// Fetch every page of a collection endpoint.
    pub async fn list_all<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>, ApiError> {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let current: Page<T> = self
                .get_json(&format!("{endpoint}{separator}page={page}"))
                .await?;
            items.extend(current.data);
            if page >= current.pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Return the response if it succeeded, or an error carrying its body.
    async fn check(
        method: &'static str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            method,
            path: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let bytes = Self::check(method, path, response).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = ApiConfig::new("https://api.example.test/v4/", "token");
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.url("/domains"), "https://api.example.test/v4/domains");
    }

    #[test]
    fn rejects_token_with_newline() {
        let config = ApiConfig::new("https://api.example.test", "bad\ntoken");
        assert!(matches!(
            ApiClient::new(&config),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn page_defaults_to_single_page() {
        let page: Page<serde_json::Value> = serde_json::from_str(r#"{"data":[{"id":1}]}"#).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 1);
        assert_eq!(page.data.len(), 1);
    }
}

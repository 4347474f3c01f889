//! Editor-side client for the `/crud` HTTP surface.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::auth::SessionHandle;
use crate::dynamodb::Item;
use crate::error::ApiError;

pub const CRUD_PATH: &str = "crud";

/// The four handler operations, plus fetch-by-id.
#[async_trait]
pub trait ItemsApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Item>, ApiError>;
    async fn get(&self, id: &str) -> Result<Option<Item>, ApiError>;
    /// Returns the document as the server stored it.
    async fn create(&self, item: &Item) -> Result<Item, ApiError>;
    /// Full-document overwrite of the item stored under `id`.
    async fn update(&self, id: &str, item: &Item) -> Result<Item, ApiError>;
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// `ItemsApi` over HTTP. Every request carries the current session's token as
/// a bearer credential; without a session the header is sent empty and the
/// server decides.
#[derive(Debug, Clone)]
pub struct HttpItemsApi {
    http: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl HttpItemsApi {
    pub fn new(endpoint: &str, session: SessionHandle) -> Result<Self, ApiError> {
        let base_url = Url::parse(endpoint).map_err(|e| ApiError::Endpoint(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Endpoint(format!("{endpoint} cannot be a base URL")));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        })
    }

    fn url(&self, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::Endpoint(self.base_url.to_string()))?;
            segments.pop_if_empty().push(CRUD_PATH);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&Item>,
    ) -> Result<reqwest::Response, ApiError> {
        let token = self.session.bearer_token().await.unwrap_or_default();
        let mut request = self
            .http
            .request(method.clone(), self.url(id)?)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        debug!(%method, status = %response.status(), "API response");

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
            status => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .map(|body| body.message)
                    .unwrap_or(text);
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&Item>,
    ) -> Result<T, ApiError> {
        let bytes = self.send(method, id, body).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ItemsApi for HttpItemsApi {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Item>, ApiError> {
        self.send_json(Method::GET, None, None).await
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Item>, ApiError> {
        self.send_json(Method::GET, Some(id), None).await
    }

    #[instrument(skip(self, item))]
    async fn create(&self, item: &Item) -> Result<Item, ApiError> {
        self.send_json(Method::POST, None, Some(item)).await
    }

    #[instrument(skip(self, item))]
    async fn update(&self, id: &str, item: &Item) -> Result<Item, ApiError> {
        self.send_json(Method::PUT, Some(id), Some(item)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, Some(id), None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_collection_and_item_urls() {
        let api = HttpItemsApi::new("https://api.example.com/prod/", SessionHandle::new()).unwrap();
        assert_eq!(
            api.url(None).unwrap().as_str(),
            "https://api.example.com/prod/crud"
        );
        assert_eq!(
            api.url(Some("a b")).unwrap().as_str(),
            "https://api.example.com/prod/crud/a%20b"
        );
    }

    #[test]
    fn rejects_unusable_endpoints() {
        assert!(HttpItemsApi::new("not a url", SessionHandle::new()).is_err());
        assert!(HttpItemsApi::new("mailto:ops@example.com", SessionHandle::new()).is_err());
    }
}

use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder};
use thiserror::Error;
use url::Url;

use super::models::{AuthMode, ErrorEnvelope, ItemResponse, PortalConfig};
use super::traits::{ItemContent, PortalSource};
use crate::domain::ItemDescriptor;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Portal returned error {code}: {message}")]
    ApiError { code: i32, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid portal address: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Client for the portal's item content endpoints.
#[derive(Clone)]
pub struct PortalClient {
    config: PortalConfig,
    http: Client,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    /// `{portal}/sharing/rest/content/items/{id}[/{suffix}]`
    fn item_url(&self, suffix: Option<&str>) -> Result<Url> {
        let mut url = self.config.portal_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.config.portal_url.to_string()))?;
            segments
                .pop_if_empty()
                .extend(["sharing", "rest", "content", "items"])
                .push(&self.config.item_id);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.auth {
            AuthMode::None => request,
            AuthMode::Token { token } => request.query(&[("token", token)]),
            AuthMode::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }

    /// Fetch the item descriptor, including its modification time
    pub async fn fetch_item(&self) -> Result<ItemDescriptor> {
        let url = self.item_url(None)?;
        tracing::debug!(%url, "Fetching portal item");

        let response = self
            .authorize(self.http.get(url).query(&[("f", "json")]))
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_item(&body)
    }

    /// Open the item's binary content as a stream
    /// Returns the announced length (if any) with the stream
    pub async fn fetch_content(&self) -> Result<ItemContent> {
        let url = self.item_url(Some("data"))?;
        tracing::debug!(%url, "Requesting item data");

        let response = self
            .authorize(self.http.get(url))
            .send()
            .await?
            .error_for_status()?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        // A JSON body on the data endpoint is an error envelope, not a package
        if is_json {
            let body = response.text().await?;
            return Err(error_from_body(&body)
                .unwrap_or_else(|| ApiError::InvalidResponse("unexpected JSON body".to_string())));
        }

        let length = response.content_length();
        let stream = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok(ItemContent { length, stream })
    }
}

impl PortalSource for PortalClient {
    async fn fetch_item(&self) -> Result<ItemDescriptor> {
        PortalClient::fetch_item(self).await
    }

    async fn fetch_content(&self) -> Result<ItemContent> {
        PortalClient::fetch_content(self).await
    }
}

fn error_from_body(body: &str) -> Option<ApiError> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| ApiError::ApiError {
            code: envelope.error.code,
            message: envelope.error.message,
        })
}

fn parse_item(body: &str) -> Result<ItemDescriptor> {
    if let Some(err) = error_from_body(body) {
        return Err(err);
    }

    let item: ItemResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

    Ok(item.into())
}

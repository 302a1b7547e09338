//! HTTP plumbing shared by the remote feeds

use crate::error::{FeedError, FeedResult};
use crate::sources::Credentials;
use futures_util::StreamExt;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use url::Url;

/// HTTP client bound to one source's credentials
#[derive(Clone)]
pub struct FeedHttp {
    client: reqwest::Client,
    credentials: Option<Credentials>,
}

impl FeedHttp {
    pub fn new(client: reqwest::Client, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Send a request, retrying once with Basic auth when challenged
    pub async fn send(&self, method: Method, url: &Url) -> FeedResult<Response> {
        let response = self.client.request(method.clone(), url.clone()).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(credentials) = &self.credentials {
                debug!(url = %url, "Feed requires authentication, retrying with credentials");
                return Ok(self
                    .client
                    .request(method, url.clone())
                    .basic_auth(&credentials.username, Some(&credentials.password))
                    .send()
                    .await?);
            }
        }

        Ok(response)
    }

    /// GET a JSON document; `None` when the resource does not exist
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> FeedResult<Option<T>> {
        let response = self.send(Method::GET, url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FeedError::status(url.as_str(), response.status()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| FeedError::protocol(url.as_str(), e.to_string()))
    }

    /// GET a text document; `None` when the resource does not exist
    pub async fn get_text(&self, url: &Url) -> FeedResult<Option<String>> {
        let response = self.send(Method::GET, url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FeedError::status(url.as_str(), response.status()));
        }
        Ok(Some(response.text().await?))
    }

    /// Content type of a successful response to `method`, if any
    pub async fn content_type(&self, method: Method, url: &Url) -> Option<String> {
        match self.send(method.clone(), url).await {
            Ok(response) if response.status().is_success() => Some(
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string(),
            ),
            Ok(response) => {
                debug!(url = %url, method = %method, status = %response.status(), "Protocol probe failed");
                None
            }
            Err(err) => {
                debug!(url = %url, method = %method, error = %err, "Protocol probe failed");
                None
            }
        }
    }

    /// Stream a resource into `destination`
    pub async fn download_to(&self, url: &Url, destination: &Path) -> FeedResult<u64> {
        let response = self.send(Method::GET, url).await?;
        if !response.status().is_success() {
            return Err(FeedError::status(url.as_str(), response.status()));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk: bytes::Bytes = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url = %url, destination = %destination.display(), bytes = written, "Downloaded package");
        Ok(written)
    }
}

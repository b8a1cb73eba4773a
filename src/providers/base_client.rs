use crate::core::error::VtaiError;
use futures::stream::{BoxStream, StreamExt};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Retries applied to every request unless overridden at construction.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
/// Backoff stops doubling after this many retries (16x the base delay).
const MAX_BACKOFF_EXPONENT: u32 = 5;

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth_header: Option<(String, String)>,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(base_url: String, auth_header: Option<(String, String)>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.client.post(&url);

        if let Some((key, value)) = &self.auth_header {
            request = request.header(key, value);
        }
        request
    }

    /// POSTs a JSON payload, retrying transport failures, 429 and 5xx responses.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, VtaiError> {
        self.send_with_retry(path, || Ok(self.request(path).json(payload)))
            .await
    }

    /// POSTs a multipart form, rebuilt for every attempt since it cannot be cloned.
    pub async fn post_multipart<F>(
        &self,
        path: &str,
        build_form: F,
    ) -> Result<Response, VtaiError>
    where
        F: Fn() -> Result<Form, VtaiError>,
    {
        self.send_with_retry(path, || Ok(self.request(path).multipart(build_form()?)))
            .await
    }

    async fn send_with_retry<F>(&self, path: &str, build: F) -> Result<Response, VtaiError>
    where
        F: Fn() -> Result<RequestBuilder, VtaiError>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match build()?.send().await {
                Ok(response) => check_status(response).await,
                Err(e) => Err(VtaiError::from(e)),
            };

            match outcome {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    tracing::warn!(path, attempt, error = %e, "retrying provider request");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Turns a server-sent-events response into a stream of parsed text chunks.
    ///
    /// Bytes are buffered until a full line is available so that events split
    /// across network reads are parsed whole. Chunk order is preserved.
    pub fn stream_response<F>(
        &self,
        response: Response,
        parser: F,
    ) -> BoxStream<'static, Result<String, VtaiError>>
    where
        F: Fn(String) -> Result<Option<String>, VtaiError> + Send + Sync + 'static,
    {
        let mut pending: Vec<u8> = Vec::new();

        response
            .bytes_stream()
            .map(move |item| -> Result<Option<String>, VtaiError> {
                let chunk = item?;
                pending.extend_from_slice(&chunk);
                match pending.iter().rposition(|b| *b == b'\n') {
                    Some(idx) => {
                        let complete: Vec<u8> = pending.drain(..=idx).collect();
                        parser(String::from_utf8_lossy(&complete).into_owned())
                    }
                    None => Ok(None),
                }
            })
            .filter_map(|res| async move {
                match res {
                    Ok(Some(text)) => Some(Ok(text)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed()
    }

    /// Streams the raw response body.
    pub fn stream_bytes(
        &self,
        response: Response,
    ) -> BoxStream<'static, Result<Vec<u8>, VtaiError>> {
        response
            .bytes_stream()
            .map(|item| item.map(|chunk| chunk.to_vec()).map_err(VtaiError::from))
            .boxed()
    }
}

/// Delay before the given retry (1-based), doubling up to a fixed ceiling.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    RETRY_BASE_DELAY * 2u32.pow(exponent)
}

async fn check_status(response: Response) -> Result<Response, VtaiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{} {}", status, body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(VtaiError::Network(message))
    } else {
        Err(VtaiError::Api(message))
    }
}

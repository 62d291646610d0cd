//! Authenticated request wrapper shared by every endpoint.

use std::sync::Arc;
use std::time::Duration;

use aimg_core::request::SourceImage;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::ClientError;

/// Longest raw body kept in a [`ClientError::NonJson`].
const MAX_ERROR_BODY: usize = 512;

/// Source of the bearer token, told when the backend rejects it.
pub trait CredentialSink: Send + Sync {
    fn token(&self) -> Option<String>;

    /// The backend answered HTTP 401 to an authenticated call.
    fn invalidate(&self);
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Request body. The encoding follows the variant.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        image: SourceImage,
    },
}

/// Owned multipart form, converted to a [`reqwest::multipart::Form`] at
/// send time so it can be inspected and cloned beforehand.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, image: SourceImage) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            image,
        });
        self
    }

    /// Value of the first text field called `name`.
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .map(|part| match part {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    fn into_reqwest(self) -> Result<reqwest::multipart::Form, ClientError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File { name, image } => {
                    let part = reqwest::multipart::Part::bytes(image.bytes)
                        .file_name(image.file_name)
                        .mime_str(&image.mime_type)?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A parsed JSON response with its status.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: StatusCode,
    pub body: Value,
}

impl JsonReply {
    /// The backend's `error` (or `message`) field, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .or_else(|| self.body.get("message").and_then(Value::as_str))
    }
}

/// HTTP client for the console backend.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSink>,
}

impl Transport {
    /// Create a transport with its own [`reqwest::Client`].
    ///
    /// * `base_url` - Backend root, e.g. `http://127.0.0.1:5000`.
    /// * `timeout` - Per-request timeout; the only cancellation there is.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Arc<dyn CredentialSink>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, credentials))
    }

    /// Create a transport reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSink>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path or an already absolute URL.
    pub fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Send an authenticated request.
    ///
    /// Returns `Ok(None)` when the backend answered 401; the credential sink
    /// has been invalidated by then. Any other status with a JSON body is
    /// returned as-is for the caller to inspect.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Body,
    ) -> Result<Option<JsonReply>, ClientError> {
        let mut builder = self.client.request(method.clone(), self.url(endpoint));
        if let Some(token) = self.credentials.token() {
            builder = builder.bearer_auth(token);
        }
        let response = Self::attach(builder, body)?.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%method, endpoint, "Session rejected by backend");
            self.credentials.invalidate();
            return Ok(None);
        }

        let reply = Self::read_json(response).await?;
        tracing::debug!(%method, endpoint, status = reply.status.as_u16(), "Request completed");
        Ok(Some(reply))
    }

    /// Send a request without credentials. A 401 is returned like any other
    /// status and does not touch the session.
    pub async fn send_anonymous(
        &self,
        method: Method,
        endpoint: &str,
        body: Body,
    ) -> Result<JsonReply, ClientError> {
        let builder = self.client.request(method, self.url(endpoint));
        let response = Self::attach(builder, body)?.send().await?;
        Self::read_json(response).await
    }

    /// Download raw bytes, e.g. a generated image.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let mut builder = self.client.get(self.url(url));
        if let Some(token) = self.credentials.token() {
            builder = builder.bearer_auth(token);
        }
        let response = Self::ensure_success(builder.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn attach(
        builder: reqwest::RequestBuilder,
        body: Body,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        Ok(match body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form.into_reqwest()?),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<JsonReply, ClientError> {
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(body) => Ok(JsonReply { status, body }),
            Err(_) => Err(ClientError::NonJson {
                status: status.as_u16(),
                body: truncate(text),
            }),
        }
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ClientError::Backend`] carrying the body.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Backend {
                status: status.as_u16(),
                message: truncate(body),
            });
        }
        Ok(response)
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

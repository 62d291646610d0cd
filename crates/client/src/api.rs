//! Typed wrappers for the console REST endpoints.
//!
//! Every authenticated call returns `Ok(None)` when the session was rejected
//! (see [`Transport::send`]); callers show a re-authentication prompt
//! instead of a failure in that case.

use aimg_core::backend_config::BackendConfig;
use aimg_core::catalog::StatusResponse;
use aimg_core::request::{
    format_number, GenerationRequest, Image2ImageParams, SourceImage, Text2ImageParams,
};
use aimg_core::result::GenerationResult;
use aimg_core::session::{AuthResponse, Credentials};
use aimg_core::workflow::{ActionResponse, WorkflowIndex};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;
use crate::transport::{Body, JsonReply, MultipartForm, Transport};

/// Outcome of a login or registration attempt.
#[derive(Debug, Clone)]
pub struct AuthReply {
    /// The backend answered with a 2xx status.
    pub accepted: bool,
    pub response: AuthResponse,
}

/// Typed client for the console backend.
#[derive(Clone)]
pub struct ConsoleApi {
    transport: Transport,
}

impl ConsoleApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    // ---- session ----

    /// `POST /api/login`, sent without credentials.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthReply, ClientError> {
        self.authenticate("/api/login", credentials).await
    }

    /// `POST /api/register`, sent without credentials.
    pub async fn register(&self, credentials: &Credentials) -> Result<AuthReply, ClientError> {
        self.authenticate("/api/register", credentials).await
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        credentials: &Credentials,
    ) -> Result<AuthReply, ClientError> {
        let body = Body::Json(serde_json::to_value(credentials)?);
        let reply = self
            .transport
            .send_anonymous(Method::POST, endpoint, body)
            .await?;
        Ok(AuthReply {
            accepted: reply.status.is_success(),
            response: serde_json::from_value(reply.body)?,
        })
    }

    // ---- status ----

    /// `GET /api/status`: server health plus the resource catalog.
    pub async fn status(&self) -> Result<Option<StatusResponse>, ClientError> {
        let reply = self.transport.send(Method::GET, "/api/status", Body::Empty).await?;
        reply.map(require_success).transpose()
    }

    // ---- generation ----

    /// Submit a validated request to the endpoint matching its mode.
    ///
    /// A non-2xx JSON answer is decoded into a result with `success: false`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Option<GenerationResult>, ClientError> {
        match request {
            GenerationRequest::Text2Image(params) => self.text_to_image(params).await,
            GenerationRequest::Image2Image { params, image } => {
                self.image_to_image(params, image).await
            }
        }
    }

    /// `POST /api/aimg` with a JSON body.
    pub async fn text_to_image(
        &self,
        params: &Text2ImageParams,
    ) -> Result<Option<GenerationResult>, ClientError> {
        let body = Body::Json(serde_json::to_value(params)?);
        let reply = self.transport.send(Method::POST, "/api/aimg", body).await?;
        reply.map(decode_result).transpose()
    }

    /// `POST /api/img2img` with a multipart body.
    pub async fn image_to_image(
        &self,
        params: &Image2ImageParams,
        image: &SourceImage,
    ) -> Result<Option<GenerationResult>, ClientError> {
        let form = image_to_image_form(params, image)?;
        let reply = self
            .transport
            .send(Method::POST, "/api/img2img", Body::Multipart(form))
            .await?;
        reply.map(decode_result).transpose()
    }

    /// Download one generated image.
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.transport.fetch_bytes(url).await
    }

    // ---- configuration ----

    /// `GET /api/config`.
    pub async fn get_config(&self) -> Result<Option<BackendConfig>, ClientError> {
        let reply = self.transport.send(Method::GET, "/api/config", Body::Empty).await?;
        reply.map(require_success).transpose()
    }

    /// `POST /api/config` with the full configuration object.
    pub async fn save_config(
        &self,
        config: &BackendConfig,
    ) -> Result<Option<ActionResponse>, ClientError> {
        let body = Body::Json(serde_json::to_value(config)?);
        let reply = self.transport.send(Method::POST, "/api/config", body).await?;
        reply.map(decode_action).transpose()
    }

    // ---- workflows ----

    /// `GET /api/workflows`: prefix → metadata.
    pub async fn list_workflows(&self) -> Result<Option<WorkflowIndex>, ClientError> {
        let reply = self
            .transport
            .send(Method::GET, "/api/workflows", Body::Empty)
            .await?;
        reply.map(require_success).transpose()
    }

    /// `GET /api/workflow/{prefix}`: the full workflow document.
    pub async fn get_workflow(&self, prefix: &str) -> Result<Option<Value>, ClientError> {
        let endpoint = format!("/api/workflow/{prefix}");
        let reply = self.transport.send(Method::GET, &endpoint, Body::Empty).await?;
        reply.map(require_success).transpose()
    }

    /// `DELETE /api/workflow/{prefix}`.
    pub async fn delete_workflow(
        &self,
        prefix: &str,
    ) -> Result<Option<ActionResponse>, ClientError> {
        let endpoint = format!("/api/workflow/{prefix}");
        let reply = self
            .transport
            .send(Method::DELETE, &endpoint, Body::Empty)
            .await?;
        reply.map(decode_action).transpose()
    }

    /// `POST /api/workflow` with the full workflow document.
    pub async fn save_workflow(
        &self,
        workflow: &Value,
    ) -> Result<Option<ActionResponse>, ClientError> {
        let reply = self
            .transport
            .send(Method::POST, "/api/workflow", Body::Json(workflow.clone()))
            .await?;
        reply.map(decode_action).transpose()
    }
}

/// Multipart layout of an image-to-image submission: the `image` file,
/// scalar fields as text, and the LoRA list JSON-encoded under `lora`.
/// Unset model, sampler and scheduler are left out.
pub fn image_to_image_form(
    params: &Image2ImageParams,
    image: &SourceImage,
) -> Result<MultipartForm, ClientError> {
    let common = &params.common;
    let mut form = MultipartForm::new()
        .file("image", image.clone())
        .text("prompt", common.prompt.clone())
        .text("denoise", format_number(params.denoise))
        .text("batch_size", common.batch_size.to_string())
        .text("seed", common.seed.to_string());

    for (name, value) in [
        ("model", &common.model),
        ("sampler", &common.sampler),
        ("scheduler", &common.scheduler),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            form = form.text(name, value);
        }
    }

    Ok(form.text("lora", serde_json::to_string(&common.loras)?))
}

/// Decode a 2xx body, or turn anything else into [`ClientError::Backend`].
fn require_success<T: DeserializeOwned>(reply: JsonReply) -> Result<T, ClientError> {
    if !reply.status.is_success() {
        return Err(ClientError::Backend {
            status: reply.status.as_u16(),
            message: reply
                .error_message()
                .unwrap_or("Request failed")
                .to_string(),
        });
    }
    Ok(serde_json::from_value(reply.body)?)
}

fn decode_result(reply: JsonReply) -> Result<GenerationResult, ClientError> {
    let mut result: GenerationResult = serde_json::from_value(reply.body)?;
    if !reply.status.is_success() {
        result.success = false;
    }
    Ok(result)
}

fn decode_action(reply: JsonReply) -> Result<ActionResponse, ClientError> {
    let mut action: ActionResponse = serde_json::from_value(reply.body)?;
    if !reply.status.is_success() {
        action.success = false;
    }
    Ok(action)
}

use std::future::Future;

use reqwest::{
    Client,
    multipart::{Form, Part},
};
use url::Url;

use crate::config::WebhookTargets;
use crate::error::GenerationError;
use crate::media;
use crate::url_validation::validate_http_url;

use super::request::{GenerationRequest, ImageReference, JobKind};
use super::response::{WebhookImage, WebhookResponse};

/// Starts one remote generation job per dispatched request.
///
/// Split in two so callers can observe the moment the job leaves the process.
/// Nothing here retries and no idempotency key is sent: dispatching the same
/// request twice enqueues two jobs.
pub trait JobTrigger: Send + Sync {
    type Job: Send;

    /// Resolves the target and assembles the payload, fetching URL references.
    fn prepare(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Self::Job, GenerationError>> + Send;

    /// Sends the job and waits for the workflow's answer.
    fn dispatch(
        &self,
        job: Self::Job,
    ) -> impl Future<Output = Result<Vec<WebhookImage>, GenerationError>> + Send;
}

pub struct PreparedJob {
    target: Url,
    kind: JobKind,
    form: Form,
}

enum Attachment {
    Binary {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    Link(String),
}

impl Attachment {
    fn attach(self, form: Form, binary_field: String, link_field: String) -> Result<Form, GenerationError> {
        match self {
            Attachment::Binary {
                file_name,
                content_type,
                bytes,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&content_type)
                    .map_err(|err| {
                        GenerationError::InvalidRequest(format!("invalid content type {content_type}: {err}"))
                    })?;
                Ok(form.part(binary_field, part))
            }
            Attachment::Link(url) => Ok(form.text(link_field, url)),
        }
    }
}

#[derive(Clone)]
pub struct WebhookClient {
    http: Client,
    targets: WebhookTargets,
}

impl WebhookClient {
    pub fn new(http: Client, targets: WebhookTargets) -> Self {
        Self { http, targets }
    }

    /// Per-request override first, then the configured default for the job kind.
    pub fn resolve_target(&self, request: &GenerationRequest) -> Result<Url, GenerationError> {
        let raw = request
            .webhook_override
            .as_deref()
            .or_else(|| self.targets.for_kind(request.kind))
            .ok_or_else(|| {
                GenerationError::Config(
                    "Webhook URL not configured. Add it in Settings or set the WEBHOOK_*_URL environment variable."
                        .to_string(),
                )
            })?;
        validate_http_url(raw).map_err(|err| GenerationError::Config(format!("Webhook URL {err}")))
    }

    /// Prepares and dispatches in one go.
    pub async fn trigger(&self, request: &GenerationRequest) -> Result<Vec<WebhookImage>, GenerationError> {
        let job = self.prepare(request).await?;
        self.dispatch(job).await
    }

    async fn resolve_reference(&self, reference: &ImageReference, fallback_name: &str) -> Attachment {
        match reference {
            ImageReference::Upload {
                file_name,
                content_type,
                bytes,
            } => Attachment::Binary {
                file_name: if file_name.is_empty() {
                    fallback_name.to_string()
                } else {
                    file_name.clone()
                },
                content_type: media::resolve_mime_type(content_type.as_deref(), bytes, Some(file_name)),
                bytes: bytes.clone(),
            },
            ImageReference::Url(url) => match self.fetch_reference(url).await {
                Ok((content_type, bytes)) => {
                    tracing::info!("Fetched reference image {} ({} bytes)", url, bytes.len());
                    Attachment::Binary {
                        file_name: fallback_name.to_string(),
                        content_type: media::resolve_mime_type(content_type.as_deref(), &bytes, None),
                        bytes,
                    }
                }
                Err(err) => {
                    tracing::warn!("Could not fetch reference image {}: {}. Forwarding the URL", url, err);
                    Attachment::Link(url.clone())
                }
            },
        }
    }

    async fn fetch_reference(&self, url: &str) -> Result<(Option<String>, Vec<u8>), GenerationError> {
        let url = validate_http_url(url).map_err(GenerationError::InvalidRequest)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::remote(Some(status.as_u16()), "reference fetch failed"));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;
        Ok((content_type, bytes.to_vec()))
    }

    async fn single_form(&self, request: &GenerationRequest) -> Result<Form, GenerationError> {
        let mut form = Form::new()
            .text("prompt", request.full_prompt())
            .text("raw_prompt", request.prompt.clone())
            .text("style_preset", request.style_preset.clone())
            .text("style_suffix", request.style_suffix.clone())
            .text("width", request.width.to_string())
            .text("height", request.height.to_string())
            .text("creativity", request.creativity.to_string())
            .text("variations", request.variation_count.to_string())
            .text("image_count", request.references.len().to_string());

        for (index, reference) in request.references.iter().enumerate() {
            let slot = index + 1;
            let attachment = self
                .resolve_reference(reference, &format!("reference_image_{slot}.png"))
                .await;
            form = attachment.attach(form, format!("image{slot}"), format!("image_url{slot}"))?;
        }
        Ok(form)
    }

    async fn batch_form(&self, request: &GenerationRequest) -> Result<Form, GenerationError> {
        let reference = request.references.first().ok_or_else(|| {
            GenerationError::InvalidRequest("Batch generation needs a product image".to_string())
        })?;
        let attachment = self.resolve_reference(reference, "product_image.png").await;

        let form = Form::new()
            .text("raw_description", request.prompt.clone())
            .text("extra_prompt", request.extra_prompt.clone())
            .text("style_preset", request.style_preset.clone())
            .text("style_suffix", request.style_suffix.clone())
            .text("width", request.width.to_string())
            .text("height", request.height.to_string())
            .text("creativity", request.creativity.to_string());
        attachment.attach(form, "image".to_string(), "image_url".to_string())
    }
}

impl JobTrigger for WebhookClient {
    type Job = PreparedJob;

    async fn prepare(&self, request: &GenerationRequest) -> Result<PreparedJob, GenerationError> {
        let target = self.resolve_target(request)?;
        let form = match request.kind {
            JobKind::Single => self.single_form(request).await?,
            JobKind::Batch => self.batch_form(request).await?,
        };
        Ok(PreparedJob {
            target,
            kind: request.kind,
            form,
        })
    }

    async fn dispatch(&self, job: PreparedJob) -> Result<Vec<WebhookImage>, GenerationError> {
        tracing::info!("Triggering {:?} workflow at {}", job.kind, job.target);
        let response = self.http.post(job.target).multipart(job.form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::info!("Workflow responded with {}", status);

        if !status.is_success() {
            return Err(GenerationError::remote(Some(status.as_u16()), body));
        }

        let images = WebhookResponse::parse(&body)?.into_images();
        tracing::info!("Workflow reported {} images", images.len());
        Ok(images)
    }
}

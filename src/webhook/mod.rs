//! Client for the external image-generation workflow, invoked over a webhook.

pub mod client;
pub mod request;
pub mod response;

pub use client::{JobTrigger, PreparedJob, WebhookClient};
pub use request::{
    BATCH_IMAGE_COUNT, GenerationRequest, ImageReference, JobKind, MAX_REFERENCE_SLOTS,
    RequestDraft,
};
pub use response::{WebhookImage, WebhookResponse};

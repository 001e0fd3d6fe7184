//! Direct webhook triggers. These fire the job and hand back whatever the
//! workflow reported, without any bucket reconciliation.

use axum::{
    Json,
    extract::{Multipart, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::{GenerationError, Result};
use crate::session::state::CHECK_STORAGE_NOTICE;
use crate::webhook::{GenerationRequest, JobKind, WebhookImage};

use super::form;

#[derive(Serialize)]
struct TriggerResponse {
    success: bool,
    count: usize,
    images: Vec<WebhookImage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AcknowledgedResponse {
    success: bool,
    message: &'static str,
    raw_response: String,
}

async fn trigger(state: &AppState, request: GenerationRequest) -> Result<Response> {
    let config = state.session_config().await?;
    match state.webhook_client(&config).trigger(&request).await {
        Ok(images) => Ok(Json(TriggerResponse {
            success: true,
            count: images.len(),
            images,
        })
        .into_response()),
        Err(GenerationError::Parse(excerpt)) => {
            tracing::warn!("Workflow response was not JSON: {}", excerpt);
            Ok(Json(AcknowledgedResponse {
                success: true,
                message: CHECK_STORAGE_NOTICE,
                raw_response: excerpt,
            })
            .into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn trigger_single(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let request = form::read_draft(multipart).await?.build(JobKind::Single)?;
    trigger(&state, request).await
}

pub async fn trigger_batch(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let request = form::read_draft(multipart).await?.build(JobKind::Batch)?;
    trigger(&state, request).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::post};

    use crate::app::AppState;
    use crate::web::router;
    use crate::web::test_support::{multipart_body, multipart_request, send};

    async fn spawn_workflow(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route("/hook", post(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{address}/hook")
    }

    #[tokio::test]
    async fn normalized_images_are_returned() {
        let hook = spawn_workflow(
            StatusCode::OK,
            r#"[{"Location": "https://x/a.png", "Key": "a.png"}]"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body(&[("prompt", "desk lamp"), ("webhook_url", hook.as_str())]);

        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            multipart_request("/api/trigger/single", body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["images"][0]["url"], "https://x/a.png");
        assert_eq!(json["images"][0]["name"], "a.png");
    }

    #[tokio::test]
    async fn plain_text_reply_is_acknowledged() {
        let hook = spawn_workflow(StatusCode::OK, "Workflow was started").await;
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body(&[("prompt", "desk lamp"), ("webhook_url", hook.as_str())]);

        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            multipart_request("/api/trigger/single", body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["rawResponse"], "Workflow was started");
        assert_eq!(json["message"], "Workflow triggered, check storage for images");
    }

    #[tokio::test]
    async fn long_plain_text_reply_is_cut_to_its_first_hundred_chars() {
        const REPLY: &str = "Workflow was started. Images are rendered in the background and uploaded \
            to the configured bucket once every variation has finished.";
        let hook = spawn_workflow(StatusCode::OK, REPLY).await;
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body(&[("prompt", "desk lamp"), ("webhook_url", hook.as_str())]);

        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            multipart_request("/api/trigger/single", body),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let expected: String = REPLY.chars().take(100).collect();
        assert!(REPLY.chars().count() > 100);
        assert_eq!(json["rawResponse"], expected.as_str());
    }

    #[tokio::test]
    async fn workflow_failure_is_a_bad_gateway() {
        let hook = spawn_workflow(StatusCode::INTERNAL_SERVER_ERROR, "exploded").await;
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body(&[
            ("description", "desk lamp"),
            ("image_url", "http://127.0.0.1:9/missing.png"),
            ("webhook_url", hook.as_str()),
        ]);

        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            multipart_request("/api/trigger/batch", body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["status"], 500);
        assert!(json["message"].as_str().unwrap().contains("exploded"));
    }

    #[tokio::test]
    async fn batch_without_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = multipart_body(&[("description", "desk lamp")]);

        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            multipart_request("/api/trigger/batch", body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_request");
    }
}

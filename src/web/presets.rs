use axum::Json;
use serde::Serialize;

use crate::presets::{ASPECT_PRESETS, STYLE_PRESETS, StylePreset, aspect_size};

#[derive(Serialize)]
pub struct SizePreset {
    id: &'static str,
    width: u32,
    height: u32,
}

#[derive(Serialize)]
pub struct PresetsResponse {
    styles: &'static [StylePreset],
    sizes: Vec<SizePreset>,
}

pub async fn list_presets() -> Json<PresetsResponse> {
    let sizes = ASPECT_PRESETS
        .iter()
        .filter_map(|&id| aspect_size(id).map(|(width, height)| SizePreset { id, width, height }))
        .collect();
    Json(PresetsResponse {
        styles: &STYLE_PRESETS,
        sizes,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::app::AppState;
    use crate::web::router;
    use crate::web::test_support::{empty_request, send};

    #[tokio::test]
    async fn presets_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            router(AppState::for_tests(dir.path())),
            empty_request("GET", "/api/presets"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["styles"][0]["id"], "ecommerce");
        assert_eq!(json["styles"].as_array().unwrap().len(), 7);
        assert_eq!(json["sizes"][3], serde_json::json!({"id": "16:9", "width": 1024, "height": 576}));
    }
}

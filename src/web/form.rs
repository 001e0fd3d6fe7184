//! Multipart form decoding into a [`RequestDraft`].

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::extract::Multipart;

use crate::error::GenerationError;
use crate::webhook::{ImageReference, MAX_REFERENCE_SLOTS, RequestDraft};

fn invalid(message: impl Into<String>) -> GenerationError {
    GenerationError::InvalidRequest(message.into())
}

/// Reference slot encoded in a field name: `image` is slot 1, `image2` slot 2.
fn reference_slot(name: &str, base: &str) -> Option<Result<usize, GenerationError>> {
    let rest = name.strip_prefix(base)?;
    if rest.is_empty() {
        return Some(Ok(1));
    }
    let slot: usize = rest.parse().ok()?;
    Some(if (1..=MAX_REFERENCE_SLOTS).contains(&slot) {
        Ok(slot)
    } else {
        Err(invalid(format!(
            "{name}: reference slots run from 1 to {MAX_REFERENCE_SLOTS}"
        )))
    })
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<Option<T>, GenerationError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| invalid(format!("{name} must be a number, got {value:?}")))
}

/// Reads every field of a generation form. Uploads win over URLs for the same slot.
pub async fn read_draft(mut multipart: Multipart) -> Result<RequestDraft, GenerationError> {
    let mut draft = RequestDraft::default();
    let mut uploads: BTreeMap<usize, ImageReference> = BTreeMap::new();
    let mut links: BTreeMap<usize, String> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| invalid(format!("invalid multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(slot) = reference_slot(&name, "image") {
            let slot = slot?;
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|err| invalid(format!("failed to read {name}: {err}")))?;
            if !bytes.is_empty() {
                uploads.insert(
                    slot,
                    ImageReference::Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    },
                );
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|err| invalid(format!("failed to read {name}: {err}")))?;

        if let Some(slot) = reference_slot(&name, "image_url") {
            let value = value.trim();
            if !value.is_empty() {
                links.insert(slot?, value.to_string());
            }
            continue;
        }

        match name.as_str() {
            "prompt" | "description" | "raw_description" => draft.prompt = Some(value),
            "extra_prompt" => draft.extra_prompt = Some(value),
            "style_preset" => draft.style_preset = Some(value),
            "style_suffix" | "custom_style" => draft.style_suffix = Some(value),
            "size" => draft.size = Some(value),
            "width" => draft.width = parse_number(&name, &value)?,
            "height" => draft.height = parse_number(&name, &value)?,
            "creativity" => draft.creativity = parse_number(&name, &value)?,
            "variations" => draft.variations = parse_number(&name, &value)?,
            "webhook_url" => draft.webhook_url = Some(value),
            _ => tracing::debug!("Ignoring form field {}", name),
        }
    }

    for slot in 1..=MAX_REFERENCE_SLOTS {
        let reference = uploads
            .remove(&slot)
            .or_else(|| links.remove(&slot).map(ImageReference::Url));
        if let Some(reference) = reference {
            draft.references.push(reference);
        }
    }
    Ok(draft)
}

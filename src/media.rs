//! Content-type helpers for uploaded and proxied images.

use image::ImageFormat;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Sniffs the image format from magic bytes.
pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
}

pub fn mime_from_file_name(file_name: &str) -> Option<&'static str> {
    ImageFormat::from_path(file_name)
        .ok()
        .map(|format| format.to_mime_type())
}

pub fn extension_from_mime_type(mime_type: &str) -> &'static str {
    match mime_type.to_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        _ => "bin",
    }
}

/// Picks a content type: declared type if it is an image, then magic bytes,
/// then the file name, then PNG.
pub fn resolve_mime_type(declared: Option<&str>, bytes: &[u8], file_name: Option<&str>) -> String {
    declared
        .map(|value| value.split(';').next().unwrap_or(value).trim())
        .filter(|value| value.starts_with("image/"))
        .map(str::to_string)
        .or_else(|| detect_mime_type(bytes).map(str::to_string))
        .or_else(|| file_name.and_then(mime_from_file_name).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

use url::Url;

/// Accepts only absolute http(s) URLs.
pub fn validate_http_url(raw: &str) -> Result<Url, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("must not be empty".to_string());
    }
    let parsed = Url::parse(trimmed).map_err(|err| format!("is not a valid URL: {err}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(format!("must use http or https (got {scheme})")),
    }
}

//! Media-type validation for upload candidates.

use crate::UploadError;

/// Video container types the server accepts.
const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "video/mp4",
    "video/x-matroska",
    "video/webm",
    "video/quicktime",
    "video/x-msvideo",
    "video/mpeg",
];

/// Resolves and validates the media type of an upload candidate.
///
/// Uses the declared type when present; a missing or generic
/// (`application/octet-stream`) declaration falls back to a guess
/// derived from the filename extension. Fails with
/// [`UploadError::UnsupportedMediaType`] when the resolved type is not
/// in the allow-list, before any network traffic happens.
pub fn resolve_media_type(filename: &str, declared: Option<&str>) -> Result<String, UploadError> {
    let candidate = match declared {
        Some(t) if !t.is_empty() && t != "application/octet-stream" => t.to_string(),
        _ => mime_guess::from_path(filename)
            .first_raw()
            .unwrap_or_default()
            .to_string(),
    };

    if ALLOWED_MEDIA_TYPES.contains(&candidate.as_str()) {
        Ok(candidate)
    } else if candidate.is_empty() {
        Err(UploadError::UnsupportedMediaType(format!(
            "unknown type for {filename}"
        )))
    } else {
        Err(UploadError::UnsupportedMediaType(candidate))
    }
}

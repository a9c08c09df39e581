use serde::{Deserialize, Serialize};

/// Server-side processing state of an uploaded movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "PROCESSING")]
    Processing,
    #[serde(rename = "READY")]
    Ready,
    #[serde(rename = "FAILED")]
    Failed,
}

impl ProcessingState {
    /// Returns `true` for states the server never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingState::Ready | ProcessingState::Failed)
    }
}

/// Caller-supplied metadata sent with session initiation.
///
/// Two deployment variants share one session type: uploading a brand
/// new movie (title/description) or attaching the upload to a movie
/// record that already exists server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadMetadata {
    /// Create a new movie record from this upload.
    New {
        title: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        description: String,
    },
    /// Attach the upload to an existing movie record.
    #[serde(rename_all = "camelCase")]
    Existing { movie_id: String },
}

/// Client-side progress snapshot for an active upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub uploaded_chunks: u32,
    pub total_chunks: u32,
    /// Rounded percentage in `[0, 100]`.
    pub percentage: u8,
}

impl SessionProgress {
    /// Builds a snapshot, rounding `uploaded / total` to a whole percentage.
    pub fn new(uploaded_chunks: u32, total_chunks: u32) -> Self {
        let percentage = if total_chunks == 0 {
            0
        } else {
            (uploaded_chunks as f64 / total_chunks as f64 * 100.0).round() as u8
        };
        Self {
            uploaded_chunks,
            total_chunks,
            percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ProcessingState::Pending.is_terminal());
        assert!(!ProcessingState::Processing.is_terminal());
        assert!(ProcessingState::Ready.is_terminal());
        assert!(ProcessingState::Failed.is_terminal());
    }

    #[test]
    fn processing_state_wire_names() {
        let json = serde_json::to_string(&ProcessingState::Processing).unwrap();
        assert_eq!(json, r#""PROCESSING""#);
        let back: ProcessingState = serde_json::from_str(r#""READY""#).unwrap();
        assert_eq!(back, ProcessingState::Ready);
    }

    #[test]
    fn metadata_new_serializes_title() {
        let meta = UploadMetadata::New {
            title: "Big Buck Bunny".into(),
            description: String::new(),
        };
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(v["title"], "Big Buck Bunny");
        assert!(v.get("description").is_none());
    }

    #[test]
    fn metadata_existing_uses_camel_case() {
        let meta = UploadMetadata::Existing {
            movie_id: "m-42".into(),
        };
        let v = serde_json::to_value(&meta).unwrap();
        assert_eq!(v["movieId"], "m-42");
    }

    #[test]
    fn progress_rounding() {
        assert_eq!(SessionProgress::new(0, 3).percentage, 0);
        assert_eq!(SessionProgress::new(1, 3).percentage, 33);
        assert_eq!(SessionProgress::new(2, 3).percentage, 67);
        assert_eq!(SessionProgress::new(3, 3).percentage, 100);
    }

    #[test]
    fn progress_zero_total() {
        assert_eq!(SessionProgress::new(0, 0).percentage, 0);
    }
}

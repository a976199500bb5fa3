//! Attachment models

use serde::{Deserialize, Serialize};

/// Attachment category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    #[default]
    File,
}

impl AttachmentKind {
    /// Category implied by a MIME type.
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.split('/').next() {
            Some("image") => AttachmentKind::Image,
            Some("video") => AttachmentKind::Video,
            _ => AttachmentKind::File,
        }
    }
}

/// Uploaded file reference, sent along with outgoing messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, alias = "type")]
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(alias = "filename", alias = "file_name")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(
        default,
        alias = "mimeType",
        alias = "content_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub mime_type: Option<String>,
}

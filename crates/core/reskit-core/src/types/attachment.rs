//! Files attached to an outgoing message

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Accepted attachment kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// `.pdf`
    Pdf,
    /// `.png`, `.jpg`, `.jpeg`, `.gif`
    Image,
    /// `.txt`
    Text,
}

impl AttachmentKind {
    /// Classify a path by extension; `None` when the type is not accepted
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "gif" => Some(Self::Image),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }

    /// MIME type sent with the upload
    pub fn mime_for(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

/// An uploaded file waiting to be sent with the next message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Identifier assigned by the server on upload
    pub file_id: String,
    /// Local file name shown on the attachment card
    pub name: String,
    /// File kind
    pub kind: AttachmentKind,
}

/// A file ready to upload
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// File name sent in the multipart part
    pub file_name: String,
    /// MIME type of the part
    pub mime: String,
    /// File contents
    pub bytes: bytes::Bytes,
}

/// Response of `POST /api/upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    /// Status text
    #[serde(default)]
    pub message: Option<String>,
    /// Server-side file identifier
    pub filename: String,
}

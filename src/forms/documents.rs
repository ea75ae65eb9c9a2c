//! Patient document uploads.

use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};

use crate::services::documents::IncomingDocument;

#[derive(MultipartForm)]
pub struct UploadDocumentForm {
    // Hard ceiling; the configured `max_upload_mb` is checked by the service.
    #[multipart(limit = "100MB")]
    pub file: TempFile,
    pub kind: Text<String>,
    pub booking_id: Option<Text<i32>>,
}

impl UploadDocumentForm {
    pub fn incoming(&self) -> IncomingDocument<'_> {
        IncomingDocument {
            source: self.file.file.path(),
            file_name: self.file.file_name.as_deref(),
            content_type: self.file.content_type.as_ref().map(|mime| mime.essence_str()),
            size: self.file.size,
            kind: self.kind.as_str(),
            booking_id: self.booking_id.as_ref().map(|id| id.0).filter(|id| *id > 0),
        }
    }
}

//! Patient-uploaded documents (x-rays, photos, medical records).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::types::{BookingId, DocumentId, TypeConstraintError, UserId};

const MAX_FILE_NAME_LEN: usize = 100;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    XRay,
    Photo,
    MedicalRecord,
    Other,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::XRay => "x_ray",
            DocumentKind::Photo => "photo",
            DocumentKind::MedicalRecord => "medical_record",
            DocumentKind::Other => "other",
        }
    }
}

impl TryFrom<&str> for DocumentKind {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "x_ray" => Ok(DocumentKind::XRay),
            "photo" => Ok(DocumentKind::Photo),
            "medical_record" => Ok(DocumentKind::MedicalRecord),
            "other" => Ok(DocumentKind::Other),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown document kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub patient_id: UserId,
    pub booking_id: Option<BookingId>,
    pub kind: DocumentKind,
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewDocument {
    pub patient_id: UserId,
    pub booking_id: Option<BookingId>,
    pub kind: DocumentKind,
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl NewDocument {
    /// Builds the record for an upload, generating a collision-free stored name.
    pub fn try_new(
        patient_id: UserId,
        booking_id: Option<BookingId>,
        kind: DocumentKind,
        file_name: &str,
        content_type: Option<&str>,
        size_bytes: i64,
    ) -> Result<Self, TypeConstraintError> {
        let file_name = sanitize_file_name(file_name)?;
        if size_bytes <= 0 {
            return Err(TypeConstraintError::InvalidValue("empty upload".to_string()));
        }
        Ok(Self {
            patient_id,
            booking_id,
            kind,
            stored_name: format!("{}-{}", Uuid::new_v4(), file_name),
            file_name,
            content_type: content_type
                .unwrap_or("application/octet-stream")
                .to_string(),
            size_bytes,
        })
    }
}

/// Keeps the last path segment and maps anything outside `[A-Za-z0-9._-]` to `_`.
pub fn sanitize_file_name(raw: &str) -> Result<String, TypeConstraintError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        Err(TypeConstraintError::EmptyString)
    } else {
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd").unwrap(),
            "passwd".to_string()
        );
        assert_eq!(
            sanitize_file_name("C:\\scans\\my x-ray (1).png").unwrap(),
            "my_x-ray__1_.png"
        );
        assert_eq!(sanitize_file_name(".bashrc").unwrap(), "bashrc");
        assert!(sanitize_file_name("..").is_err());
        assert!(sanitize_file_name("  ").is_err());
    }

    #[test]
    fn stored_name_is_prefixed_with_uuid() {
        let doc = NewDocument::try_new(
            UserId::new(1).unwrap(),
            None,
            DocumentKind::XRay,
            "scan.png",
            Some("image/png"),
            1024,
        )
        .unwrap();
        assert!(doc.stored_name.ends_with("-scan.png"));
        assert_eq!(doc.stored_name.len(), 36 + 1 + "scan.png".len());
        assert_eq!(doc.file_name, "scan.png");
    }

    #[test]
    fn kind_parses() {
        assert_eq!(DocumentKind::try_from("x_ray"), Ok(DocumentKind::XRay));
        assert!(DocumentKind::try_from("video").is_err());
    }
}

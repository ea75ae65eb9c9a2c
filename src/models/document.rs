use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::document::{
    Document as DomainDocument, DocumentKind, NewDocument as DomainNewDocument,
};
use crate::domain::types::{BookingId, DocumentId, TypeConstraintError, UserId};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::documents)]
pub struct Document {
    pub id: i32,
    pub patient_id: i32,
    pub booking_id: Option<i32>,
    pub kind: String,
    pub file_name: String,
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::documents)]
pub struct NewDocument<'a> {
    pub patient_id: i32,
    pub booking_id: Option<i32>,
    pub kind: &'a str,
    pub file_name: &'a str,
    pub stored_name: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
}

impl TryFrom<Document> for DomainDocument {
    type Error = TypeConstraintError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DocumentId::new(document.id)?,
            patient_id: UserId::new(document.patient_id)?,
            booking_id: document.booking_id.map(BookingId::new).transpose()?,
            kind: DocumentKind::try_from(document.kind.as_str())?,
            file_name: document.file_name,
            stored_name: document.stored_name,
            content_type: document.content_type,
            size_bytes: document.size_bytes,
            created_at: document.created_at,
        })
    }
}

impl<'a> From<&'a DomainNewDocument> for NewDocument<'a> {
    fn from(document: &'a DomainNewDocument) -> Self {
        Self {
            patient_id: document.patient_id.get(),
            booking_id: document.booking_id.map(BookingId::get),
            kind: document.kind.as_str(),
            file_name: document.file_name.as_str(),
            stored_name: document.stored_name.as_str(),
            content_type: document.content_type.as_str(),
            size_bytes: document.size_bytes,
        }
    }
}

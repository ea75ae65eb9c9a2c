//! Patient documents stored under the uploads directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::auth::{AuthenticatedUser, PATIENT_ROLE};
use crate::domain::document::{Document, DocumentKind, NewDocument};
use crate::domain::types::{BookingId, DocumentId, UserId};
use crate::repository::{
    BookingReader, ClinicReader, DocumentReader, DocumentWriter, UserReader, UserWriter,
};
use crate::services::users::{current_user, staff_clinics};
use crate::services::{ServiceError, ServiceResult, ensure_role};

/// Upload as received, detached from the multipart plumbing.
#[derive(Debug)]
pub struct IncomingDocument<'a> {
    pub source: &'a Path,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub size: usize,
    pub kind: &'a str,
    pub booking_id: Option<i32>,
}

/// Allows the patient, admins and staff of a clinic with a booking for the patient.
pub fn ensure_patient_record_access<R>(
    repo: &R,
    user: &AuthenticatedUser,
    patient_id: UserId,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + ?Sized,
{
    if user.is_admin() || current_user(repo, user)?.id == patient_id {
        return Ok(());
    }
    let (_, clinics) = staff_clinics(repo, user).map_err(|_| ServiceError::NotFound)?;
    let clinic_ids: Vec<_> = clinics.iter().map(|clinic| clinic.id).collect();
    if !clinic_ids.is_empty() && repo.clinic_has_patient(&clinic_ids, patient_id)? {
        Ok(())
    } else {
        Err(ServiceError::NotFound)
    }
}

fn stored_path(uploads_dir: &Path, document: &Document) -> PathBuf {
    uploads_dir.join(&document.stored_name)
}

/// Stores an upload of the signed-in patient.
pub fn upload_document<R>(
    repo: &R,
    user: &AuthenticatedUser,
    uploads_dir: &Path,
    max_bytes: usize,
    incoming: IncomingDocument<'_>,
) -> ServiceResult<Document>
where
    R: UserReader + UserWriter + BookingReader + DocumentWriter + ?Sized,
{
    ensure_role(user, PATIENT_ROLE)?;
    if incoming.size > max_bytes {
        return Err(ServiceError::Form(format!(
            "Files are limited to {} MB.",
            max_bytes / (1024 * 1024)
        )));
    }
    let local = current_user(repo, user)?;
    let kind = DocumentKind::try_from(incoming.kind)?;

    let booking_id = match incoming.booking_id {
        Some(id) => {
            let booking = repo
                .get_booking_by_id(BookingId::new(id)?)?
                .filter(|booking| booking.patient_id == local.id)
                .ok_or(ServiceError::NotFound)?;
            Some(booking.id)
        }
        None => None,
    };

    let new_document = NewDocument::try_new(
        local.id,
        booking_id,
        kind,
        incoming.file_name.unwrap_or("upload"),
        incoming.content_type,
        i64::try_from(incoming.size).map_err(|err| ServiceError::Internal(err.to_string()))?,
    )?;

    let target = uploads_dir.join(&new_document.stored_name);
    fs::create_dir_all(uploads_dir)
        .and_then(|_| fs::copy(incoming.source, &target))
        .map_err(|err| {
            log::error!("Failed to store upload {}: {err}", target.display());
            ServiceError::Internal("could not store the file".to_string())
        })?;

    repo.create_document(&new_document).map_err(|err| {
        log::error!("Failed to save document record for {}: {err}", user.email);
        if let Err(io_err) = fs::remove_file(&target) {
            log::warn!("Orphaned upload {}: {io_err}", target.display());
        }
        ServiceError::from(err)
    })
}

/// Documents of `patient_id`, or of the signed-in user when absent.
pub fn list_documents<R>(
    repo: &R,
    user: &AuthenticatedUser,
    patient_id: Option<i32>,
) -> ServiceResult<Vec<Document>>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + DocumentReader + ?Sized,
{
    let patient_id = match patient_id {
        Some(id) => {
            let id = UserId::new(id)?;
            ensure_patient_record_access(repo, user, id)?;
            id
        }
        None => current_user(repo, user)?.id,
    };
    Ok(repo.list_documents(patient_id)?)
}

/// Document metadata and the file path to stream.
pub fn document_for_download<R>(
    repo: &R,
    user: &AuthenticatedUser,
    uploads_dir: &Path,
    document_id: i32,
) -> ServiceResult<(Document, PathBuf)>
where
    R: UserReader + UserWriter + ClinicReader + BookingReader + DocumentReader + ?Sized,
{
    let document = repo
        .get_document_by_id(DocumentId::new(document_id)?)?
        .ok_or(ServiceError::NotFound)?;
    ensure_patient_record_access(repo, user, document.patient_id)?;
    let path = stored_path(uploads_dir, &document);
    Ok((document, path))
}

/// Owner deletes the record and the stored file.
pub fn delete_document<R>(
    repo: &R,
    user: &AuthenticatedUser,
    uploads_dir: &Path,
    document_id: i32,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + DocumentReader + DocumentWriter + ?Sized,
{
    let document = repo
        .get_document_by_id(DocumentId::new(document_id)?)?
        .ok_or(ServiceError::NotFound)?;
    if !user.is_admin() && current_user(repo, user)?.id != document.patient_id {
        return Err(ServiceError::NotFound);
    }
    repo.delete_document(document.id)?;
    let path = stored_path(uploads_dir, &document);
    if let Err(err) = fs::remove_file(&path) {
        log::warn!("Failed to remove {}: {err}", path.display());
    }
    Ok(())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::auth::Portal;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;
    use crate::services::test_support::{clinic, clinic_claims, now, patient_claims, user};

    fn source_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fake x-ray").unwrap();
        file
    }

    fn incoming<'a>(source: &'a Path, booking_id: Option<i32>) -> IncomingDocument<'a> {
        IncomingDocument {
            source,
            file_name: Some("panoramic x-ray.png"),
            content_type: Some("image/png"),
            size: 10,
            kind: "x_ray",
            booking_id,
        }
    }

    fn patient_repo() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(9, email.as_str(), Portal::Patient))));
        repo
    }

    #[test]
    fn upload_copies_file_and_saves_record() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file();
        let mut repo = patient_repo();
        repo.expect_create_document().times(1).returning(|new| {
            Ok(Document {
                id: DocumentId::new(1).unwrap(),
                patient_id: new.patient_id,
                booking_id: new.booking_id,
                kind: new.kind,
                file_name: new.file_name.clone(),
                stored_name: new.stored_name.clone(),
                content_type: new.content_type.clone(),
                size_bytes: new.size_bytes,
                created_at: now(),
            })
        });

        let document = upload_document(
            &repo,
            &patient_claims(),
            dir.path(),
            1024,
            incoming(source.path(), None),
        )
        .unwrap();
        assert_eq!(document.file_name, "panoramic_x-ray.png");
        assert!(dir.path().join(&document.stored_name).exists());
    }

    #[test]
    fn failed_record_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file();
        let mut repo = patient_repo();
        repo.expect_create_document()
            .returning(|_| Err(RepositoryError::Unexpected("disk full".into())));

        let result = upload_document(
            &repo,
            &patient_claims(),
            dir.path(),
            1024,
            incoming(source.path(), None),
        );
        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn oversized_uploads_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file();
        let repo = MockRepository::new();
        let result = upload_document(
            &repo,
            &patient_claims(),
            dir.path(),
            5,
            incoming(source.path(), None),
        );
        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn staff_without_shared_booking_cannot_read() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(20, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));
        repo.expect_clinic_has_patient().returning(|_, _| Ok(false));
        let result = ensure_patient_record_access(&repo, &clinic_claims(), UserId::new(9).unwrap());
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }
}

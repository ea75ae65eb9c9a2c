//! Metadata of uploaded patient documents.

use diesel::prelude::*;

use crate::{
    domain::{
        document::{Document, NewDocument},
        types::{DocumentId, UserId},
    },
    models::document::{Document as DbDocument, NewDocument as DbNewDocument},
    repository::{
        DieselRepository, DocumentReader, DocumentWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl DocumentReader for DieselRepository {
    fn get_document_by_id(&self, id: DocumentId) -> RepositoryResult<Option<Document>> {
        use crate::schema::documents;

        let mut conn = self.conn()?;
        let db_document = documents::table
            .find(id.get())
            .first::<DbDocument>(&mut conn)
            .optional()?;

        Ok(db_document.map(Document::try_from).transpose()?)
    }

    fn list_documents(&self, patient_id: UserId) -> RepositoryResult<Vec<Document>> {
        use crate::schema::documents;

        let mut conn = self.conn()?;
        let documents = documents::table
            .filter(documents::patient_id.eq(patient_id.get()))
            .order((documents::created_at.desc(), documents::id.desc()))
            .load::<DbDocument>(&mut conn)?
            .into_iter()
            .map(Document::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }
}

impl DocumentWriter for DieselRepository {
    fn create_document(&self, document: &NewDocument) -> RepositoryResult<Document> {
        use crate::schema::documents;

        let mut conn = self.conn()?;
        let db_new_document: DbNewDocument = document.into();
        let db_document = diesel::insert_into(documents::table)
            .values(&db_new_document)
            .get_result::<DbDocument>(&mut conn)?;

        Ok(Document::try_from(db_document)?)
    }

    fn delete_document(&self, id: DocumentId) -> RepositoryResult<()> {
        use crate::schema::documents;

        let mut conn = self.conn()?;
        let affected = diesel::delete(documents::table.find(id.get())).execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Quote wizard drafts kept server-side so the session cookie only carries a token.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::{
    models::quote_draft::QuoteDraft as DbQuoteDraft,
    repository::{
        DieselRepository, QuoteDraftReader, QuoteDraftWriter, errors::RepositoryResult,
    },
};

impl QuoteDraftReader for DieselRepository {
    fn get_quote_draft(&self, token: &str) -> RepositoryResult<Option<String>> {
        use crate::schema::quote_drafts;

        let mut conn = self.conn()?;
        let snapshot = quote_drafts::table
            .find(token)
            .select(quote_drafts::snapshot)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(snapshot)
    }
}

impl QuoteDraftWriter for DieselRepository {
    fn save_quote_draft(&self, token: &str, snapshot: &str) -> RepositoryResult<()> {
        use crate::schema::quote_drafts;

        let row = DbQuoteDraft {
            token: token.to_string(),
            snapshot: snapshot.to_string(),
            updated_at: Utc::now().naive_utc(),
        };

        let mut conn = self.conn()?;
        diesel::insert_into(quote_drafts::table)
            .values(&row)
            .on_conflict(quote_drafts::token)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;

        Ok(())
    }

    fn delete_quote_draft(&self, token: &str) -> RepositoryResult<()> {
        use crate::schema::quote_drafts;

        let mut conn = self.conn()?;
        diesel::delete(quote_drafts::table.find(token)).execute(&mut conn)?;

        Ok(())
    }

    fn delete_quote_drafts_before(&self, cutoff: NaiveDateTime) -> RepositoryResult<usize> {
        use crate::schema::quote_drafts;

        let mut conn = self.conn()?;
        let removed = diesel::delete(quote_drafts::table.filter(quote_drafts::updated_at.lt(cutoff)))
            .execute(&mut conn)?;

        Ok(removed)
    }
}

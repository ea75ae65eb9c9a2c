//! Quote requests submitted from the quote wizard.

use chrono::Utc;
use diesel::prelude::*;

use crate::{
    domain::{
        quote::{NewQuoteRequest, QuoteRequest, QuoteStatus},
        types::{ClinicId, QuoteId},
    },
    models::quote::{
        NewQuote as DbNewQuote, NewQuoteLine as DbNewQuoteLine, Quote as DbQuote,
        QuoteLine as DbQuoteLine, quote_into_domain,
    },
    repository::{
        DieselRepository, QuoteListQuery, QuoteReader, QuoteWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn load_quote(
    conn: &mut SqliteConnection,
    quote_id: i32,
) -> RepositoryResult<Option<QuoteRequest>> {
    use crate::schema::{quote_lines, quotes};

    let Some(quote) = quotes::table
        .find(quote_id)
        .first::<DbQuote>(conn)
        .optional()?
    else {
        return Ok(None);
    };
    let lines = DbQuoteLine::belonging_to(&quote)
        .order(quote_lines::id.asc())
        .load::<DbQuoteLine>(conn)?;
    Ok(Some(quote_into_domain(quote, lines)?))
}

impl QuoteReader for DieselRepository {
    fn get_quote_by_id(&self, id: QuoteId) -> RepositoryResult<Option<QuoteRequest>> {
        let mut conn = self.conn()?;
        load_quote(&mut conn, id.get())
    }

    fn list_quotes(&self, query: QuoteListQuery) -> RepositoryResult<(usize, Vec<QuoteRequest>)> {
        use crate::schema::quotes;

        let mut conn = self.conn()?;

        let query_builder = || {
            let mut items = quotes::table.into_boxed::<diesel::sqlite::Sqlite>();
            if let Some(patient_id) = query.patient_id {
                items = items.filter(quotes::patient_id.eq(patient_id.get()));
            }
            if let Some(clinic_id) = query.clinic_id {
                items = items.filter(quotes::clinic_id.eq(clinic_id.get()));
            }
            if let Some(status) = query.status {
                items = items.filter(quotes::status.eq(status.as_str()));
            }
            items
        };

        let total = query_builder().count().get_result::<i64>(&mut conn)? as usize;

        let mut items = query_builder().order((quotes::created_at.desc(), quotes::id.desc()));
        if let Some(pagination) = &query.pagination {
            items = items.limit(pagination.limit()).offset(pagination.offset());
        }
        let quotes = items.load::<DbQuote>(&mut conn)?;

        let lines = DbQuoteLine::belonging_to(&quotes)
            .load::<DbQuoteLine>(&mut conn)?
            .grouped_by(&quotes);

        let quotes = quotes
            .into_iter()
            .zip(lines)
            .map(|(quote, lines)| quote_into_domain(quote, lines).map_err(RepositoryError::from))
            .collect::<RepositoryResult<Vec<_>>>()?;

        Ok((total, quotes))
    }
}

impl QuoteWriter for DieselRepository {
    fn create_quote(&self, new_quote: &NewQuoteRequest) -> RepositoryResult<QuoteRequest> {
        use crate::schema::{quote_lines, quotes};

        let mut conn = self.conn()?;
        let (quote, lines) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let db_new_quote: DbNewQuote = new_quote.into();
            let quote = diesel::insert_into(quotes::table)
                .values(&db_new_quote)
                .get_result::<DbQuote>(conn)?;

            let db_lines = new_quote
                .lines
                .iter()
                .map(|line| DbNewQuoteLine::new(quote.id, line))
                .collect::<Vec<_>>();
            let lines = db_lines
                .iter()
                .map(|line| {
                    diesel::insert_into(quote_lines::table)
                        .values(line)
                        .get_result::<DbQuoteLine>(conn)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((quote, lines))
        })?;

        Ok(quote_into_domain(quote, lines)?)
    }

    fn update_quote_status(
        &self,
        id: QuoteId,
        status: QuoteStatus,
    ) -> RepositoryResult<QuoteRequest> {
        use crate::schema::quotes;

        let mut conn = self.conn()?;
        diesel::update(quotes::table.find(id.get()))
            .set((
                quotes::status.eq(status.as_str()),
                quotes::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        load_quote(&mut conn, id.get())?.ok_or(RepositoryError::NotFound)
    }

    fn assign_quote_clinic(
        &self,
        id: QuoteId,
        clinic_id: ClinicId,
    ) -> RepositoryResult<QuoteRequest> {
        use crate::schema::quotes;

        let mut conn = self.conn()?;
        diesel::update(quotes::table.find(id.get()))
            .set((
                quotes::clinic_id.eq(Some(clinic_id.get())),
                quotes::updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(&mut conn)?;

        load_quote(&mut conn, id.get())?.ok_or(RepositoryError::NotFound)
    }
}

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Serialized quote wizard state for one browser session.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::quote_drafts)]
#[diesel(primary_key(token))]
pub struct QuoteDraft {
    pub token: String,
    pub snapshot: String,
    pub updated_at: NaiveDateTime,
}

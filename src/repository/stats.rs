//! Aggregates for the admin dashboard.

use diesel::{dsl::count_star, prelude::*};

use crate::{
    domain::{
        booking::{PaymentKind, PaymentStatus},
        quote::QuoteStatus,
        special_offer::OfferStatus,
        types::Money,
    },
    repository::{DashboardStats, DieselRepository, StatsReader, errors::RepositoryResult},
};

impl StatsReader for DieselRepository {
    fn dashboard_stats(&self) -> RepositoryResult<DashboardStats> {
        use crate::schema::{bookings, payments, quotes, special_offers};

        let mut conn = self.conn()?;

        let pending_quotes = quotes::table
            .filter(quotes::status.eq(QuoteStatus::Pending.as_str()))
            .count()
            .get_result::<i64>(&mut conn)? as usize;

        let pending_offers = special_offers::table
            .filter(special_offers::status.eq(OfferStatus::Pending.as_str()))
            .count()
            .get_result::<i64>(&mut conn)? as usize;

        let bookings_by_status = bookings::table
            .group_by(bookings::status)
            .select((bookings::status, count_star()))
            .order(bookings::status.asc())
            .load::<(String, i64)>(&mut conn)?
            .into_iter()
            .map(|(status, count)| (status, count as usize))
            .collect();

        let settled = payments::table
            .filter(payments::status.eq(PaymentStatus::Succeeded.as_str()))
            .select((payments::kind, payments::amount))
            .load::<(String, i64)>(&mut conn)?;

        let mut revenue = Money::ZERO;
        for (kind, amount) in settled {
            let amount = Money::from_pence(amount)?;
            revenue = if kind == PaymentKind::Refund.as_str() {
                revenue.saturating_sub(amount)
            } else {
                revenue.saturating_add(amount)
            };
        }

        Ok(DashboardStats {
            pending_quotes,
            pending_offers,
            bookings_by_status,
            revenue,
        })
    }
}

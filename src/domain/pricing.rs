//! Price arithmetic shared by the quote wizard, quote documents and bookings.

use serde::{Deserialize, Serialize};

use crate::domain::types::{Money, PromoCode};

/// Istanbul prices are multiplied by this factor to approximate UK prices.
pub const UK_PRICE_MULTIPLIER_PERCENT: i64 = 250;

/// Share of a booking total requested as deposit.
pub const DEPOSIT_PERCENT: u32 = 20;

/// Smallest deposit requested, unless the booking total is lower.
pub const MIN_DEPOSIT: Money = Money::from_pounds(200);

/// Discount attached to a promo code.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value")]
pub enum PromoDiscount {
    /// Percentage of the subtotal (1..=100).
    Percent(u8),
    /// Fixed amount off, capped at the subtotal.
    Fixed(Money),
}

impl PromoDiscount {
    /// Human readable label, e.g. `10% off` or `£50.00 off`.
    pub fn label(&self) -> String {
        match self {
            PromoDiscount::Percent(p) => format!("{p}% off"),
            PromoDiscount::Fixed(amount) => format!("{amount} off"),
        }
    }
}

/// Codes honoured regardless of clinic.
const PROMO_TABLE: &[(&str, PromoDiscount)] = &[
    ("WELCOME10", PromoDiscount::Percent(10)),
    ("SUMMER15", PromoDiscount::Percent(15)),
    ("DENTAL20", PromoDiscount::Percent(20)),
    ("FREECONSULT", PromoDiscount::Fixed(Money::from_pounds(50))),
];

/// Looks up a code in the built-in promo table.
pub fn lookup_promo(code: &PromoCode) -> Option<PromoDiscount> {
    PROMO_TABLE
        .iter()
        .find(|(known, _)| *known == code.as_str())
        .map(|(_, discount)| *discount)
}

/// Amount taken off `subtotal`; never exceeds the subtotal.
pub fn discount_for(subtotal: Money, discount: PromoDiscount) -> Money {
    let amount = match discount {
        PromoDiscount::Percent(p) => subtotal.percent(u32::from(p.min(100))),
        PromoDiscount::Fixed(amount) => amount,
    };
    amount.min(subtotal)
}

/// Approximate price of the same work in the UK.
pub fn uk_price(price: Money) -> Money {
    price.scale(UK_PRICE_MULTIPLIER_PERCENT, 100)
}

/// Percentage saved compared to `uk`, rounded to the nearest whole percent.
pub fn savings_percent(local: Money, uk: Money) -> u32 {
    if uk.is_zero() || local >= uk {
        return 0;
    }
    let saved = uk.saturating_sub(local).pence();
    let percent = (saved * 100 * 2 + uk.pence()) / (uk.pence() * 2);
    u32::try_from(percent).unwrap_or(0)
}

/// Price a clinic charges for a treatment.
pub fn clinic_price(base: Money, price_factor: i32, price_override: Option<Money>) -> Money {
    match price_override {
        Some(price) => price,
        None => base.scale(i64::from(price_factor), 100),
    }
}

/// Deposit due for a booking of `total`.
pub fn deposit_for(total: Money) -> Money {
    total.percent(DEPOSIT_PERCENT).max(MIN_DEPOSIT).min(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> PromoCode {
        PromoCode::new(raw).unwrap()
    }

    #[test]
    fn promo_lookup_is_case_insensitive() {
        assert_eq!(
            lookup_promo(&code("welcome10")),
            Some(PromoDiscount::Percent(10))
        );
        assert_eq!(
            lookup_promo(&code(" FreeConsult ")),
            Some(PromoDiscount::Fixed(Money::from_pounds(50)))
        );
        assert_eq!(lookup_promo(&code("NOPE")), None);
    }

    #[test]
    fn discount_is_capped_at_subtotal() {
        let subtotal = Money::from_pounds(30);
        assert_eq!(
            discount_for(subtotal, PromoDiscount::Fixed(Money::from_pounds(50))),
            subtotal
        );
        assert_eq!(
            discount_for(subtotal, PromoDiscount::Percent(10)),
            Money::from_pounds(3)
        );
        assert_eq!(
            discount_for(Money::ZERO, PromoDiscount::Percent(20)),
            Money::ZERO
        );
    }

    #[test]
    fn uk_price_and_savings() {
        let local = Money::from_pounds(400);
        let uk = uk_price(local);
        assert_eq!(uk, Money::from_pounds(1000));
        assert_eq!(savings_percent(local, uk), 60);
        assert_eq!(savings_percent(uk, local), 0);
        assert_eq!(savings_percent(Money::ZERO, Money::ZERO), 0);
    }

    #[test]
    fn clinic_price_prefers_override() {
        let base = Money::from_pounds(100);
        assert_eq!(clinic_price(base, 120, None), Money::from_pounds(120));
        assert_eq!(
            clinic_price(base, 120, Some(Money::from_pounds(95))),
            Money::from_pounds(95)
        );
    }

    #[test]
    fn deposit_has_floor_and_cap() {
        assert_eq!(deposit_for(Money::from_pounds(5000)), Money::from_pounds(1000));
        assert_eq!(deposit_for(Money::from_pounds(600)), Money::from_pounds(200));
        assert_eq!(deposit_for(Money::from_pounds(150)), Money::from_pounds(150));
    }
}

//! Special offers: clinic submissions, moderation and the homepage list.

use chrono::NaiveDateTime;
use validator::Validate;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser};
use crate::domain::clinic::Clinic;
use crate::domain::special_offer::{OfferStatus, SpecialOffer};
use crate::domain::types::OfferId;
use crate::dto::offers::OfferCard;
use crate::forms::offers::{ModerateOfferForm, OfferForm};
use crate::models::zmq::DentalEvent;
use crate::repository::{
    ClinicReader, OfferListQuery, OfferReader, OfferWriter, UserReader, UserWriter,
};
use crate::services::events::{EventPublisher, publish_quietly};
use crate::services::users::{clinic_staff_ids, ensure_clinic_access, resolve_staff_clinic};
use crate::services::{ServiceError, ServiceResult, ensure_role};

fn load_offer<R>(repo: &R, offer_id: i32) -> ServiceResult<SpecialOffer>
where
    R: OfferReader + ?Sized,
{
    repo.get_offer_by_id(OfferId::new(offer_id)?)?
        .ok_or(ServiceError::NotFound)
}

fn validate_offer(form: &OfferForm) -> ServiceResult<()> {
    if let Err(err) = form.validate() {
        log::error!("Failed to validate offer form: {err}");
        return Err(ServiceError::Form("Please check the offer details.".to_string()));
    }
    Ok(())
}

/// Approved offers running at `now`, ready for the homepage carousel.
pub fn homepage_offers<R>(repo: &R, now: NaiveDateTime) -> ServiceResult<Vec<OfferCard>>
where
    R: OfferReader + ?Sized,
{
    let mut offers: Vec<SpecialOffer> = repo
        .list_live_offers(now)?
        .into_iter()
        .filter(|offer| offer.is_live(now))
        .collect();
    offers.sort_by(|a, b| {
        b.discount_percent
            .cmp(&a.discount_percent)
            .then(a.id.cmp(&b.id))
    });
    Ok(offers.iter().map(OfferCard::from).collect())
}

pub fn list_clinic_offers<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic: Option<i32>,
) -> ServiceResult<(Clinic, Vec<Clinic>, Vec<SpecialOffer>)>
where
    R: UserReader + UserWriter + ClinicReader + OfferReader + ?Sized,
{
    let (clinic, clinics) = resolve_staff_clinic(repo, user, clinic)?;
    let offers = repo.list_offers(OfferListQuery::default().clinic(clinic.id))?;
    Ok((clinic, clinics, offers))
}

/// Submits a new offer for moderation.
pub fn submit_offer<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic: Option<i32>,
    form: OfferForm,
) -> ServiceResult<SpecialOffer>
where
    R: UserReader + UserWriter + ClinicReader + OfferWriter + ?Sized,
{
    validate_offer(&form)?;
    let (clinic, _) = resolve_staff_clinic(repo, user, clinic)?;
    let offer = form.to_new_offer(clinic.id)?;
    repo.create_offer(&offer).map_err(|err| {
        log::error!("Failed to create offer for {}: {err}", clinic.name);
        err.into()
    })
}

/// Replaces offer content and sends it back to moderation.
pub fn edit_offer<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    offer_id: i32,
    form: OfferForm,
) -> ServiceResult<SpecialOffer>
where
    R: UserReader + UserWriter + ClinicReader + OfferReader + OfferWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    validate_offer(&form)?;
    let existing = load_offer(repo, offer_id)?;
    ensure_clinic_access(repo, user, existing.clinic_id)?;

    let offer = form.to_new_offer(existing.clinic_id)?;
    let image_version = if offer.changes_image(&existing) {
        existing.image_version + 1
    } else {
        existing.image_version
    };
    let updated = repo
        .update_offer(existing.id, &offer, image_version)
        .map_err(|err| {
            log::error!("Failed to update offer {}: {err}", existing.id);
            ServiceError::from(err)
        })?;

    // A live offer just left the carousel.
    if existing.status == OfferStatus::Approved {
        publish_quietly(
            publisher,
            DentalEvent::OffersChanged {
                offer_id: updated.id.get(),
                status: updated.status.as_str().to_string(),
                notify: vec![],
            },
        );
    }
    Ok(updated)
}

pub fn delete_offer<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    offer_id: i32,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + OfferReader + OfferWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    let existing = load_offer(repo, offer_id)?;
    ensure_clinic_access(repo, user, existing.clinic_id)?;
    repo.delete_offer(existing.id).map_err(|err| {
        log::error!("Failed to delete offer {}: {err}", existing.id);
        ServiceError::from(err)
    })?;
    if existing.status == OfferStatus::Approved {
        publish_quietly(
            publisher,
            DentalEvent::OffersChanged {
                offer_id: existing.id.get(),
                status: "deleted".to_string(),
                notify: vec![],
            },
        );
    }
    Ok(())
}

/// Offers awaiting moderation, or all offers with `status` when given.
pub fn list_offers_for_moderation<R>(
    repo: &R,
    user: &AuthenticatedUser,
    status: Option<String>,
) -> ServiceResult<Vec<SpecialOffer>>
where
    R: OfferReader + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let status = match status.as_deref().filter(|s| !s.is_empty()) {
        Some("all") => None,
        Some(raw) => Some(OfferStatus::try_from(raw)?),
        None => Some(OfferStatus::Pending),
    };
    let mut query = OfferListQuery::default();
    if let Some(status) = status {
        query = query.status(status);
    }
    Ok(repo.list_offers(query)?)
}

/// Approves or rejects an offer and tells carousel subscribers and clinic staff.
pub fn moderate_offer<R, P>(
    repo: &R,
    publisher: &P,
    user: &AuthenticatedUser,
    offer_id: i32,
    form: ModerateOfferForm,
) -> ServiceResult<SpecialOffer>
where
    R: ClinicReader + OfferReader + OfferWriter + ?Sized,
    P: EventPublisher + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let (status, note) = form.decision()?;
    let existing = load_offer(repo, offer_id)?;
    let moderated = repo.moderate_offer(existing.id, status, note).map_err(|err| {
        log::error!("Failed to moderate offer {}: {err}", existing.id);
        ServiceError::from(err)
    })?;
    log::info!(
        "Offer {} {} by {}",
        moderated.id,
        moderated.status.as_str(),
        user.email
    );
    publish_quietly(
        publisher,
        DentalEvent::OffersChanged {
            offer_id: moderated.id.get(),
            status: moderated.status.as_str().to_string(),
            notify: clinic_staff_ids(repo, moderated.clinic_id),
        },
    );
    Ok(moderated)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::auth::Portal;
    use crate::domain::types::{ClinicId, ImageUrl, Title};
    use crate::repository::mock::MockRepository;
    use crate::services::events::recording::RecordingPublisher;
    use crate::services::test_support::{admin_claims, clinic, clinic_claims, now, user};

    fn offer(id: i32, discount: i32, status: OfferStatus) -> SpecialOffer {
        SpecialOffer {
            id: OfferId::new(id).unwrap(),
            clinic_id: ClinicId::new(1).unwrap(),
            title: Title::new("Winter implants").unwrap(),
            description: None,
            discount_percent: discount,
            promo_code: None,
            image_url: Some(ImageUrl::new("/assets/offers/winter.jpg").unwrap()),
            image_version: 1,
            status,
            admin_note: None,
            starts_at: now() - Duration::days(1),
            ends_at: now() + Duration::days(30),
            created_at: now(),
            updated_at: now(),
        }
    }

    fn form(image: &str) -> OfferForm {
        OfferForm {
            title: "Winter implants".into(),
            description: None,
            discount_percent: 25,
            promo_code: None,
            image_url: Some(image.into()),
            starts_at: "2026-12-01T00:00".into(),
            ends_at: "2027-01-31T23:59".into(),
        }
    }

    fn staff_repo() -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(20, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(1, "Alpha Dental", 45, 100)]));
        repo
    }

    #[test]
    fn homepage_orders_by_discount_and_busts_cache() {
        let mut repo = MockRepository::new();
        repo.expect_list_live_offers().returning(|_| {
            Ok(vec![
                offer(2, 10, OfferStatus::Approved),
                offer(1, 30, OfferStatus::Approved),
                offer(3, 30, OfferStatus::Approved),
            ])
        });
        let cards = homepage_offers(&repo, now()).unwrap();
        let ids: Vec<i32> = cards.iter().map(|card| card.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(
            cards[0].image_url.as_deref(),
            Some("/assets/offers/winter.jpg?v=1")
        );
    }

    #[test]
    fn new_image_bumps_version() {
        let mut repo = staff_repo();
        repo.expect_get_offer_by_id()
            .returning(|id| Ok(Some(offer(id.get(), 25, OfferStatus::Approved))));
        repo.expect_update_offer()
            .times(1)
            .withf(|_, _, version| *version == 2)
            .returning(|id, _, version| {
                let mut updated = offer(id.get(), 25, OfferStatus::Pending);
                updated.image_version = version;
                Ok(updated)
            });
        let publisher = RecordingPublisher::default();

        let updated = edit_offer(
            &repo,
            &publisher,
            &clinic_claims(),
            4,
            form("/assets/offers/spring.jpg"),
        )
        .unwrap();
        assert_eq!(updated.image_version, 2);
        assert_eq!(publisher.published().len(), 1);
    }

    #[test]
    fn unchanged_image_keeps_version() {
        let mut repo = staff_repo();
        repo.expect_get_offer_by_id()
            .returning(|id| Ok(Some(offer(id.get(), 25, OfferStatus::Pending))));
        repo.expect_update_offer()
            .times(1)
            .withf(|_, _, version| *version == 1)
            .returning(|id, _, _| Ok(offer(id.get(), 25, OfferStatus::Pending)));
        let publisher = RecordingPublisher::default();

        edit_offer(
            &repo,
            &publisher,
            &clinic_claims(),
            4,
            form("/assets/offers/winter.jpg"),
        )
        .unwrap();
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn approval_publishes_to_staff() {
        let mut repo = MockRepository::new();
        repo.expect_get_offer_by_id()
            .returning(|id| Ok(Some(offer(id.get(), 25, OfferStatus::Pending))));
        repo.expect_moderate_offer()
            .returning(|id, status, _| Ok(offer(id.get(), 25, status)));
        repo.expect_list_clinic_staff()
            .returning(|_| Ok(vec![user(20, "staff@clinic.example", Portal::Clinic)]));
        let publisher = RecordingPublisher::default();
        let form = ModerateOfferForm {
            status: "approved".into(),
            note: None,
        };

        moderate_offer(&repo, &publisher, &admin_claims(), 4, form).unwrap();
        let events = publisher.published();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].recipients(), &[20]);
    }

    #[test]
    fn staff_cannot_moderate() {
        let repo = MockRepository::new();
        let publisher = RecordingPublisher::default();
        let form = ModerateOfferForm {
            status: "approved".into(),
            note: None,
        };
        assert!(matches!(
            moderate_offer(&repo, &publisher, &clinic_claims(), 4, form),
            Err(ServiceError::Unauthorized)
        ));
    }
}

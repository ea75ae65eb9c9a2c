//! Treatment catalog, clinic prices, packages and clinic comparison.

use std::collections::HashMap;

use validator::Validate;

use crate::domain::auth::{ADMIN_ROLE, AuthenticatedUser};
use crate::domain::clinic::Clinic;
use crate::domain::package::TreatmentPackage;
use crate::domain::pricing::{clinic_price, savings_percent, uk_price};
use crate::domain::quote_wizard::MAX_QUANTITY;
use crate::domain::treatment::{ClinicTreatmentPrice, Treatment};
use crate::domain::types::{ClinicId, Money, PackageId, TreatmentId};
use crate::dto::catalog::{
    ClinicCatalogPage, ClinicComparison, ClinicDetail, ComparedLine, PackageView, PricedTreatment,
    TreatmentCatalog,
};
use crate::forms::catalog::{ClinicPriceForm, PackageForm, TreatmentForm, UploadTreatmentsForm};
use crate::repository::{
    ClinicListQuery, ClinicReader, ClinicWriter, PackageListQuery, PackageReader, PackageWriter,
    TreatmentReader, TreatmentWriter, UserReader, UserWriter,
};
use crate::services::users::{ensure_clinic_access, resolve_staff_clinic};
use crate::services::{ServiceError, ServiceResult, ensure_role};

/// Treatments of one category (or all) plus the category list.
pub fn load_catalog<R>(repo: &R, category: Option<String>) -> ServiceResult<TreatmentCatalog>
where
    R: TreatmentReader + ?Sized,
{
    let selected_category = category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    Ok(TreatmentCatalog {
        treatments: repo.list_treatments(selected_category.clone())?,
        categories: repo.list_treatment_categories()?,
        selected_category,
    })
}

pub fn create_treatment<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: TreatmentForm,
) -> ServiceResult<Treatment>
where
    R: TreatmentWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    if let Err(err) = form.validate() {
        log::error!("Failed to validate treatment form: {err}");
        return Err(ServiceError::Form("Please check the treatment details.".to_string()));
    }
    let new_treatment = form.to_new_treatment()?;
    repo.create_treatment(&new_treatment).map_err(|err| {
        log::error!("Failed to create treatment {}: {err}", new_treatment.code);
        err.into()
    })
}

pub fn update_treatment<R>(
    repo: &R,
    user: &AuthenticatedUser,
    treatment_id: i32,
    form: TreatmentForm,
) -> ServiceResult<Treatment>
where
    R: TreatmentReader + TreatmentWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    if let Err(err) = form.validate() {
        log::error!("Failed to validate treatment form: {err}");
        return Err(ServiceError::Form("Please check the treatment details.".to_string()));
    }
    let id = TreatmentId::new(treatment_id)?;
    repo.get_treatment_by_id(id)?.ok_or(ServiceError::NotFound)?;
    let updates = form.to_update_treatment()?;
    repo.update_treatment(id, &updates).map_err(|err| {
        log::error!("Failed to update treatment {id}: {err}");
        err.into()
    })
}

/// Upserts every row of the uploaded catalog CSV, returning the row count.
pub fn import_treatments<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: &mut UploadTreatmentsForm,
) -> ServiceResult<usize>
where
    R: TreatmentWriter + ?Sized,
{
    ensure_role(user, ADMIN_ROLE)?;
    let treatments = form.parse().map_err(|err| {
        log::error!("Failed to parse treatments CSV: {err}");
        ServiceError::Form(format!("Could not read the CSV file: {err}"))
    })?;
    if treatments.is_empty() {
        return Err(ServiceError::Form("The CSV file has no treatments.".to_string()));
    }
    repo.upsert_treatments(&treatments).map_err(|err| {
        log::error!("Failed to import treatments: {err}");
        err.into()
    })
}

/// Every catalog treatment priced by the clinic.
pub fn clinic_price_list<R>(repo: &R, clinic: &Clinic) -> ServiceResult<Vec<PricedTreatment>>
where
    R: TreatmentReader + ClinicReader + ?Sized,
{
    let overrides: HashMap<TreatmentId, Money> = repo
        .list_clinic_prices(clinic.id)?
        .into_iter()
        .map(|price| (price.treatment_id, price.price))
        .collect();
    Ok(repo
        .list_treatments(None)?
        .into_iter()
        .map(|treatment| {
            let price_override = overrides.get(&treatment.id).copied();
            let price = clinic_price(treatment.base_price, clinic.price_factor, price_override);
            PricedTreatment {
                uk_price: uk_price(price),
                has_override: price_override.is_some(),
                price,
                treatment,
            }
        })
        .collect())
}

/// Public clinic page data: prices and active packages.
pub fn clinic_detail<R>(repo: &R, clinic_id: i32) -> ServiceResult<ClinicDetail>
where
    R: TreatmentReader + ClinicReader + PackageReader + ?Sized,
{
    let clinic = repo
        .get_clinic_by_id(ClinicId::new(clinic_id)?)?
        .ok_or(ServiceError::NotFound)?;
    let treatments = clinic_price_list(repo, &clinic)?;
    let packages = repo.list_packages(PackageListQuery::default().clinic(clinic.id).active_only())?;
    Ok(ClinicDetail {
        clinic,
        treatments,
        packages,
    })
}

/// Clinic portal view of its prices and every package, inactive included.
pub fn clinic_catalog<R>(
    repo: &R,
    user: &AuthenticatedUser,
    requested: Option<i32>,
) -> ServiceResult<ClinicCatalogPage>
where
    R: UserReader + UserWriter + TreatmentReader + ClinicReader + PackageReader + ?Sized,
{
    let (clinic, clinics) = resolve_staff_clinic(repo, user, requested)?;
    let prices = clinic_price_list(repo, &clinic)?;
    let packages = repo.list_packages(PackageListQuery::default().clinic(clinic.id))?;
    Ok(ClinicCatalogPage {
        packages: package_views(repo, packages)?,
        prices,
        clinic,
        clinics,
    })
}

/// Price function for one clinic, used to reprice quote lines.
pub fn clinic_pricer<R>(
    repo: &R,
    clinic_id: ClinicId,
) -> ServiceResult<(Clinic, impl Fn(&Treatment) -> Money)>
where
    R: ClinicReader + ?Sized,
{
    let clinic = repo
        .get_clinic_by_id(clinic_id)?
        .ok_or(ServiceError::NotFound)?;
    let overrides: HashMap<TreatmentId, Money> = repo
        .list_clinic_prices(clinic_id)?
        .into_iter()
        .map(|price| (price.treatment_id, price.price))
        .collect();
    let factor = clinic.price_factor;
    let price_of = move |treatment: &Treatment| {
        clinic_price(
            treatment.base_price,
            factor,
            overrides.get(&treatment.id).copied(),
        )
    };
    Ok((clinic, price_of))
}

/// Sets (or with a blank price, removes) a clinic's own price for a treatment.
pub fn set_clinic_price<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
    form: ClinicPriceForm,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + ClinicWriter + TreatmentReader + ?Sized,
{
    let clinic_id = ClinicId::new(clinic_id)?;
    ensure_clinic_access(repo, user, clinic_id)?;
    let treatment_id = TreatmentId::new(form.treatment_id)?;
    repo.get_treatment_by_id(treatment_id)?
        .ok_or(ServiceError::NotFound)?;

    let result = match form.price()? {
        Some(price) => repo.set_clinic_price(&ClinicTreatmentPrice {
            clinic_id,
            treatment_id,
            price,
        }),
        None => repo.remove_clinic_price(clinic_id, treatment_id),
    };
    result.map_err(|err| {
        log::error!("Failed to update price of {treatment_id} at {clinic_id}: {err}");
        err.into()
    })
}

pub fn create_package<R>(
    repo: &R,
    user: &AuthenticatedUser,
    clinic_id: i32,
    form: PackageForm,
) -> ServiceResult<TreatmentPackage>
where
    R: UserReader + UserWriter + ClinicReader + PackageWriter + ?Sized,
{
    let clinic_id = ClinicId::new(clinic_id)?;
    ensure_clinic_access(repo, user, clinic_id)?;
    if let Err(err) = form.validate() {
        log::error!("Failed to validate package form: {err}");
        return Err(ServiceError::Form("Please check the package details.".to_string()));
    }
    let new_package = form.to_new_package(clinic_id)?;
    repo.create_package(&new_package).map_err(|err| {
        log::error!("Failed to create package: {err}");
        err.into()
    })
}

fn owned_package<R>(
    repo: &R,
    user: &AuthenticatedUser,
    package_id: i32,
) -> ServiceResult<TreatmentPackage>
where
    R: UserReader + UserWriter + ClinicReader + PackageReader + ?Sized,
{
    let package = repo
        .get_package_by_id(PackageId::new(package_id)?)?
        .ok_or(ServiceError::NotFound)?;
    ensure_clinic_access(repo, user, package.clinic_id)?;
    Ok(package)
}

pub fn update_package<R>(
    repo: &R,
    user: &AuthenticatedUser,
    package_id: i32,
    form: PackageForm,
) -> ServiceResult<TreatmentPackage>
where
    R: UserReader + UserWriter + ClinicReader + PackageReader + PackageWriter + ?Sized,
{
    let package = owned_package(repo, user, package_id)?;
    if let Err(err) = form.validate() {
        log::error!("Failed to validate package form: {err}");
        return Err(ServiceError::Form("Please check the package details.".to_string()));
    }
    let updates = form.to_new_package(package.clinic_id)?;
    repo.update_package(package.id, &updates).map_err(|err| {
        log::error!("Failed to update package {}: {err}", package.id);
        err.into()
    })
}

pub fn set_package_active<R>(
    repo: &R,
    user: &AuthenticatedUser,
    package_id: i32,
    active: bool,
) -> ServiceResult<()>
where
    R: UserReader + UserWriter + ClinicReader + PackageReader + PackageWriter + ?Sized,
{
    let package = owned_package(repo, user, package_id)?;
    repo.set_package_active(package.id, active)?;
    Ok(())
}

/// Active packages with the price of their treatments bought separately.
pub fn list_public_packages<R>(repo: &R) -> ServiceResult<Vec<PackageView>>
where
    R: ClinicReader + PackageReader + TreatmentReader + ?Sized,
{
    let packages = repo.list_packages(PackageListQuery::default().active_only())?;
    package_views(repo, packages)
}

pub fn package_views<R>(repo: &R, packages: Vec<TreatmentPackage>) -> ServiceResult<Vec<PackageView>>
where
    R: ClinicReader + TreatmentReader + ?Sized,
{
    let mut treatment_ids: Vec<TreatmentId> = packages
        .iter()
        .flat_map(|package| package.items.iter().map(|item| item.treatment_id))
        .collect();
    treatment_ids.sort_unstable();
    treatment_ids.dedup();

    let treatments: HashMap<TreatmentId, Treatment> = repo
        .get_treatments_by_ids(&treatment_ids)?
        .into_iter()
        .map(|treatment| (treatment.id, treatment))
        .collect();
    let overrides: HashMap<(ClinicId, TreatmentId), Money> = repo
        .list_prices_for_treatments(&treatment_ids)?
        .into_iter()
        .map(|price| ((price.clinic_id, price.treatment_id), price.price))
        .collect();

    let mut clinics: HashMap<ClinicId, Clinic> = HashMap::new();
    let mut views = Vec::with_capacity(packages.len());
    for package in packages {
        if !clinics.contains_key(&package.clinic_id) {
            match repo.get_clinic_by_id(package.clinic_id)? {
                Some(clinic) => {
                    clinics.insert(clinic.id, clinic);
                }
                None => {
                    log::warn!("Package {} belongs to a missing clinic", package.id);
                    continue;
                }
            }
        }
        let Some(clinic) = clinics.get(&package.clinic_id) else {
            continue;
        };

        let separate_price: Money = package
            .items
            .iter()
            .filter_map(|item| {
                let treatment = treatments.get(&item.treatment_id)?;
                let price = clinic_price(
                    treatment.base_price,
                    clinic.price_factor,
                    overrides.get(&(clinic.id, treatment.id)).copied(),
                );
                Some(price.times(item.quantity))
            })
            .sum();

        views.push(PackageView {
            clinic_name: clinic.name.as_str().to_string(),
            savings: separate_price.saturating_sub(package.price),
            separate_price,
            package,
        });
    }
    Ok(views)
}

/// Parses `ID:QTY` pairs; a bare `ID` means quantity one.
pub fn parse_basket(raw: &[String]) -> ServiceResult<Vec<(TreatmentId, i32)>> {
    let mut basket: Vec<(TreatmentId, i32)> = Vec::new();
    for entry in raw {
        let (id, quantity) = match entry.split_once(':') {
            Some((id, quantity)) => (id, quantity),
            None => (entry.as_str(), "1"),
        };
        let invalid = || ServiceError::Form(format!("Invalid treatment selection: {entry}"));
        let id: i32 = id.trim().parse().map_err(|_| invalid())?;
        let quantity: i32 = quantity.trim().parse().map_err(|_| invalid())?;
        let id = TreatmentId::new(id)?;
        let merged = match basket.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, existing)) => {
                *existing = existing.saturating_add(quantity);
                *existing
            }
            None => {
                basket.push((id, quantity));
                quantity
            }
        };
        // Repeated entries are capped on their merged quantity.
        if quantity < 1 || merged > MAX_QUANTITY {
            return Err(invalid());
        }
    }
    Ok(basket)
}

/// Prices a basket at every verified clinic.
///
/// Cheapest first; ties go to the better rated clinic, then by name.
pub fn compare_clinics<R>(
    repo: &R,
    basket: &[(TreatmentId, i32)],
) -> ServiceResult<Vec<ClinicComparison>>
where
    R: ClinicReader + TreatmentReader + ?Sized,
{
    if basket.is_empty() {
        return Err(ServiceError::Form("Choose at least one treatment.".to_string()));
    }
    let ids: Vec<TreatmentId> = basket.iter().map(|(id, _)| *id).collect();
    let treatments: HashMap<TreatmentId, Treatment> = repo
        .get_treatments_by_ids(&ids)?
        .into_iter()
        .map(|treatment| (treatment.id, treatment))
        .collect();
    if let Some((missing, _)) = basket.iter().find(|(id, _)| !treatments.contains_key(id)) {
        log::warn!("Comparison requested unknown treatment {missing}");
        return Err(ServiceError::NotFound);
    }
    let overrides: HashMap<(ClinicId, TreatmentId), Money> = repo
        .list_prices_for_treatments(&ids)?
        .into_iter()
        .map(|price| ((price.clinic_id, price.treatment_id), price.price))
        .collect();

    let (_, clinics) = repo.list_clinics(ClinicListQuery::default().verified_only())?;
    let mut comparisons: Vec<ClinicComparison> = clinics
        .into_iter()
        .map(|clinic| {
            let lines: Vec<ComparedLine> = basket
                .iter()
                .filter_map(|(id, quantity)| treatments.get(id).map(|t| (t, *quantity)))
                .map(|(treatment, quantity)| {
                    let unit_price = clinic_price(
                        treatment.base_price,
                        clinic.price_factor,
                        overrides.get(&(clinic.id, treatment.id)).copied(),
                    );
                    ComparedLine {
                        treatment_id: treatment.id,
                        name: treatment.name.as_str().to_string(),
                        quantity,
                        unit_price,
                        total: unit_price.times(quantity),
                    }
                })
                .collect();
            let total: Money = lines.iter().map(|line| line.total).sum();
            let uk_total: Money = lines
                .iter()
                .map(|line| uk_price(line.unit_price).times(line.quantity))
                .sum();
            ClinicComparison {
                savings_percent: savings_percent(total, uk_total),
                clinic,
                lines,
                total,
                uk_total,
            }
        })
        .collect();

    comparisons.sort_by(|a, b| {
        a.total
            .cmp(&b.total)
            .then_with(|| b.clinic.rating.cmp(&a.clinic.rating))
            .then_with(|| a.clinic.name.as_str().cmp(b.clinic.name.as_str()))
    });
    Ok(comparisons)
}

#[cfg(test)]
mod basket_tests {
    use super::*;

    #[test]
    fn basket_merges_duplicates() {
        let basket = parse_basket(&["3:2".into(), "5".into(), "3:1".into()]).unwrap();
        assert_eq!(
            basket,
            vec![
                (TreatmentId::new(3).unwrap(), 3),
                (TreatmentId::new(5).unwrap(), 1)
            ]
        );
    }

    #[test]
    fn basket_rejects_bad_quantities() {
        assert!(parse_basket(&["3:0".into()]).is_err());
        assert!(parse_basket(&["x:1".into()]).is_err());
    }

    #[test]
    fn basket_caps_merged_quantities() {
        assert!(parse_basket(&["3:20".into(), "3:12".into()]).is_ok());
        assert!(parse_basket(&["3:20".into(), "3:13".into()]).is_err());
        assert!(parse_basket(&["3:32".into(), "3".into()]).is_err());
    }
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::{CategoryName, TreatmentName};
    use crate::repository::mock::MockRepository;
    use crate::services::test_support::{clinic, patient_claims};

    fn treatment(id: i32, pounds: i64) -> Treatment {
        Treatment {
            id: TreatmentId::new(id).unwrap(),
            code: format!("T{id}"),
            name: TreatmentName::new(format!("Treatment {id}")).unwrap(),
            category: CategoryName::new("General").unwrap(),
            base_price: Money::from_pounds(pounds),
            description: None,
        }
    }

    #[test]
    fn every_verified_clinic_is_priced_and_sorted() {
        let mut repo = MockRepository::new();
        repo.expect_get_treatments_by_ids()
            .returning(|_| Ok(vec![treatment(1, 100), treatment(2, 50)]));
        repo.expect_list_prices_for_treatments().returning(|_| {
            Ok(vec![ClinicTreatmentPrice {
                clinic_id: ClinicId::new(2).unwrap(),
                treatment_id: TreatmentId::new(1).unwrap(),
                price: Money::from_pounds(60),
            }])
        });
        repo.expect_list_clinics()
            .withf(|query| query.verified_only)
            .returning(|_| {
                Ok((
                    3,
                    vec![
                        clinic(1, "Beta Dental", 40, 100),
                        clinic(2, "Alpha Dental", 45, 100),
                        clinic(3, "Gamma Dental", 48, 80),
                    ],
                ))
            });

        let basket = vec![
            (TreatmentId::new(1).unwrap(), 2),
            (TreatmentId::new(2).unwrap(), 1),
        ];
        let result = compare_clinics(&repo, &basket).unwrap();

        let order: Vec<i32> = result.iter().map(|c| c.clinic.id.get()).collect();
        // Alpha: 2 × 60 + 50 = 170; Gamma: 2 × 80 + 40 = 200; Beta: 250.
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(result[0].total, Money::from_pounds(170));
        assert_eq!(result[2].uk_total, Money::from_pounds(625));
    }

    #[test]
    fn equal_totals_prefer_rating() {
        let mut repo = MockRepository::new();
        repo.expect_get_treatments_by_ids()
            .returning(|_| Ok(vec![treatment(1, 100)]));
        repo.expect_list_prices_for_treatments()
            .returning(|_| Ok(vec![]));
        repo.expect_list_clinics().returning(|_| {
            Ok((
                2,
                vec![clinic(1, "Low", 30, 100), clinic(2, "High", 49, 100)],
            ))
        });
        let result = compare_clinics(&repo, &[(TreatmentId::new(1).unwrap(), 1)]).unwrap();
        assert_eq!(result[0].clinic.name.as_str(), "High");
    }

    #[test]
    fn clinic_catalog_applies_price_factor_and_overrides() {
        use crate::domain::auth::Portal;
        use crate::services::test_support::{clinic_claims, user};

        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|email| Ok(Some(user(3, email.as_str(), Portal::Clinic))));
        repo.expect_list_clinics_for_staff()
            .returning(|_| Ok(vec![clinic(4, "Delta Dental", 42, 50)]));
        repo.expect_list_clinic_prices().returning(|_| {
            Ok(vec![ClinicTreatmentPrice {
                clinic_id: ClinicId::new(4).unwrap(),
                treatment_id: TreatmentId::new(2).unwrap(),
                price: Money::from_pounds(10),
            }])
        });
        repo.expect_list_treatments()
            .returning(|_| Ok(vec![treatment(1, 100), treatment(2, 50)]));
        repo.expect_list_packages()
            .withf(|query| !query.active_only)
            .returning(|_| Ok(vec![]));
        repo.expect_get_treatments_by_ids().returning(|_| Ok(vec![]));
        repo.expect_list_prices_for_treatments()
            .returning(|_| Ok(vec![]));

        let page = clinic_catalog(&repo, &clinic_claims(), None).unwrap();
        assert_eq!(page.clinic.id.get(), 4);
        assert_eq!(page.prices[0].price, Money::from_pounds(50));
        assert!(!page.prices[0].has_override);
        assert_eq!(page.prices[1].price, Money::from_pounds(10));
        assert!(page.prices[1].has_override);
    }

    #[test]
    fn only_admins_create_treatments() {
        let repo = MockRepository::new();
        let form = TreatmentForm {
            code: "CROWN".into(),
            name: "Crown".into(),
            category: "Crowns".into(),
            base_price: "180".into(),
            description: None,
        };
        assert!(matches!(
            create_treatment(&repo, &patient_claims(), form),
            Err(ServiceError::Unauthorized)
        ));
    }
}

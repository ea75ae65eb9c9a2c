//! Fixed-price treatment packages and their items.

use std::collections::HashMap;

use diesel::prelude::*;

use crate::{
    domain::{
        package::{NewPackage, TreatmentPackage},
        types::PackageId,
    },
    models::package::{
        NewPackage as DbNewPackage, Package as DbPackage, PackageItem as DbPackageItem,
        UpdatePackage as DbUpdatePackage, package_into_domain,
    },
    repository::{
        DieselRepository, PackageListQuery, PackageReader, PackageWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn item_rows(package_id: i32, package: &NewPackage) -> Vec<DbPackageItem> {
    package
        .items
        .iter()
        .map(|item| DbPackageItem {
            package_id,
            treatment_id: item.treatment_id.get(),
            quantity: item.quantity,
        })
        .collect()
}

fn load_package(
    conn: &mut SqliteConnection,
    package_id: i32,
) -> Result<Option<(DbPackage, Vec<DbPackageItem>)>, diesel::result::Error> {
    use crate::schema::{package_items, packages};

    let Some(package) = packages::table
        .find(package_id)
        .first::<DbPackage>(conn)
        .optional()?
    else {
        return Ok(None);
    };
    let items = package_items::table
        .filter(package_items::package_id.eq(package.id))
        .order(package_items::treatment_id.asc())
        .load::<DbPackageItem>(conn)?;
    Ok(Some((package, items)))
}

impl PackageReader for DieselRepository {
    fn get_package_by_id(&self, id: PackageId) -> RepositoryResult<Option<TreatmentPackage>> {
        let mut conn = self.conn()?;
        match load_package(&mut conn, id.get())? {
            Some((package, items)) => Ok(Some(package_into_domain(package, items)?)),
            None => Ok(None),
        }
    }

    fn list_packages(&self, query: PackageListQuery) -> RepositoryResult<Vec<TreatmentPackage>> {
        use crate::schema::{package_items, packages};

        let mut conn = self.conn()?;
        let mut items = packages::table.into_boxed();
        if let Some(clinic_id) = query.clinic_id {
            items = items.filter(packages::clinic_id.eq(clinic_id.get()));
        }
        if query.active_only {
            items = items.filter(packages::active.eq(true));
        }
        let packages = items
            .order((packages::price.asc(), packages::id.asc()))
            .load::<DbPackage>(&mut conn)?;

        let ids: Vec<i32> = packages.iter().map(|package| package.id).collect();
        let mut items_by_package: HashMap<i32, Vec<DbPackageItem>> = HashMap::new();
        for item in package_items::table
            .filter(package_items::package_id.eq_any(&ids))
            .order(package_items::treatment_id.asc())
            .load::<DbPackageItem>(&mut conn)?
        {
            items_by_package.entry(item.package_id).or_default().push(item);
        }

        packages
            .into_iter()
            .map(|package| {
                let items = items_by_package.remove(&package.id).unwrap_or_default();
                package_into_domain(package, items).map_err(RepositoryError::from)
            })
            .collect()
    }
}

impl PackageWriter for DieselRepository {
    fn create_package(&self, new_package: &NewPackage) -> RepositoryResult<TreatmentPackage> {
        use crate::schema::{package_items, packages};

        let mut conn = self.conn()?;
        let (package, items) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let package = diesel::insert_into(packages::table)
                .values(&DbNewPackage {
                    clinic_id: new_package.clinic_id.get(),
                    name: new_package.name.as_str(),
                    description: new_package.description.as_ref().map(|d| d.as_str()),
                    price: new_package.price.pence(),
                    hotel_nights: new_package.hotel_nights,
                })
                .get_result::<DbPackage>(conn)?;
            let items = item_rows(package.id, new_package);
            diesel::insert_into(package_items::table)
                .values(&items)
                .execute(conn)?;
            Ok((package, items))
        })?;

        Ok(package_into_domain(package, items)?)
    }

    fn update_package(
        &self,
        id: PackageId,
        updates: &NewPackage,
    ) -> RepositoryResult<TreatmentPackage> {
        use crate::schema::{package_items, packages};

        let mut conn = self.conn()?;
        let (package, items) = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let package = diesel::update(packages::table.find(id.get()))
                .set(&DbUpdatePackage {
                    name: updates.name.as_str(),
                    description: updates.description.as_ref().map(|d| d.as_str()),
                    price: updates.price.pence(),
                    hotel_nights: updates.hotel_nights,
                })
                .get_result::<DbPackage>(conn)?;
            diesel::delete(package_items::table.filter(package_items::package_id.eq(package.id)))
                .execute(conn)?;
            let items = item_rows(package.id, updates);
            diesel::insert_into(package_items::table)
                .values(&items)
                .execute(conn)?;
            Ok((package, items))
        })?;

        Ok(package_into_domain(package, items)?)
    }

    fn set_package_active(&self, id: PackageId, active: bool) -> RepositoryResult<()> {
        use crate::schema::packages;

        let mut conn = self.conn()?;
        let affected = diesel::update(packages::table.find(id.get()))
            .set(packages::active.eq(active))
            .execute(&mut conn)?;
        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

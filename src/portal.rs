use tracing::debug;

use crate::domain::TDError;
use crate::filter::{RegionClassifier, RegionTable};
use crate::loader::Dataset;
use crate::records::{Account, Booking, Supplier};
use crate::section::{Section, SectionView};
use crate::session::{Route, Session, guard};

const SUPPLIER_SEARCH: &[&str] = &["name", "company.name", "company.city", "email"];
const ACCOUNT_SEARCH: &[&str] = &["name", "email", "company.name"];
const BOOKING_SEARCH: &[&str] = &["reference", "guest", "supplier", "city"];

/// The sections of one dashboard, built for one session.
pub struct Portal {
    route: Route,
    session: Session,
    suppliers: Option<Section<Supplier>>,
    accounts: Option<Section<Account>>,
    monitoring: Option<Section<Booking>>,
}

impl Portal {
    pub fn open(session: Session, dataset: &Dataset) -> Result<Self, TDError> {
        let route = guard(Some(&session), session.role.dashboard());
        let mut portal = Portal {
            route,
            session,
            suppliers: None,
            accounts: None,
            monitoring: None,
        };

        match route {
            Route::AdminDashboard => {
                portal.suppliers = Some(suppliers_section(Vec::new())?);
                portal.accounts = Some(
                    Section::new("accounts", Vec::new()).with_search_fields(ACCOUNT_SEARCH)?,
                );
                portal.monitoring = Some(monitoring_section(Vec::new())?);
            }
            Route::UserDashboard => {
                portal.suppliers = Some(suppliers_section(Vec::new())?);
                portal.monitoring = Some(monitoring_section(Vec::new())?);
            }
            Route::HotelDashboard => {
                portal.monitoring = Some(monitoring_section(Vec::new())?);
            }
            Route::Login => {}
        }
        portal.refresh(dataset);
        Ok(portal)
    }

    /// Swaps in fresh base collections. Filter criteria are kept.
    pub fn refresh(&mut self, dataset: &Dataset) {
        let route = self.route;
        let session = &self.session;
        if let Some(section) = self.suppliers.as_mut() {
            section.replace_base_collection(scope_suppliers(route, &dataset.suppliers));
        }
        if let Some(section) = self.accounts.as_mut() {
            section.replace_base_collection(dataset.accounts.clone());
        }
        if let Some(section) = self.monitoring.as_mut() {
            section.replace_base_collection(scope_bookings(route, session, &dataset.bookings));
        }
        debug!("Refreshed {} sections for {:?}", self.len(), route);
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections().into_iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn section(&self, idx: usize) -> Option<&dyn SectionView> {
        self.sections().get(idx).copied()
    }

    pub fn section_mut(&mut self, idx: usize) -> Option<&mut dyn SectionView> {
        let mut sections: Vec<&mut dyn SectionView> = Vec::with_capacity(3);
        if let Some(s) = self.suppliers.as_mut() {
            sections.push(s);
        }
        if let Some(s) = self.accounts.as_mut() {
            sections.push(s);
        }
        if let Some(s) = self.monitoring.as_mut() {
            sections.push(s);
        }
        sections.into_iter().nth(idx)
    }

    fn sections(&self) -> Vec<&dyn SectionView> {
        let mut sections: Vec<&dyn SectionView> = Vec::with_capacity(3);
        if let Some(s) = self.suppliers.as_ref() {
            sections.push(s);
        }
        if let Some(s) = self.accounts.as_ref() {
            sections.push(s);
        }
        if let Some(s) = self.monitoring.as_ref() {
            sections.push(s);
        }
        sections
    }
}

fn suppliers_section(records: Vec<Supplier>) -> Result<Section<Supplier>, TDError> {
    Ok(Section::new("suppliers", records)
        .with_search_fields(SUPPLIER_SEARCH)?
        .with_classifier(RegionClassifier::new(
            RegionTable::philippines(),
            "company.city",
        )))
}

fn monitoring_section(records: Vec<Booking>) -> Result<Section<Booking>, TDError> {
    Ok(Section::new("monitoring", records)
        .with_search_fields(BOOKING_SEARCH)?
        .with_classifier(RegionClassifier::new(RegionTable::philippines(), "city")))
}

fn scope_suppliers(route: Route, suppliers: &[Supplier]) -> Vec<Supplier> {
    match route {
        Route::UserDashboard => suppliers
            .iter()
            .filter(|s| {
                s.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case("land transport"))
            })
            .cloned()
            .collect(),
        _ => suppliers.to_vec(),
    }
}

fn scope_bookings(route: Route, session: &Session, bookings: &[Booking]) -> Vec<Booking> {
    let owned_by = |value: Option<&str>, owner: Option<&str>| match (value, owner) {
        (Some(v), Some(o)) => v.trim().eq_ignore_ascii_case(o.trim()),
        _ => false,
    };
    match route {
        Route::UserDashboard => bookings
            .iter()
            .filter(|b| owned_by(b.account.as_deref(), Some(session.email.as_str())))
            .cloned()
            .collect(),
        Route::HotelDashboard => bookings
            .iter()
            .filter(|b| owned_by(b.supplier.as_deref(), session.company.as_deref()))
            .cloned()
            .collect(),
        Route::AdminDashboard => bookings.to_vec(),
        Route::Login => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Status;
    use crate::section::CountScope;
    use crate::session::authenticate;
    use std::path::PathBuf;

    fn dataset() -> Dataset {
        Dataset::load(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")).unwrap()
    }

    fn portal_for(email: &str) -> Portal {
        let dataset = dataset();
        let session = authenticate(&dataset.accounts, email, "pw").unwrap();
        Portal::open(session, &dataset).unwrap()
    }

    #[test]
    fn admin_sees_every_section() {
        let portal = portal_for("admin@traveldesk.ph");
        assert_eq!(portal.route(), Route::AdminDashboard);
        assert_eq!(
            portal.section_names(),
            vec!["suppliers", "accounts", "monitoring"]
        );
        let monitoring = portal.section(2).unwrap();
        assert_eq!(monitoring.base_len(), 5);
    }

    #[test]
    fn corporate_sees_land_transport_and_own_bookings() {
        let portal = portal_for("booker@globex.ph");
        assert_eq!(portal.route(), Route::UserDashboard);
        assert_eq!(portal.section_names(), vec!["suppliers", "monitoring"]);

        let suppliers = portal.section(0).unwrap();
        for row in suppliers.rows().iter() {
            assert_eq!(suppliers.cell(*row, "category"), "land transport");
        }
        let monitoring = portal.section(1).unwrap();
        assert_eq!(monitoring.base_len(), 3);
    }

    #[test]
    fn hotel_partner_sees_bookings_of_its_company() {
        let portal = portal_for("frontdesk@bluewaterresort.ph");
        assert_eq!(portal.section_names(), vec!["monitoring"]);
        let monitoring = portal.section(0).unwrap();
        assert_eq!(monitoring.base_len(), 2);
        let counts = monitoring.counts(CountScope::Base);
        assert_eq!(counts.groups["Visayas"], 2);
    }

    #[test]
    fn refresh_keeps_criteria() {
        let mut portal = portal_for("admin@traveldesk.ph");
        let section = portal.section_mut(0).unwrap();
        section.set_search_text("acme");
        section.set_status_filter(Status::Active);
        assert_eq!(section.rows().len(), 2);

        let mut dataset = dataset();
        dataset.suppliers.truncate(1);
        portal.refresh(&dataset);

        let section = portal.section(0).unwrap();
        assert_eq!(section.criteria().search_text, "acme");
        assert_eq!(section.criteria().status_filter, Some(Status::Active));
        assert_eq!(section.base_len(), 1);
        assert_eq!(section.rows().len(), 1);
    }
}

use tracing::{debug, info, warn};

use crate::domain::TDError;
use crate::records::{Account, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Corporate,
    HotelPartner,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Some(Role::Admin),
            "corporate" | "user" | "land transport" => Some(Role::Corporate),
            "hotel" | "hotel partner" | "partner" => Some(Role::HotelPartner),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Corporate => "corporate",
            Role::HotelPartner => "hotel",
        }
    }

    pub fn dashboard(&self) -> Route {
        match self {
            Role::Admin => Route::AdminDashboard,
            Role::Corporate => Route::UserDashboard,
            Role::HotelPartner => Route::HotelDashboard,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub company: Option<String>,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    AdminDashboard,
    UserDashboard,
    HotelDashboard,
}

impl Route {
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::AdminDashboard => "Admin",
            Route::UserDashboard => "Land transport",
            Route::HotelDashboard => "Hotel partner",
        }
    }
}

/// Mocked login: any non-empty password opens an active account with a known role.
pub fn authenticate(accounts: &[Account], email: &str, password: &str) -> Result<Session, TDError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(TDError::LoginFailed("email is required".into()));
    }
    if password.is_empty() {
        return Err(TDError::LoginFailed("password is required".into()));
    }

    let account = accounts
        .iter()
        .find(|a| {
            a.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(email))
        })
        .ok_or_else(|| TDError::LoginFailed(format!("unknown account {email}")))?;

    if account.status != Some(Status::Active) {
        warn!("Login refused for {email}: account is not active");
        return Err(TDError::LoginFailed(format!("account {email} is not active")));
    }
    let role = account
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| TDError::LoginFailed(format!("account {email} has no known role")))?;

    info!("Logged in {email} as {}", role.label());
    Ok(Session {
        email: email.to_lowercase(),
        name: account.name.clone().unwrap_or_else(|| email.to_string()),
        role,
        company: account.company.as_ref().and_then(|c| c.name.clone()),
        token: format!("mock-{}-{}", role.label(), account.id),
    })
}

/// Resolves where a request for `requested` actually lands.
pub fn guard(session: Option<&Session>, requested: Route) -> Route {
    match session {
        None => Route::Login,
        Some(session) => {
            let own = session.role.dashboard();
            if requested != own {
                debug!("Redirecting {} from {:?} to {:?}", session.email, requested, own);
            }
            own
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Company;

    fn account(id: &str, email: &str, role: &str, status: Status) -> Account {
        Account {
            id: id.into(),
            name: Some(format!("User {id}")),
            email: Some(email.into()),
            role: Some(role.into()),
            status: Some(status),
            company: Some(Company {
                name: Some(format!("Company {id}")),
                city: None,
            }),
        }
    }

    fn accounts() -> Vec<Account> {
        vec![
            account("1", "admin@desk.ph", "admin", Status::Active),
            account("2", "booker@globex.ph", "corporate", Status::Active),
            account("3", "front@resort.ph", "Hotel", Status::Active),
            account("4", "gone@desk.ph", "admin", Status::Inactive),
            account("5", "odd@desk.ph", "auditor", Status::Active),
        ]
    }

    #[test]
    fn login_issues_stub_token() {
        let session = authenticate(&accounts(), " Admin@Desk.ph ", "secret").unwrap();
        assert_eq!(session.role, Role::Admin);
        assert_eq!(session.email, "admin@desk.ph");
        assert_eq!(session.token, "mock-admin-1");
        assert_eq!(session.company.as_deref(), Some("Company 1"));
    }

    #[test]
    fn login_rejects_bad_input() {
        let accounts = accounts();
        for (email, password) in [
            ("", "x"),
            ("admin@desk.ph", ""),
            ("nobody@desk.ph", "x"),
            ("gone@desk.ph", "x"),
            ("odd@desk.ph", "x"),
        ] {
            assert!(matches!(
                authenticate(&accounts, email, password),
                Err(TDError::LoginFailed(_))
            ));
        }
    }

    #[test]
    fn guard_redirects_to_own_dashboard() {
        assert_eq!(guard(None, Route::AdminDashboard), Route::Login);
        assert_eq!(guard(None, Route::Login), Route::Login);

        let hotel = authenticate(&accounts(), "front@resort.ph", "x").unwrap();
        assert_eq!(guard(Some(&hotel), Route::Login), Route::HotelDashboard);
        assert_eq!(guard(Some(&hotel), Route::AdminDashboard), Route::HotelDashboard);
        assert_eq!(guard(Some(&hotel), Route::HotelDashboard), Route::HotelDashboard);

        let booker = authenticate(&accounts(), "booker@globex.ph", "x").unwrap();
        assert_eq!(guard(Some(&booker), Route::UserDashboard), Route::UserDashboard);
    }
}

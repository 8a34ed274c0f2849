use std::fmt;

use crate::loader::Row;

/// Status of a record. Parsing never fails, unknown labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Active,
    Pending,
    Inactive,
    Other(String),
}

impl Status {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Status> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let status = match trimmed.to_lowercase().as_str() {
            "active" => Status::Active,
            "pending" => Status::Pending,
            "inactive" => Status::Inactive,
            _ => Status::Other(trimmed.to_string()),
        };
        Some(status)
    }

    pub fn label(&self) -> &str {
        match self {
            Status::Active => "active",
            Status::Pending => "pending",
            Status::Inactive => "inactive",
            Status::Other(s) => s,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A typed domain item shown in a section.
pub trait Record: Send + Sync {
    /// Field paths in display order. Search fields are validated against this list.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> &str;

    fn status(&self) -> Option<&Status>;

    /// Text value of a field path, `None` for missing, non-text or unknown fields.
    fn field(&self, path: &str) -> Option<&str>;

    /// Rendered cell text for a column in `FIELDS` or one of `id` / `status`.
    fn display(&self, column: &str) -> String {
        match column {
            "id" => self.id().to_string(),
            "status" => self
                .status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| NULL_CELL.to_string()),
            path => self.field(path).unwrap_or(NULL_CELL).to_string(),
        }
    }

    /// Field/value pairs for the record view.
    fn details(&self) -> Vec<(String, String)> {
        let mut details = vec![
            ("id".to_string(), self.display("id")),
            ("status".to_string(), self.display("status")),
        ];
        details.extend(
            Self::FIELDS
                .iter()
                .map(|f| (f.to_string(), self.display(f))),
        );
        details
    }
}

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> Self;
}

pub const NULL_CELL: &str = "∅";

fn owned(row: &Row<'_>, column: &str) -> Option<String> {
    row.get(column)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Company {
    pub name: Option<String>,
    pub city: Option<String>,
}

impl Company {
    fn from_row(row: &Row<'_>) -> Option<Company> {
        let company = Company {
            name: owned(row, "company.name"),
            city: owned(row, "company.city"),
        };
        (company.name.is_some() || company.city.is_some()).then_some(company)
    }

    fn field<'a>(company: &'a Option<Company>, key: &str) -> Option<&'a str> {
        let company = company.as_ref()?;
        match key {
            "name" => company.name.as_deref(),
            "city" => company.city.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Supplier {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub status: Option<Status>,
    pub company: Option<Company>,
}

impl Record for Supplier {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "company.name",
        "company.city",
        "category",
        "email",
        "phone",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    fn field(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("company", rest)) => Company::field(&self.company, rest),
            Some(_) => None,
            None => match path {
                "name" => self.name.as_deref(),
                "email" => self.email.as_deref(),
                "phone" => self.phone.as_deref(),
                "category" => self.category.as_deref(),
                _ => None,
            },
        }
    }
}

impl FromRow for Supplier {
    fn from_row(row: &Row<'_>) -> Self {
        Supplier {
            id: owned(row, "id").unwrap_or_default(),
            name: owned(row, "name"),
            email: owned(row, "email"),
            phone: owned(row, "phone"),
            category: owned(row, "category"),
            status: row.get("status").and_then(Status::parse),
            company: Company::from_row(row),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<Status>,
    pub company: Option<Company>,
}

impl Record for Account {
    const FIELDS: &'static [&'static str] =
        &["name", "email", "role", "company.name", "company.city"];

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    fn field(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("company", rest)) => Company::field(&self.company, rest),
            Some(_) => None,
            None => match path {
                "name" => self.name.as_deref(),
                "email" => self.email.as_deref(),
                "role" => self.role.as_deref(),
                _ => None,
            },
        }
    }
}

impl FromRow for Account {
    fn from_row(row: &Row<'_>) -> Self {
        Account {
            id: owned(row, "id").unwrap_or_default(),
            name: owned(row, "name"),
            email: owned(row, "email"),
            role: owned(row, "role"),
            status: row.get("status").and_then(Status::parse),
            company: Company::from_row(row),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Booking {
    pub id: String,
    pub reference: Option<String>,
    pub guest: Option<String>,
    pub account: Option<String>,
    pub supplier: Option<String>,
    pub city: Option<String>,
    pub status: Option<Status>,
    pub amount: Option<f64>,
}

impl Record for Booking {
    const FIELDS: &'static [&'static str] =
        &["reference", "guest", "supplier", "city", "account", "amount"];

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    // `amount` is numeric and therefore never searchable.
    fn field(&self, path: &str) -> Option<&str> {
        match path {
            "reference" => self.reference.as_deref(),
            "guest" => self.guest.as_deref(),
            "account" => self.account.as_deref(),
            "supplier" => self.supplier.as_deref(),
            "city" => self.city.as_deref(),
            _ => None,
        }
    }

    fn display(&self, column: &str) -> String {
        match column {
            "amount" => self
                .amount
                .map(|a| format!("{a:.2}"))
                .unwrap_or_else(|| NULL_CELL.to_string()),
            "id" => self.id.clone(),
            "status" => self
                .status
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| NULL_CELL.to_string()),
            path => self.field(path).unwrap_or(NULL_CELL).to_string(),
        }
    }
}

impl FromRow for Booking {
    fn from_row(row: &Row<'_>) -> Self {
        Booking {
            id: owned(row, "id").unwrap_or_default(),
            reference: owned(row, "reference"),
            guest: owned(row, "guest"),
            account: owned(row, "account"),
            supplier: owned(row, "supplier"),
            city: owned(row, "city"),
            status: row.get("status").and_then(Status::parse),
            amount: row.get("amount").and_then(|a| a.trim().parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_is_total() {
        assert_eq!(Status::parse("Active"), Some(Status::Active));
        assert_eq!(Status::parse(" pending "), Some(Status::Pending));
        assert_eq!(Status::parse("INACTIVE"), Some(Status::Inactive));
        assert_eq!(
            Status::parse("suspended"),
            Some(Status::Other("suspended".to_string()))
        );
        assert_eq!(Status::parse("   "), None);
    }

    #[test]
    fn dotted_fields_reach_into_company() {
        let supplier = Supplier {
            id: "7".into(),
            company: Some(Company {
                name: Some("Acme Tours".into()),
                city: None,
            }),
            ..Default::default()
        };
        assert_eq!(supplier.field("company.name"), Some("Acme Tours"));
        assert_eq!(supplier.field("company.city"), None);
        assert_eq!(supplier.field("company.country"), None);
        assert_eq!(supplier.field("owner.name"), None);
    }

    #[test]
    fn numeric_fields_are_not_text() {
        let booking = Booking {
            id: "b1".into(),
            amount: Some(1200.5),
            ..Default::default()
        };
        assert_eq!(booking.field("amount"), None);
        assert_eq!(booking.display("amount"), "1200.50");
        assert_eq!(booking.display("status"), NULL_CELL);
    }

    #[test]
    fn details_start_with_id_and_status() {
        let account = Account {
            id: "a1".into(),
            status: Some(Status::Active),
            email: Some("ops@example.com".into()),
            ..Default::default()
        };
        let details = account.details();
        assert_eq!(details[0], ("id".to_string(), "a1".to_string()));
        assert_eq!(details[1], ("status".to_string(), "active".to_string()));
        assert_eq!(details.len(), 2 + Account::FIELDS.len());
    }
}

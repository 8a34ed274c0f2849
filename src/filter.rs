//! Search, status filtering and aggregation over typed records.
//!
//! Everything here is pure. Missing or malformed fields exclude a record
//! from a match or a count, they never fail.

use std::collections::BTreeMap;

use crate::records::{Record, Status};

/// Criteria of one section. Created empty, changed only by its owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub status_filter: Option<Status>,
    pub search_text: String,
}

impl FilterCriteria {
    /// Selecting the active status clears it, any other status replaces it.
    pub fn select_status(&mut self, status: Status) {
        if self.status_filter.as_ref() == Some(&status) {
            self.status_filter = None;
        } else {
            self.status_filter = Some(status);
        }
    }

    pub fn clear(&mut self) {
        self.status_filter = None;
        self.search_text.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.status_filter.is_none() && self.search_text.trim().is_empty()
    }
}

/// Case-insensitive substring match of `query` against any of `fields`.
/// The query is trimmed first, so `" west "` matches "Acme West".
/// Missing and non-text fields count as empty.
pub fn matches<R: Record + ?Sized>(record: &R, query: &str, fields: &[&str]) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let query = query.to_lowercase();
    fields.iter().any(|f| {
        record
            .field(f)
            .unwrap_or_default()
            .to_lowercase()
            .contains(&query)
    })
}

pub fn matches_status<R: Record + ?Sized>(record: &R, selected: Option<&Status>) -> bool {
    match selected {
        None => true,
        Some(s) => record.status() == Some(s),
    }
}

pub fn search<'a, R: Record + 'a>(
    records: impl IntoIterator<Item = &'a R>,
    query: &str,
    fields: &[&str],
) -> Vec<&'a R> {
    records
        .into_iter()
        .filter(|r| matches(*r, query, fields))
        .collect()
}

pub fn apply_status_filter<'a, R: Record + 'a>(
    records: impl IntoIterator<Item = &'a R>,
    selected: Option<&Status>,
) -> Vec<&'a R> {
    records
        .into_iter()
        .filter(|r| matches_status(*r, selected))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub active: usize,
    pub pending: usize,
    pub inactive: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.active + self.pending + self.inactive
    }
}

pub fn count_by_status<'a, R: Record + 'a>(
    records: impl IntoIterator<Item = &'a R>,
) -> StatusCounts {
    records
        .into_iter()
        .fold(StatusCounts::default(), |mut counts, r| {
            match r.status() {
                Some(Status::Active) => counts.active += 1,
                Some(Status::Pending) => counts.pending += 1,
                Some(Status::Inactive) => counts.inactive += 1,
                Some(Status::Other(_)) | None => {}
            }
            counts
        })
}

/// Secondary grouping of records. Must be total: every record lands in one
/// of `buckets()`.
pub trait Classifier<R: ?Sized>: Send + Sync {
    fn buckets(&self) -> Vec<&str>;
    fn classify(&self, record: &R) -> &str;
}

/// Counts per bucket, zero-filled for every bucket the classifier knows.
pub fn count_groups<'a, R: Record + 'a>(
    records: impl IntoIterator<Item = &'a R>,
    classifier: &dyn Classifier<R>,
) -> BTreeMap<String, usize> {
    let mut groups: BTreeMap<String, usize> = classifier
        .buckets()
        .into_iter()
        .map(|b| (b.to_string(), 0))
        .collect();
    for r in records {
        *groups.entry(classifier.classify(r).to_string()).or_insert(0) += 1;
    }
    groups
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Region {
    NcrLuzon,
    Visayas,
    Mindanao,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::NcrLuzon, Region::Visayas, Region::Mindanao];

    pub fn label(&self) -> &'static str {
        match self {
            Region::NcrLuzon => "NCR/Luzon",
            Region::Visayas => "Visayas",
            Region::Mindanao => "Mindanao",
        }
    }
}

/// Substring lookup from city names to regions, with a fallback region.
#[derive(Debug, Clone)]
pub struct RegionTable {
    entries: Vec<(String, Region)>,
    default: Region,
}

impl RegionTable {
    pub fn new(entries: &[(&str, Region)], default: Region) -> Self {
        RegionTable {
            entries: entries
                .iter()
                .map(|(needle, region)| (needle.to_lowercase(), *region))
                .collect(),
            default,
        }
    }

    pub fn philippines() -> Self {
        use Region::*;
        RegionTable::new(
            &[
                ("cebu", Visayas),
                ("mandaue", Visayas),
                ("lapu-lapu", Visayas),
                ("iloilo", Visayas),
                ("bacolod", Visayas),
                ("tacloban", Visayas),
                ("dumaguete", Visayas),
                ("tagbilaran", Visayas),
                ("bohol", Visayas),
                ("boracay", Visayas),
                ("roxas", Visayas),
                ("davao", Mindanao),
                ("cagayan de oro", Mindanao),
                ("zamboanga", Mindanao),
                ("general santos", Mindanao),
                ("butuan", Mindanao),
                ("iligan", Mindanao),
                ("cotabato", Mindanao),
                ("surigao", Mindanao),
                ("siargao", Mindanao),
                ("manila", NcrLuzon),
                ("quezon", NcrLuzon),
                ("makati", NcrLuzon),
                ("taguig", NcrLuzon),
                ("pasig", NcrLuzon),
                ("baguio", NcrLuzon),
                ("clark", NcrLuzon),
                ("batangas", NcrLuzon),
            ],
            NcrLuzon,
        )
    }

    /// First matching entry wins, unmatched and missing input falls back.
    pub fn lookup(&self, city: Option<&str>) -> Region {
        let Some(city) = city else {
            return self.default;
        };
        let city = city.to_lowercase();
        self.entries
            .iter()
            .find(|(needle, _)| city.contains(needle.as_str()))
            .map(|(_, region)| *region)
            .unwrap_or(self.default)
    }
}

/// Groups records by the region of one of their text fields.
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    table: RegionTable,
    field: &'static str,
}

impl RegionClassifier {
    pub fn new(table: RegionTable, field: &'static str) -> Self {
        RegionClassifier { table, field }
    }
}

impl<R: Record + ?Sized> Classifier<R> for RegionClassifier {
    fn buckets(&self) -> Vec<&str> {
        Region::ALL.iter().map(Region::label).collect()
    }

    fn classify(&self, record: &R) -> &str {
        self.table.lookup(record.field(self.field)).label()
    }
}

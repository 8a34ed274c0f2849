use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::trace;

use crate::domain::TDError;
use crate::filter::{Classifier, FilterCriteria, StatusCounts, count_by_status, count_groups};
use crate::filter::{matches, matches_status};
use crate::records::{Record, Status};

// Base collections above this size are scanned on the rayon pool.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountScope {
    Base,
    Derived,
}

impl CountScope {
    pub fn toggled(self) -> Self {
        match self {
            CountScope::Base => CountScope::Derived,
            CountScope::Derived => CountScope::Base,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CountScope::Base => "all",
            CountScope::Derived => "filtered",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub status: StatusCounts,
    pub groups: BTreeMap<String, usize>,
    pub records: usize,
}

/// A named, independently filterable collection of records.
///
/// The derived view is a list of indices into the base collection and is
/// rebuilt from scratch on every criteria or base change.
pub struct Section<R: Record> {
    name: String,
    base: Arc<Vec<R>>,
    search_fields: Vec<&'static str>,
    classifier: Option<Box<dyn Classifier<R>>>,
    criteria: FilterCriteria,
    rows: Arc<Vec<usize>>,
}

impl<R: Record> Section<R> {
    pub fn new(name: impl Into<String>, records: Vec<R>) -> Self {
        let mut section = Section {
            name: name.into(),
            base: Arc::new(records),
            search_fields: R::FIELDS.to_vec(),
            classifier: None,
            criteria: FilterCriteria::default(),
            rows: Arc::new(Vec::new()),
        };
        section.recompute();
        section
    }

    /// Restricts search to `fields`, each of which must be one of `R::FIELDS`.
    pub fn with_search_fields(mut self, fields: &[&str]) -> Result<Self, TDError> {
        let mut validated = Vec::with_capacity(fields.len());
        for field in fields {
            let known = R::FIELDS
                .iter()
                .find(|f| *f == field)
                .ok_or_else(|| TDError::UnknownField {
                    section: self.name.clone(),
                    field: field.to_string(),
                })?;
            validated.push(*known);
        }
        self.search_fields = validated;
        self.recompute();
        Ok(self)
    }

    pub fn with_classifier(mut self, classifier: impl Classifier<R> + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn search_fields(&self) -> &[&'static str] {
        &self.search_fields
    }

    pub fn base(&self) -> &[R] {
        &self.base
    }

    /// Indices into `base()` of the records currently shown.
    pub fn rows(&self) -> Arc<Vec<usize>> {
        Arc::clone(&self.rows)
    }

    pub fn derived_view(&self) -> Vec<&R> {
        self.rows.iter().map(|&idx| &self.base[idx]).collect()
    }

    pub fn set_search_text(&mut self, text: &str) {
        self.criteria.search_text = text.to_string();
        self.recompute();
    }

    pub fn set_status_filter(&mut self, status: Status) {
        self.criteria.select_status(status);
        self.recompute();
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.recompute();
    }

    pub fn replace_base_collection(&mut self, records: Vec<R>) {
        self.base = Arc::new(records);
        self.recompute();
    }

    pub fn recompute(&mut self) {
        let base = &self.base;
        let query = self.criteria.search_text.as_str();
        let selected = self.criteria.status_filter.as_ref();
        let fields = self.search_fields.as_slice();
        let keep = |idx: &usize| {
            let record = &base[*idx];
            matches_status(record, selected) && matches(record, query, fields)
        };

        let rows: Vec<usize> = if base.len() > PARALLEL_SCAN_THRESHOLD {
            (0..base.len()).into_par_iter().filter(keep).collect()
        } else {
            (0..base.len()).filter(keep).collect()
        };
        trace!(
            "Section {}: {} of {} records match {:?}",
            self.name,
            rows.len(),
            base.len(),
            self.criteria
        );
        self.rows = Arc::new(rows);
    }

    pub fn counts(&self, scope: CountScope) -> Summary {
        let records: Vec<&R> = match scope {
            CountScope::Base => self.base.iter().collect(),
            CountScope::Derived => self.derived_view(),
        };
        Summary {
            status: count_by_status(records.iter().copied()),
            groups: self
                .classifier
                .as_deref()
                .map(|c| count_groups(records.iter().copied(), c))
                .unwrap_or_default(),
            records: records.len(),
        }
    }
}

/// Type-erased access used by the model and the UI.
pub trait SectionView {
    fn name(&self) -> &str;
    fn columns(&self) -> Vec<&'static str>;
    fn base_len(&self) -> usize;
    fn rows(&self) -> Arc<Vec<usize>>;
    fn cell(&self, row: usize, column: &str) -> String;
    fn details(&self, row: usize) -> Vec<(String, String)>;
    fn criteria(&self) -> &FilterCriteria;
    fn set_search_text(&mut self, text: &str);
    fn set_status_filter(&mut self, status: Status);
    fn clear_filters(&mut self);
    fn counts(&self, scope: CountScope) -> Summary;
}

impl<R: Record> SectionView for Section<R> {
    fn name(&self) -> &str {
        Section::name(self)
    }

    fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["id", "status"];
        columns.extend_from_slice(R::FIELDS);
        columns
    }

    fn base_len(&self) -> usize {
        self.base.len()
    }

    fn rows(&self) -> Arc<Vec<usize>> {
        Section::rows(self)
    }

    fn cell(&self, row: usize, column: &str) -> String {
        self.base
            .get(row)
            .map(|r| r.display(column))
            .unwrap_or_default()
    }

    fn details(&self, row: usize) -> Vec<(String, String)> {
        self.base.get(row).map(Record::details).unwrap_or_default()
    }

    fn criteria(&self) -> &FilterCriteria {
        Section::criteria(self)
    }

    fn set_search_text(&mut self, text: &str) {
        Section::set_search_text(self, text)
    }

    fn set_status_filter(&mut self, status: Status) {
        Section::set_status_filter(self, status)
    }

    fn clear_filters(&mut self) {
        Section::clear_filters(self)
    }

    fn counts(&self, scope: CountScope) -> Summary {
        Section::counts(self, scope)
    }
}

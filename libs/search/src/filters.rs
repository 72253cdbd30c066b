//! Search filters for the three searchable entities
//!
//! Each entity has its own filter struct with typed, optional fields.
//! Unset and blank fields impose no constraint and never reach the wire;
//! `page` and `page_size` are always sent.

use std::fmt;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};
use crate::models::{
    DoseNumber, PatientSearchResult, PatientStatus, PatientType, PaymentSearchResult, Sex,
    VaccinationSearchResult,
};

/// Default number of results per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// The searchable record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Patient,
    Vaccination,
    Payment,
}

impl EntityKind {
    /// Get the entity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patient => "patient",
            EntityKind::Vaccination => "vaccination",
            EntityKind::Payment => "payment",
        }
    }

    /// Path of the search endpoint, relative to the API root
    pub fn search_path(&self) -> &'static str {
        match self {
            EntityKind::Patient => "search/patients",
            EntityKind::Vaccination => "search/vaccinations",
            EntityKind::Payment => "search/payments",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page selection shared by every filter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

/// Identity of one cached result page: entity plus canonical query string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub entity: EntityKind,
    pub query: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{}", self.entity, self.query)
    }
}

/// A normalized request ready for a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub entity: EntityKind,
    /// Flat key/value query; no empty values
    pub query: Vec<(String, String)>,
}

impl SearchRequest {
    /// Path of the endpoint serving this request
    pub fn path(&self) -> &'static str {
        self.entity.search_path()
    }

    /// Value sent for `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Cache slot for this request
    ///
    /// Pairs are sorted by key, so two requests that differ only in
    /// field order share a slot.
    pub fn cache_key(&self) -> CacheKey {
        let mut pairs: Vec<&(String, String)> = self.query.iter().collect();
        pairs.sort();

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key, value);
        }

        CacheKey {
            entity: self.entity,
            query: serializer.finish(),
        }
    }
}

/// Collects query pairs, dropping absent and blank values
#[derive(Debug, Default)]
struct QueryPairs {
    pairs: Vec<(String, String)>,
}

impl QueryPairs {
    fn text(mut self, key: &str, value: &Option<String>) -> Self {
        if let Some(value) = value.as_deref().map(str::trim) {
            if !value.is_empty() {
                self.pairs.push((key.to_string(), value.to_string()));
            }
        }
        self
    }

    fn value<T: fmt::Display>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    fn date(self, key: &str, value: Option<NaiveDate>) -> Self {
        self.value(key, value.map(|d| d.format("%Y-%m-%d")))
    }

    fn finish(self) -> Vec<(String, String)> {
        self.pairs
    }
}

fn check_range<T: PartialOrd + fmt::Display>(
    name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), String> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(format!(
            "{} range is inverted: {} is after {}",
            name, min, max
        )),
        _ => Ok(()),
    }
}

/// Behaviour shared by the entity filter variants
pub trait SearchFilters: Clone + fmt::Debug + Send + Sync + 'static {
    /// Entity this filter searches
    const ENTITY: EntityKind;

    /// Item type of the result page
    type Item: DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    fn pagination(&self) -> &Pagination;

    fn pagination_mut(&mut self) -> &mut Pagination;

    /// Restrict results to one facility
    fn set_facility(&mut self, facility_id: Option<i64>);

    /// Entity-specific constraints, normalized
    fn constraint_pairs(&self) -> Vec<(String, String)>;

    /// Entity-specific consistency checks
    fn check_constraints(&self) -> Result<(), String> {
        Ok(())
    }

    /// Full wire query: constraints followed by `page` and `page_size`
    fn query_pairs(&self) -> Vec<(String, String)> {
        let pagination = self.pagination();
        let mut pairs = self.constraint_pairs();
        pairs.push(("page".to_string(), pagination.page.to_string()));
        pairs.push(("page_size".to_string(), pagination.page_size.to_string()));
        pairs
    }

    /// Whether any field other than pagination and facility is set
    fn has_constraints(&self) -> bool {
        self.constraint_pairs()
            .iter()
            .any(|(key, _)| key != "facility_id")
    }

    /// Reject filters the backend could never satisfy
    fn validate(&self) -> SearchResult<()> {
        let pagination = self.pagination();
        if pagination.page == 0 {
            return Err(SearchError::Validation(
                "page must be 1 or greater".to_string(),
            ));
        }
        if pagination.page_size == 0 {
            return Err(SearchError::Validation(
                "page_size must be 1 or greater".to_string(),
            ));
        }
        self.check_constraints().map_err(SearchError::Validation)
    }

    /// Build the backend request
    fn request(&self) -> SearchRequest {
        SearchRequest {
            entity: Self::ENTITY,
            query: self.query_pairs(),
        }
    }

    fn cache_key(&self) -> CacheKey {
        self.request().cache_key()
    }
}

/// Patient search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientFilters {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<Sex>,
    pub patient_type: Option<PatientType>,
    pub status: Option<PatientStatus>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub facility_id: Option<i64>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl SearchFilters for PatientFilters {
    const ENTITY: EntityKind = EntityKind::Patient;
    type Item = PatientSearchResult;

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    fn set_facility(&mut self, facility_id: Option<i64>) {
        self.facility_id = facility_id;
    }

    fn constraint_pairs(&self) -> Vec<(String, String)> {
        QueryPairs::default()
            .text("name", &self.name)
            .text("phone", &self.phone)
            .value("sex", self.sex)
            .value("patient_type", self.patient_type)
            .value("status", self.status)
            .value("age_min", self.age_min)
            .value("age_max", self.age_max)
            .date("created_from", self.created_from)
            .date("created_to", self.created_to)
            .value("facility_id", self.facility_id)
            .finish()
    }

    fn check_constraints(&self) -> Result<(), String> {
        check_range("age", self.age_min, self.age_max)?;
        check_range("created date", self.created_from, self.created_to)
    }
}

/// Vaccination search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaccinationFilters {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub vaccine_name: Option<String>,
    pub dose_number: Option<DoseNumber>,
    pub batch_number: Option<String>,
    pub dose_date_from: Option<NaiveDate>,
    pub dose_date_to: Option<NaiveDate>,
    pub facility_id: Option<i64>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl SearchFilters for VaccinationFilters {
    const ENTITY: EntityKind = EntityKind::Vaccination;
    type Item = VaccinationSearchResult;

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    fn set_facility(&mut self, facility_id: Option<i64>) {
        self.facility_id = facility_id;
    }

    fn constraint_pairs(&self) -> Vec<(String, String)> {
        QueryPairs::default()
            .text("patient_name", &self.patient_name)
            .text("patient_phone", &self.patient_phone)
            .text("vaccine_name", &self.vaccine_name)
            .value("dose_number", self.dose_number)
            .text("batch_number", &self.batch_number)
            .date("dose_date_from", self.dose_date_from)
            .date("dose_date_to", self.dose_date_to)
            .value("facility_id", self.facility_id)
            .finish()
    }

    fn check_constraints(&self) -> Result<(), String> {
        check_range("dose date", self.dose_date_from, self.dose_date_to)
    }
}

/// Payment search filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentFilters {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub vaccine_name: Option<String>,
    pub payment_method: Option<String>,
    pub reference_number: Option<String>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub payment_date_from: Option<NaiveDate>,
    pub payment_date_to: Option<NaiveDate>,
    pub facility_id: Option<i64>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl SearchFilters for PaymentFilters {
    const ENTITY: EntityKind = EntityKind::Payment;
    type Item = PaymentSearchResult;

    fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    fn set_facility(&mut self, facility_id: Option<i64>) {
        self.facility_id = facility_id;
    }

    fn constraint_pairs(&self) -> Vec<(String, String)> {
        QueryPairs::default()
            .text("patient_name", &self.patient_name)
            .text("patient_phone", &self.patient_phone)
            .text("vaccine_name", &self.vaccine_name)
            .text("payment_method", &self.payment_method)
            .text("reference_number", &self.reference_number)
            .value("amount_min", self.amount_min)
            .value("amount_max", self.amount_max)
            .date("payment_date_from", self.payment_date_from)
            .date("payment_date_to", self.payment_date_to)
            .value("facility_id", self.facility_id)
            .finish()
    }

    fn check_constraints(&self) -> Result<(), String> {
        let amounts = [self.amount_min, self.amount_max];
        if amounts.iter().flatten().any(|a| !a.is_finite()) {
            return Err("amounts must be finite numbers".to_string());
        }
        if amounts.iter().flatten().any(|a| *a < 0.0) {
            return Err("amounts cannot be negative".to_string());
        }
        check_range("amount", self.amount_min, self.amount_max)?;
        check_range("payment date", self.payment_date_from, self.payment_date_to)
    }
}

/// Filters for any entity, tagged by entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum EntityFilters {
    Patient(PatientFilters),
    Vaccination(VaccinationFilters),
    Payment(PaymentFilters),
}

impl EntityFilters {
    pub fn entity(&self) -> EntityKind {
        match self {
            EntityFilters::Patient(_) => EntityKind::Patient,
            EntityFilters::Vaccination(_) => EntityKind::Vaccination,
            EntityFilters::Payment(_) => EntityKind::Payment,
        }
    }

    pub fn pagination(&self) -> &Pagination {
        match self {
            EntityFilters::Patient(f) => f.pagination(),
            EntityFilters::Vaccination(f) => f.pagination(),
            EntityFilters::Payment(f) => f.pagination(),
        }
    }

    pub fn validate(&self) -> SearchResult<()> {
        match self {
            EntityFilters::Patient(f) => f.validate(),
            EntityFilters::Vaccination(f) => f.validate(),
            EntityFilters::Payment(f) => f.validate(),
        }
    }

    pub fn request(&self) -> SearchRequest {
        match self {
            EntityFilters::Patient(f) => f.request(),
            EntityFilters::Vaccination(f) => f.request(),
            EntityFilters::Payment(f) => f.request(),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        self.request().cache_key()
    }
}

impl From<PatientFilters> for EntityFilters {
    fn from(filters: PatientFilters) -> Self {
        EntityFilters::Patient(filters)
    }
}

impl From<VaccinationFilters> for EntityFilters {
    fn from(filters: VaccinationFilters) -> Self {
        EntityFilters::Vaccination(filters)
    }
}

impl From<PaymentFilters> for EntityFilters {
    fn from(filters: PaymentFilters) -> Self {
        EntityFilters::Payment(filters)
    }
}

//! Entity search for the clinic administration console
//!
//! Patients, vaccinations and payments are searched through the same
//! contract: a typed filter object is normalized into a flat query, sent
//! to a [`SearchBackend`], and answered with a [`SearchResultPage`].
//! [`SearchSession`] drives one search screen: explicit execution,
//! page changes, latest-request-wins completion and a shared
//! [`QueryCache`] keyed by entity and filters.

pub mod backend;
pub mod cache;
pub mod error;
pub mod filters;
pub mod models;
pub mod page;
pub mod session;

pub use backend::{HttpSearchBackend, SearchBackend};
pub use cache::QueryCache;
pub use error::{SearchError, SearchResult};
pub use filters::{
    CacheKey, EntityFilters, EntityKind, Pagination, PatientFilters, PaymentFilters,
    SearchFilters, SearchRequest, VaccinationFilters,
};
pub use models::{
    DoseNumber, PatientSearchResponse, PatientSearchResult, PatientStatus, PatientType,
    PaymentSearchResponse, PaymentSearchResult, Sex, VaccinationSearchResponse,
    VaccinationSearchResult,
};
pub use page::SearchResultPage;
pub use session::{Completion, PendingSearch, SearchSession, SearchState};

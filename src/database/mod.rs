pub mod memory;
pub mod pool;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{Application, ApplicationFilter, ApplicationStatus, NewApplication};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::models::job::{Job, JobFilter, JobPosting};
use crate::models::resume::{NewResume, ParsedResume, Resume};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    /// Saturates instead of overflowing for absurd page numbers; such a
    /// page is simply past the end.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let total_pages = ((total as f64) / (request.per_page as f64)).ceil() as i64;
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages,
        }
    }

    /// Pages an already-ordered, fully materialised list.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(request.per_page as usize)
            .collect();
        Self::new(items, total, request)
    }
}

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert(&self, candidate: NewCandidate) -> Result<Candidate>;
    async fn get(&self, id: Uuid) -> Result<Option<Candidate>>;
    /// The candidates among `ids` that exist, in no particular order.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Candidate>>;
    async fn list(&self, page: PageRequest) -> Result<Page<Candidate>>;
}

#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn insert(&self, resume: NewResume) -> Result<Resume>;
    async fn get(&self, id: Uuid) -> Result<Option<Resume>>;
    async fn update(
        &self,
        id: Uuid,
        file_name: Option<String>,
        parsed: ParsedResume,
    ) -> Result<Option<Resume>>;
    async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Resume>>;
    async fn list_all(&self) -> Result<Vec<Resume>>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, posting: JobPosting, is_active: bool) -> Result<Job>;
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;
    async fn update(&self, id: Uuid, posting: JobPosting, is_active: bool) -> Result<Option<Job>>;
    /// Newest first.
    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>>;
    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<Job>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Inserts a pending application unless the pair already has an open
    /// (non-terminal) one, in which case that record is returned instead.
    /// The flag is `true` when a new record was written.
    async fn insert_if_absent(&self, application: NewApplication) -> Result<(Application, bool)>;
    async fn get(&self, id: Uuid) -> Result<Option<Application>>;
    async fn list(&self, filter: &ApplicationFilter, page: PageRequest) -> Result<Page<Application>>;
    /// Compare-and-set on `version`. `None` when the record is missing or
    /// its version no longer matches.
    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>>;
    async fn job_ids_for_candidate(&self, candidate_id: Uuid) -> Result<HashSet<Uuid>>;
    async fn candidate_ids_for_job(&self, job_id: Uuid) -> Result<HashSet<Uuid>>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// The storage collaborators, behind trait objects so either backend can
/// serve the same services.
#[derive(Clone)]
pub struct Stores {
    pub candidates: Arc<dyn CandidateRepository>,
    pub resumes: Arc<dyn ResumeRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            candidates: store.clone(),
            resumes: store.clone(),
            jobs: store.clone(),
            applications: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            candidates: store.clone(),
            resumes: store.clone(),
            jobs: store.clone(),
            applications: store,
        }
    }
}

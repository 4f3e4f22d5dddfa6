use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::database::{CandidateRepository, Page, PageRequest};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, NewCandidate};

#[derive(Clone)]
pub struct CandidateService {
    candidates: Arc<dyn CandidateRepository>,
}

impl CandidateService {
    pub fn new(candidates: Arc<dyn CandidateRepository>) -> Self {
        Self { candidates }
    }

    pub async fn create(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = self.candidates.insert(candidate).await?;
        info!(candidate_id = %candidate.id, "candidate created");
        Ok(candidate)
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate> {
        self.candidates
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Candidate {} not found", id)))
    }

    /// Looks up a batch of candidates in one round trip, keyed by id.
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Candidate>> {
        Ok(self
            .candidates
            .get_many(ids)
            .await?
            .into_iter()
            .map(|candidate| (candidate.id, candidate))
            .collect())
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<Candidate>> {
        self.candidates.list(page).await
    }
}

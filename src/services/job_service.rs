use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{JobRepository, Page, PageRequest};
use crate::error::{Error, Result};
use crate::models::job::{Job, JobFilter, JobPosting};
use crate::models::matching::JobRequirement;
use crate::services::requirement_builder::RequirementBuilder;

#[derive(Clone)]
pub struct JobService {
    jobs: Arc<dyn JobRepository>,
    builder: RequirementBuilder,
}

impl JobService {
    pub fn new(jobs: Arc<dyn JobRepository>, builder: RequirementBuilder) -> Self {
        Self { jobs, builder }
    }

    pub async fn create(&self, posting: JobPosting, is_active: bool) -> Result<Job> {
        if let Err(err) = self.builder.validate(&posting) {
            warn!(title = %posting.title, error = %err, "job posting rejected");
            return Err(err);
        }
        let job = self.jobs.insert(posting, is_active).await?;
        info!(job_id = %job.id, "job created");
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.jobs
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))
    }

    /// Replaces the posting wholesale; its requirement is rebuilt from the new text.
    pub async fn update(&self, id: Uuid, posting: JobPosting, is_active: bool) -> Result<Job> {
        if let Err(err) = self.builder.validate(&posting) {
            warn!(job_id = %id, error = %err, "job update rejected");
            return Err(err);
        }
        let job = self
            .jobs
            .update(id, posting, is_active)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Job {} not found", id)))?;
        info!(job_id = %job.id, is_active = job.is_active, "job updated");
        Ok(job)
    }

    pub async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>> {
        self.jobs.list(filter, page).await
    }

    pub fn requirement(&self, job: &Job) -> Result<JobRequirement> {
        self.builder.build(job)
    }

    /// Jobs matching `filter` paired with their requirements. Postings that
    /// no longer build are skipped with a warning.
    pub async fn requirements(&self, filter: &JobFilter) -> Result<Vec<(Job, JobRequirement)>> {
        let jobs = self.jobs.list_all(filter).await?;
        let mut pairs = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.builder.build(&job) {
                Ok(requirement) => pairs.push((job, requirement)),
                Err(err) => warn!(job_id = %job.id, error = %err, "skipping unbuildable job"),
            }
        }
        Ok(pairs)
    }
}

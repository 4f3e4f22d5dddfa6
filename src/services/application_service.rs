use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{ApplicationRepository, Page, PageRequest};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationStatus, NewApplication,
};

/// The application workflow: idempotent creation and the status state machine.
#[derive(Clone)]
pub struct ApplicationService {
    applications: Arc<dyn ApplicationRepository>,
    max_retries: u32,
}

impl ApplicationService {
    pub fn new(applications: Arc<dyn ApplicationRepository>, max_retries: u32) -> Self {
        Self {
            applications,
            max_retries,
        }
    }

    /// Creates a pending application, or returns the open one the pair
    /// already has. The flag is `true` when a record was created.
    pub async fn create(&self, application: NewApplication) -> Result<(Application, bool)> {
        if !(0.0..=1.0).contains(&application.match_score) {
            return Err(Error::BadRequest(format!(
                "match_score must be within [0, 1], got {}",
                application.match_score
            )));
        }

        let (application, created) = self.applications.insert_if_absent(application).await?;
        if created {
            info!(
                application_id = %application.id,
                candidate_id = %application.candidate_id,
                job_id = %application.job_id,
                match_score = application.match_score,
                "application created"
            );
        } else {
            info!(application_id = %application.id, "application already open, returning existing");
        }
        Ok((application, created))
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        self.applications
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Application {} not found", id)))
    }

    pub async fn list(
        &self,
        filter: &ApplicationFilter,
        page: PageRequest,
    ) -> Result<Page<Application>> {
        self.applications.list(filter, page).await
    }

    /// Moves an application to `target`.
    ///
    /// With `expected_version` the write is a single compare-and-set and a
    /// stale version is reported as `Conflict`. Without it, lost races are
    /// retried against freshly read state up to the configured limit, and the
    /// transition is re-validated on every attempt.
    pub async fn set_status(
        &self,
        id: Uuid,
        target: ApplicationStatus,
        expected_version: Option<i64>,
    ) -> Result<Application> {
        let mut attempt = 0;
        loop {
            let current = self.get(id).await?;

            if let Some(expected) = expected_version {
                if current.version != expected {
                    return Err(Error::Conflict(format!(
                        "Application {} is at version {}, not {}",
                        id, current.version, expected
                    )));
                }
            }

            if !current.status.can_transition_to(target) {
                warn!(application_id = %id, from = %current.status, to = %target, "illegal status transition");
                return Err(Error::InvalidTransition {
                    from: current.status,
                    to: target,
                });
            }

            match self
                .applications
                .update_status(id, current.version, target)
                .await?
            {
                Some(updated) => {
                    info!(
                        application_id = %id,
                        from = %current.status,
                        to = %updated.status,
                        version = updated.version,
                        "application status changed"
                    );
                    return Ok(updated);
                }
                None if expected_version.is_some() || attempt >= self.max_retries => {
                    return Err(Error::Conflict(format!(
                        "Application {} was modified concurrently",
                        id
                    )));
                }
                None => {
                    attempt += 1;
                    warn!(application_id = %id, attempt, "status update lost a race, retrying");
                }
            }
        }
    }

    pub async fn applied_job_ids(&self, candidate_id: Uuid) -> Result<HashSet<Uuid>> {
        self.applications.job_ids_for_candidate(candidate_id).await
    }

    pub async fn applicant_ids(&self, job_id: Uuid) -> Result<HashSet<Uuid>> {
        self.applications.candidate_ids_for_job(job_id).await
    }

    /// Administrative override; the normal workflow never deletes.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.applications.delete(id).await? {
            return Err(Error::NotFound(format!("Application {} not found", id)));
        }
        warn!(application_id = %id, "application deleted by administrator");
        Ok(())
    }
}

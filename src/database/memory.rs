use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::{
    ApplicationRepository, CandidateRepository, JobRepository, Page, PageRequest,
    ResumeRepository,
};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationSort, ApplicationStatus, NewApplication,
};
use crate::models::candidate::{Candidate, NewCandidate};
use crate::models::job::{Job, JobFilter, JobPosting};
use crate::models::resume::{NewResume, ParsedResume, Resume};
use crate::utils::time::now;

/// Process-local store used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    candidates: RwLock<HashMap<Uuid, Candidate>>,
    resumes: RwLock<HashMap<Uuid, Resume>>,
    jobs: RwLock<HashMap<Uuid, Job>>,
    applications: RwLock<HashMap<Uuid, Application>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn job_matches(job: &Job, filter: &JobFilter) -> bool {
    if filter.active_only && !job.is_active {
        return false;
    }
    match &filter.search {
        Some(search) => job
            .posting
            .title
            .to_lowercase()
            .contains(&search.to_lowercase()),
        None => true,
    }
}

fn application_matches(application: &Application, filter: &ApplicationFilter) -> bool {
    filter.status.map_or(true, |s| application.status == s)
        && filter.candidate_id.map_or(true, |id| application.candidate_id == id)
        && filter.job_id.map_or(true, |id| application.job_id == id)
}

#[async_trait]
impl CandidateRepository for MemoryStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut candidates = self.candidates.write().await;
        if candidates
            .values()
            .any(|c| c.email.eq_ignore_ascii_case(&candidate.email))
        {
            return Err(Error::Conflict(format!(
                "A candidate with email {} already exists",
                candidate.email
            )));
        }

        let at = now();
        let record = Candidate {
            id: Uuid::new_v4(),
            name: candidate.name,
            email: candidate.email,
            phone: candidate.phone,
            created_at: at,
            updated_at: at,
        };
        candidates.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Candidate>> {
        Ok(self.candidates.read().await.get(&id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Candidate>> {
        let candidates = self.candidates.read().await;
        Ok(ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| candidates.get(id).cloned())
            .collect())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Candidate>> {
        let mut all: Vec<Candidate> = self.candidates.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(Page::from_sorted(all, page))
    }
}

#[async_trait]
impl ResumeRepository for MemoryStore {
    async fn insert(&self, resume: NewResume) -> Result<Resume> {
        let at = now();
        let record = Resume {
            id: Uuid::new_v4(),
            candidate_id: resume.candidate_id,
            file_name: resume.file_name,
            parsed: resume.parsed,
            created_at: at,
            updated_at: at,
        };
        self.resumes.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Resume>> {
        Ok(self.resumes.read().await.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        file_name: Option<String>,
        parsed: ParsedResume,
    ) -> Result<Option<Resume>> {
        let mut resumes = self.resumes.write().await;
        Ok(resumes.get_mut(&id).map(|resume| {
            if file_name.is_some() {
                resume.file_name = file_name;
            }
            resume.parsed = parsed;
            resume.updated_at = now();
            resume.clone()
        }))
    }

    async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Resume>> {
        let mut resumes: Vec<Resume> = self
            .resumes
            .read()
            .await
            .values()
            .filter(|r| r.candidate_id == candidate_id)
            .cloned()
            .collect();
        resumes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(resumes)
    }

    async fn list_all(&self) -> Result<Vec<Resume>> {
        let mut resumes: Vec<Resume> = self.resumes.read().await.values().cloned().collect();
        resumes.sort_by_key(|r| r.id);
        Ok(resumes)
    }
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn insert(&self, posting: JobPosting, is_active: bool) -> Result<Job> {
        let at = now();
        let job = Job {
            id: Uuid::new_v4(),
            posting,
            is_active,
            created_at: at,
            updated_at: at,
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, posting: JobPosting, is_active: bool) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.get_mut(&id).map(|job| {
            job.posting = posting;
            job.is_active = is_active;
            job.updated_at = now();
            job.clone()
        }))
    }

    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>> {
        Ok(Page::from_sorted(JobRepository::list_all(self, filter).await?, page))
    }

    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job_matches(job, filter))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn insert_if_absent(&self, application: NewApplication) -> Result<(Application, bool)> {
        // The write lock is held across the check and the insert, so two
        // concurrent creates for one pair cannot both succeed.
        let mut applications = self.applications.write().await;
        if let Some(existing) = applications.values().find(|a| {
            a.candidate_id == application.candidate_id
                && a.job_id == application.job_id
                && !a.status.is_terminal()
        }) {
            return Ok((existing.clone(), false));
        }

        let at = now();
        let record = Application {
            id: Uuid::new_v4(),
            candidate_id: application.candidate_id,
            job_id: application.job_id,
            resume_id: application.resume_id,
            status: ApplicationStatus::Pending,
            match_score: application.match_score,
            version: 1,
            created_at: at,
            updated_at: at,
        };
        applications.insert(record.id, record.clone());
        Ok((record, true))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.applications.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &ApplicationFilter, page: PageRequest) -> Result<Page<Application>> {
        let mut matching: Vec<Application> = self
            .applications
            .read()
            .await
            .values()
            .filter(|a| application_matches(a, filter))
            .cloned()
            .collect();

        match filter.sort {
            ApplicationSort::CreatedAt => matching.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            ApplicationSort::MatchScore => matching.sort_by(|a, b| {
                b.match_score
                    .total_cmp(&a.match_score)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }
        Ok(Page::from_sorted(matching, page))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let mut applications = self.applications.write().await;
        Ok(applications
            .get_mut(&id)
            .filter(|a| a.version == expected_version)
            .map(|application| {
                application.status = status;
                application.version += 1;
                application.updated_at = now();
                application.clone()
            }))
    }

    async fn job_ids_for_candidate(&self, candidate_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .applications
            .read()
            .await
            .values()
            .filter(|a| a.candidate_id == candidate_id)
            .map(|a| a.job_id)
            .collect())
    }

    async fn candidate_ids_for_job(&self, job_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .applications
            .read()
            .await
            .values()
            .filter(|a| a.job_id == job_id)
            .map(|a| a.candidate_id)
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.applications.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_application(candidate: u128, job: u128) -> NewApplication {
        NewApplication {
            candidate_id: Uuid::from_u128(candidate),
            job_id: Uuid::from_u128(job),
            resume_id: Uuid::from_u128(99),
            match_score: 0.5,
        }
    }

    #[tokio::test]
    async fn duplicate_open_application_returns_the_original() {
        let store = MemoryStore::new();
        let (first, created) = store.insert_if_absent(new_application(1, 2)).await.unwrap();
        assert!(created);
        assert_eq!(first.status, ApplicationStatus::Pending);
        assert_eq!(first.version, 1);

        let (second, created) = store.insert_if_absent(new_application(1, 2)).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn terminal_application_allows_a_fresh_one() {
        let store = MemoryStore::new();
        let (first, _) = store.insert_if_absent(new_application(1, 2)).await.unwrap();
        store
            .update_status(first.id, 1, ApplicationStatus::Rejected)
            .await
            .unwrap()
            .unwrap();

        let (second, created) = store.insert_if_absent(new_application(1, 2)).await.unwrap();
        assert!(created);
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn stale_versions_are_not_written() {
        let store = MemoryStore::new();
        let (app, _) = store.insert_if_absent(new_application(1, 2)).await.unwrap();

        let updated = store
            .update_status(app.id, 1, ApplicationStatus::Reviewing)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 2);

        let stale = store
            .update_status(app.id, 1, ApplicationStatus::Shortlisted)
            .await
            .unwrap();
        assert!(stale.is_none());
        let current = ApplicationRepository::get(&store, app.id).await.unwrap().unwrap();
        assert_eq!(current.status, ApplicationStatus::Reviewing);
    }

    #[tokio::test]
    async fn candidate_emails_are_unique() {
        let store = MemoryStore::new();
        let new = || NewCandidate {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: None,
        };
        CandidateRepository::insert(&store, new()).await.unwrap();
        let err = CandidateRepository::insert(&store, new()).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn fetches_candidates_in_one_batch() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            let candidate = CandidateRepository::insert(
                &store,
                NewCandidate {
                    name: format!("Candidate {}", i),
                    email: format!("batch{}@example.com", i),
                    phone: None,
                },
            )
            .await
            .unwrap();
            ids.push(candidate.id);
        }
        ids.push(ids[0]);
        ids.push(Uuid::new_v4());

        let mut found: Vec<Uuid> = store.get_many(&ids).await.unwrap().iter().map(|c| c.id).collect();
        found.sort();
        let mut expected = ids[..3].to_vec();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn applications_sort_by_score() {
        let store = MemoryStore::new();
        for (job, score) in [(1u128, 0.2), (2, 0.9), (3, 0.5)] {
            let mut new = new_application(1, job);
            new.match_score = score;
            store.insert_if_absent(new).await.unwrap();
        }
        let filter = ApplicationFilter {
            sort: ApplicationSort::MatchScore,
            ..Default::default()
        };
        let page = ApplicationRepository::list(&store, &filter, PageRequest::default())
            .await
            .unwrap();
        let scores: Vec<f64> = page.items.iter().map(|a| a.match_score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }
}

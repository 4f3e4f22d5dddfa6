use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{CandidateRepository, ResumeRepository};
use crate::error::{Error, Result};
use crate::models::matching::CandidateProfile;
use crate::models::resume::{NewResume, ParsedResume, Resume};
use crate::services::profile_builder::ProfileBuilder;

/// Stores parsed resumes. A resume is only written when a profile can be
/// built from it, so every stored resume is rankable.
#[derive(Clone)]
pub struct ResumeService {
    resumes: Arc<dyn ResumeRepository>,
    candidates: Arc<dyn CandidateRepository>,
    builder: ProfileBuilder,
}

impl ResumeService {
    pub fn new(
        resumes: Arc<dyn ResumeRepository>,
        candidates: Arc<dyn CandidateRepository>,
        builder: ProfileBuilder,
    ) -> Self {
        Self {
            resumes,
            candidates,
            builder,
        }
    }

    pub async fn create(&self, resume: NewResume) -> Result<Resume> {
        if self.candidates.get(resume.candidate_id).await?.is_none() {
            return Err(Error::NotFound(format!(
                "Candidate {} not found",
                resume.candidate_id
            )));
        }
        if let Err(err) = self.builder.validate(&resume.parsed) {
            warn!(candidate_id = %resume.candidate_id, error = %err, "resume rejected");
            return Err(err);
        }

        let resume = self.resumes.insert(resume).await?;
        info!(resume_id = %resume.id, candidate_id = %resume.candidate_id, "resume stored");
        Ok(resume)
    }

    pub async fn get(&self, id: Uuid) -> Result<Resume> {
        self.resumes
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Resume {} not found", id)))
    }

    /// Replaces the parsed content; the profile is rebuilt from it on next use.
    pub async fn update(
        &self,
        id: Uuid,
        file_name: Option<String>,
        parsed: ParsedResume,
    ) -> Result<Resume> {
        if let Err(err) = self.builder.validate(&parsed) {
            warn!(resume_id = %id, error = %err, "resume update rejected");
            return Err(err);
        }
        let resume = self
            .resumes
            .update(id, file_name, parsed)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Resume {} not found", id)))?;
        info!(resume_id = %resume.id, "resume updated");
        Ok(resume)
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Resume>> {
        if self.candidates.get(candidate_id).await?.is_none() {
            return Err(Error::NotFound(format!("Candidate {} not found", candidate_id)));
        }
        self.resumes.list_for_candidate(candidate_id).await
    }

    pub async fn profile(&self, id: Uuid) -> Result<(Resume, CandidateProfile)> {
        let resume = self.get(id).await?;
        let profile = self.builder.build(&resume)?;
        Ok((resume, profile))
    }

    /// Profiles for every stored resume. Rows that no longer build (written
    /// by an older vocabulary, say) are skipped with a warning.
    pub async fn all_profiles(&self) -> Result<Vec<CandidateProfile>> {
        let resumes = self.resumes.list_all().await?;
        let mut profiles = Vec::with_capacity(resumes.len());
        for resume in &resumes {
            match self.builder.build(resume) {
                Ok(profile) => profiles.push(profile),
                Err(err) => warn!(resume_id = %resume.id, error = %err, "skipping unbuildable resume"),
            }
        }
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::candidate::NewCandidate;

    async fn setup() -> (ResumeService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let candidate = CandidateRepository::insert(
            store.as_ref(),
            NewCandidate {
                name: "Grace".into(),
                email: "grace@example.com".into(),
                phone: None,
            },
        )
        .await
        .unwrap();
        let service = ResumeService::new(store.clone(), store, ProfileBuilder::default());
        (service, candidate.id)
    }

    fn parsed(skills: &[&str]) -> ParsedResume {
        ParsedResume {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: Some(3.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stores_valid_resumes_and_builds_profiles() {
        let (service, candidate_id) = setup().await;
        let resume = service
            .create(NewResume {
                candidate_id,
                file_name: Some("cv.pdf".into()),
                parsed: parsed(&["Rust", "SQL"]),
            })
            .await
            .unwrap();

        let (_, profile) = service.profile(resume.id).await.unwrap();
        assert_eq!(profile.candidate_id, candidate_id);
        assert_eq!(profile.skills.len(), 2);
        assert_eq!(service.all_profiles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_resumes_that_cannot_be_profiled() {
        let (service, candidate_id) = setup().await;
        let err = service
            .create(NewResume {
                candidate_id,
                file_name: None,
                parsed: parsed(&[]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResumeData(_)));
        assert!(service.list_for_candidate(candidate_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_candidate_is_not_found() {
        let (service, _) = setup().await;
        let err = service
            .create(NewResume {
                candidate_id: Uuid::new_v4(),
                file_name: None,
                parsed: parsed(&["go"]),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_replaces_parsed_content() {
        let (service, candidate_id) = setup().await;
        let resume = service
            .create(NewResume {
                candidate_id,
                file_name: Some("cv.pdf".into()),
                parsed: parsed(&["go"]),
            })
            .await
            .unwrap();

        let updated = service
            .update(resume.id, None, parsed(&["go", "kubernetes"]))
            .await
            .unwrap();
        assert_eq!(updated.file_name.as_deref(), Some("cv.pdf"));
        assert!(updated.updated_at >= resume.updated_at);

        let (_, profile) = service.profile(resume.id).await.unwrap();
        assert_eq!(profile.skills.len(), 2);
    }
}

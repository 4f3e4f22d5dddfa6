use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::database::{Page, PageRequest};
use crate::error::{Error, Result};
use crate::models::application::{Application, NewApplication};
use crate::models::candidate::Candidate;
use crate::models::job::{Job, JobFilter};
use crate::models::matching::{
    CandidateProfile, EducationLevel, ScoreBreakdown, Skill, SkillSet,
};
use crate::models::resume::{EducationEntry, ExperienceEntry, Resume};
use crate::services::application_service::ApplicationService;
use crate::services::candidate_service::CandidateService;
use crate::services::job_service::JobService;
use crate::services::ranking_service::RankingService;
use crate::services::resume_service::ResumeService;

#[derive(Debug, Clone, Serialize)]
pub struct SkillMatch {
    pub name: Skill,
    /// True when at least one open job asks for this skill.
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
    pub job: Job,
    pub match_score: f64,
    pub matched_skills: SkillSet,
    pub unmatched_skills: SkillSet,
    pub breakdown: ScoreBreakdown,
    pub has_applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateMatch {
    pub candidate: Candidate,
    pub resume_id: Uuid,
    pub match_score: f64,
    pub matched_skills: SkillSet,
    pub unmatched_skills: SkillSet,
    pub breakdown: ScoreBreakdown,
    pub has_applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeAnalysis {
    pub candidate: Candidate,
    pub resume_id: Uuid,
    pub skills: Vec<SkillMatch>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub experience_years: f64,
    pub education_level: EducationLevel,
    pub job_matches: Vec<JobMatch>,
}

/// Joins the record services with the ranking core.
#[derive(Clone)]
pub struct MatchService {
    candidates: CandidateService,
    resumes: ResumeService,
    jobs: JobService,
    applications: ApplicationService,
    ranking: RankingService,
}

fn open_jobs() -> JobFilter {
    JobFilter {
        active_only: true,
        ..Default::default()
    }
}

impl MatchService {
    pub fn new(
        candidates: CandidateService,
        resumes: ResumeService,
        jobs: JobService,
        applications: ApplicationService,
        ranking: RankingService,
    ) -> Self {
        Self {
            candidates,
            resumes,
            jobs,
            applications,
            ranking,
        }
    }

    async fn job_matches(
        &self,
        resume_id: Uuid,
        filter: &JobFilter,
    ) -> Result<(Resume, CandidateProfile, Vec<JobMatch>)> {
        let (resume, profile) = self.resumes.profile(resume_id).await?;
        let pairs = self.jobs.requirements(filter).await?;
        let applied = self.applications.applied_job_ids(resume.candidate_id).await?;

        let (jobs, requirements): (Vec<Job>, Vec<_>) = pairs.into_iter().unzip();
        let mut jobs_by_id: HashMap<Uuid, Job> = jobs.into_iter().map(|job| (job.id, job)).collect();

        let ranking = self.ranking.rank_jobs(profile.clone(), requirements).await?;
        debug!(resume_id = %resume_id, jobs = ranking.len(), "ranked jobs for resume");

        let matches = ranking
            .into_iter()
            .filter_map(|result| {
                let job = jobs_by_id.remove(&result.job_id)?;
                Some(JobMatch {
                    has_applied: applied.contains(&job.id),
                    job,
                    match_score: result.score,
                    matched_skills: result.matched_skills,
                    unmatched_skills: result.unmatched_required_skills,
                    breakdown: result.breakdown,
                })
            })
            .collect();
        Ok((resume, profile, matches))
    }

    /// The resume analysis view: the candidate, their skills flagged by
    /// whether any open job wants them, and every open job ranked.
    pub async fn analyze_resume(&self, resume_id: Uuid) -> Result<ResumeAnalysis> {
        let (resume, profile, job_matches) = self.job_matches(resume_id, &open_jobs()).await?;
        let candidate = self.candidates.get(resume.candidate_id).await?;

        let wanted: BTreeSet<&Skill> = job_matches
            .iter()
            .flat_map(|m| m.matched_skills.iter())
            .collect();
        let skills = profile
            .skills
            .iter()
            .map(|skill| SkillMatch {
                name: skill.clone(),
                matched: wanted.contains(skill),
            })
            .collect();

        Ok(ResumeAnalysis {
            candidate,
            resume_id: resume.id,
            skills,
            experience: resume.parsed.experience_entries,
            education: resume.parsed.education_entries,
            experience_years: profile.experience_years,
            education_level: profile.education_level,
            job_matches,
        })
    }

    /// Jobs matching `filter`, best match for the resume first.
    pub async fn ranked_jobs(
        &self,
        resume_id: Uuid,
        filter: &JobFilter,
        page: PageRequest,
    ) -> Result<Page<JobMatch>> {
        let (_, _, matches) = self.job_matches(resume_id, filter).await?;
        Ok(Page::from_sorted(matches, page))
    }

    /// Every stored resume ranked against one job.
    pub async fn ranked_candidates(
        &self,
        job_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<CandidateMatch>> {
        let job = self.jobs.get(job_id).await?;
        let requirement = self.jobs.requirement(&job)?;
        let profiles = self.resumes.all_profiles().await?;
        let applicants = self.applications.applicant_ids(job_id).await?;

        let ranking = self.ranking.rank_candidates(requirement, profiles).await?;
        debug!(job_id = %job_id, candidates = ranking.len(), "ranked candidates for job");

        let Page {
            items: results,
            total,
            page,
            per_page,
            total_pages,
        } = Page::from_sorted(ranking.into_vec(), page);

        let ids: Vec<Uuid> = results.iter().map(|r| r.candidate_id).collect();
        let candidates = self.candidates.get_many(&ids).await?;

        let items = results
            .into_iter()
            .map(|result| {
                let candidate = candidates.get(&result.candidate_id).cloned().ok_or_else(|| {
                    Error::NotFound(format!("Candidate {} not found", result.candidate_id))
                })?;
                Ok(CandidateMatch {
                    has_applied: applicants.contains(&candidate.id),
                    candidate,
                    resume_id: result.profile_id,
                    match_score: result.score,
                    matched_skills: result.matched_skills,
                    unmatched_skills: result.unmatched_required_skills,
                    breakdown: result.breakdown,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Applies a candidate to a job with one of their resumes, snapshotting
    /// the current match score. Idempotent while an application is open.
    pub async fn apply(
        &self,
        candidate_id: Uuid,
        job_id: Uuid,
        resume_id: Uuid,
    ) -> Result<(Application, bool)> {
        let (resume, profile) = self.resumes.profile(resume_id).await?;
        if resume.candidate_id != candidate_id {
            return Err(Error::BadRequest(format!(
                "Resume {} does not belong to candidate {}",
                resume_id, candidate_id
            )));
        }

        let job = self.jobs.get(job_id).await?;
        if !job.is_active {
            return Err(Error::BadRequest(format!(
                "Job {} is not accepting applications",
                job_id
            )));
        }
        let requirement = self.jobs.requirement(&job)?;
        let result = self.ranking.scorer().score(&profile, &requirement);

        self.applications
            .create(NewApplication {
                candidate_id,
                job_id,
                resume_id,
                match_score: result.score,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::database::MemoryStore;
    use crate::models::application::ApplicationStatus;
    use crate::models::candidate::NewCandidate;
    use crate::models::job::JobPosting;
    use crate::models::resume::{NewResume, ParsedResume};
    use crate::services::profile_builder::ProfileBuilder;
    use crate::services::requirement_builder::RequirementBuilder;
    use crate::services::scoring_service::MatchScorer;

    struct Fixture {
        service: MatchService,
        candidates: CandidateService,
        resumes: ResumeService,
        jobs: JobService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let candidates = CandidateService::new(store.clone());
        let resumes = ResumeService::new(store.clone(), store.clone(), ProfileBuilder::default());
        let jobs = JobService::new(store.clone(), RequirementBuilder::default());
        let applications = ApplicationService::new(store, 3);
        let ranking = RankingService::new(MatchScorer::default(), 2).unwrap();
        Fixture {
            service: MatchService::new(
                candidates.clone(),
                resumes.clone(),
                jobs.clone(),
                applications,
                ranking,
            ),
            candidates,
            resumes,
            jobs,
        }
    }

    async fn candidate_with_resume(fx: &Fixture, email: &str, skills: &[&str]) -> (Uuid, Uuid) {
        let candidate = fx
            .candidates
            .create(NewCandidate {
                name: email.into(),
                email: email.into(),
                phone: None,
            })
            .await
            .unwrap();
        let resume = fx
            .resumes
            .create(NewResume {
                candidate_id: candidate.id,
                file_name: None,
                parsed: ParsedResume {
                    skills: skills.iter().map(|s| s.to_string()).collect(),
                    experience_years: Some(5.0),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        (candidate.id, resume.id)
    }

    async fn job(fx: &Fixture, title: &str, skills: &str, active: bool) -> Job {
        fx.jobs
            .create(
                JobPosting {
                    title: title.into(),
                    description: "".into(),
                    requirements: None,
                    required_skills: skills.into(),
                    min_experience: 2.0,
                    education_required: "none".into(),
                },
                active,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn analysis_ranks_open_jobs_and_flags_skills() {
        let fx = fixture();
        let (candidate_id, resume_id) =
            candidate_with_resume(&fx, "a@example.com", &["Python", "SQL", "Excel"]).await;
        let data = job(&fx, "Data", "python, sql", true).await;
        let web = job(&fx, "Web", "python, javascript", true).await;
        job(&fx, "Closed", "excel", false).await;

        let analysis = fx.service.analyze_resume(resume_id).await.unwrap();
        assert_eq!(analysis.candidate.id, candidate_id);

        let order: Vec<Uuid> = analysis.job_matches.iter().map(|m| m.job.id).collect();
        assert_eq!(order, vec![data.id, web.id]);
        assert!((analysis.job_matches[0].match_score - 1.0).abs() < 1e-9);
        assert!(analysis.job_matches.iter().all(|m| !m.has_applied));

        let flags: Vec<(&str, bool)> = analysis
            .skills
            .iter()
            .map(|s| (s.name.as_str(), s.matched))
            .collect();
        assert_eq!(flags, vec![("excel", false), ("python", true), ("sql", true)]);
    }

    #[tokio::test]
    async fn applying_snapshots_the_score_and_marks_has_applied() {
        let fx = fixture();
        let (candidate_id, resume_id) =
            candidate_with_resume(&fx, "b@example.com", &["rust"]).await;
        let posting = job(&fx, "Systems", "rust, c++", true).await;

        let (application, created) = fx
            .service
            .apply(candidate_id, posting.id, resume_id)
            .await
            .unwrap();
        assert!(created);
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert!((application.match_score - 0.7).abs() < 1e-9);

        let (again, created) = fx
            .service
            .apply(candidate_id, posting.id, resume_id)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, application.id);

        let ranked = fx
            .service
            .ranked_candidates(posting.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(ranked.total, 1);
        assert!(ranked.items[0].has_applied);
    }

    #[tokio::test]
    async fn applying_with_someone_elses_resume_is_rejected() {
        let fx = fixture();
        let (_, resume_id) = candidate_with_resume(&fx, "c@example.com", &["go"]).await;
        let (other_candidate, _) = candidate_with_resume(&fx, "d@example.com", &["go"]).await;
        let posting = job(&fx, "Go", "go", true).await;

        let err = fx
            .service
            .apply(other_candidate, posting.id, resume_id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn closed_jobs_do_not_take_applications() {
        let fx = fixture();
        let (candidate_id, resume_id) = candidate_with_resume(&fx, "e@example.com", &["go"]).await;
        let posting = job(&fx, "Go", "go", false).await;
        assert!(matches!(
            fx.service.apply(candidate_id, posting.id, resume_id).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn candidates_are_ranked_for_a_job() {
        let fx = fixture();
        let (strong, _) = candidate_with_resume(&fx, "f@example.com", &["rust", "sql"]).await;
        let (weak, _) = candidate_with_resume(&fx, "g@example.com", &["rust"]).await;
        let posting = job(&fx, "Backend", "rust, sql", true).await;

        let ranked = fx
            .service
            .ranked_candidates(posting.id, PageRequest::default())
            .await
            .unwrap();
        let order: Vec<Uuid> = ranked.items.iter().map(|m| m.candidate.id).collect();
        assert_eq!(order, vec![strong, weak]);
        assert!(ranked.items[0].match_score > ranked.items[1].match_score);
    }
}

use crate::error::{Error, Result};
use crate::models::job::{Job, JobPosting};
use crate::models::matching::{EducationLevel, JobRequirement, SkillSet};
use crate::services::skill_normalizer::SkillNormalizer;

const NO_EDUCATION_REQUIRED: [&str; 3] = ["", "none", "any"];

#[derive(Debug, Clone, Default)]
pub struct RequirementBuilder {
    normalizer: SkillNormalizer,
}

impl RequirementBuilder {
    pub fn new(normalizer: SkillNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn build(&self, job: &Job) -> Result<JobRequirement> {
        self.check_posting(&job.posting).map(|(required_skills, required_education)| {
            JobRequirement {
                job_id: job.id,
                required_skills,
                min_experience_years: job.posting.min_experience,
                required_education,
                created_at: job.created_at,
            }
        })
    }

    /// Validates a posting before it is stored, so a job that cannot be
    /// turned into a requirement is never persisted.
    pub fn validate(&self, posting: &JobPosting) -> Result<()> {
        self.check_posting(posting).map(|_| ())
    }

    fn check_posting(
        &self,
        posting: &JobPosting,
    ) -> Result<(SkillSet, EducationLevel)> {
        let required_skills = self.normalizer.split_list(&posting.required_skills);
        if required_skills.is_empty() {
            return Err(Error::InvalidJobData(
                "required_skills lists no recognisable skills".to_string(),
            ));
        }

        if !posting.min_experience.is_finite() || posting.min_experience < 0.0 {
            return Err(Error::InvalidJobData(format!(
                "min_experience must be a non-negative number, got {}",
                posting.min_experience
            )));
        }

        Ok((required_skills, required_education(&posting.education_required)?))
    }
}

pub fn required_education(raw: &str) -> Result<EducationLevel> {
    let trimmed = raw.trim().to_lowercase();
    if NO_EDUCATION_REQUIRED.contains(&trimmed.as_str()) {
        return Ok(EducationLevel::HighSchool);
    }
    EducationLevel::from_degree_text(&trimmed).ok_or_else(|| {
        Error::InvalidJobData(format!("unrecognised education requirement: {}", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn job(skills: &str, min_experience: f64, education: &str) -> Job {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Job {
            id: Uuid::from_u128(7),
            posting: JobPosting {
                title: "Backend Engineer".into(),
                description: "Build services".into(),
                requirements: None,
                required_skills: skills.into(),
                min_experience,
                education_required: education.into(),
            },
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn builds_requirement_from_posting() {
        let requirement = RequirementBuilder::default()
            .build(&job("Python, SQL; Docker\nAWS, python", 3.0, "Bachelor's"))
            .unwrap();

        let skills: Vec<&str> = requirement.required_skills.iter().map(|s| s.as_str()).collect();
        assert_eq!(skills, vec!["aws", "docker", "python", "sql"]);
        assert_eq!(requirement.min_experience_years, 3.0);
        assert_eq!(requirement.required_education, EducationLevel::Bachelors);
        assert_eq!(requirement.job_id, Uuid::from_u128(7));
    }

    #[test]
    fn rejects_empty_skill_lists() {
        let err = RequirementBuilder::default()
            .build(&job(" , ;", 1.0, "none"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidJobData(_)));
    }

    #[test]
    fn rejects_negative_experience() {
        assert!(matches!(
            RequirementBuilder::default().build(&job("go", -0.5, "none")),
            Err(Error::InvalidJobData(_))
        ));
        assert!(matches!(
            RequirementBuilder::default().build(&job("go", f64::NAN, "none")),
            Err(Error::InvalidJobData(_))
        ));
    }

    #[test]
    fn absent_education_means_high_school() {
        for raw in ["", "None", " any "] {
            assert_eq!(required_education(raw).unwrap(), EducationLevel::HighSchool);
        }
        assert_eq!(required_education("master").unwrap(), EducationLevel::Masters);
        assert_eq!(required_education("PhD").unwrap(), EducationLevel::PhD);
    }

    #[test]
    fn unknown_education_is_rejected() {
        assert!(matches!(
            required_education("wizardry certificate"),
            Err(Error::InvalidJobData(_))
        ));
    }
}

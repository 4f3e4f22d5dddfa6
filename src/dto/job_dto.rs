use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::database::PageRequest;
use crate::models::job::{JobFilter, JobPosting};

fn default_active() -> bool {
    true
}

/// Body of both create and update; an update replaces the posting wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub requirements: Option<String>,
    #[validate(length(min = 1))]
    pub required_skills: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub min_experience: f64,
    #[serde(default)]
    pub education_required: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl JobPayload {
    pub fn into_parts(self) -> (JobPosting, bool) {
        (
            JobPosting {
                title: self.title.trim().to_string(),
                description: self.description,
                requirements: self.requirements,
                required_skills: self.required_skills,
                min_experience: self.min_experience,
                education_required: self.education_required,
            },
            self.is_active,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub active_only: Option<bool>,
    /// When present, jobs are scored against this resume and returned best first.
    pub resume_id: Option<Uuid>,
}

impl JobListQuery {
    pub fn filter(&self) -> JobFilter {
        JobFilter {
            active_only: self.active_only.unwrap_or(false),
            search: self
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

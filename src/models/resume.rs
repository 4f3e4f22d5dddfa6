use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output of the resume parsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParsedResume {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_entries: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education_entries: Vec<EducationEntry>,
    /// Candidate-level figure stated on the resume, if any.
    pub experience_years: Option<f64>,
    /// Date the resume was parsed; open-ended positions run until this day.
    pub parsed_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExperienceEntry {
    pub title: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub years: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub file_name: Option<String>,
    pub parsed: ParsedResume,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub candidate_id: Uuid,
    pub file_name: Option<String>,
    pub parsed: ParsedResume,
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewing,
    Shortlisted,
    Rejected,
    Hired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewing,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Hired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Hired => "hired",
        }
    }

    /// Statuses reachable in one step from `self`.
    pub fn next_statuses(self) -> &'static [ApplicationStatus] {
        match self {
            ApplicationStatus::Pending => &[ApplicationStatus::Reviewing],
            ApplicationStatus::Reviewing => {
                &[ApplicationStatus::Shortlisted, ApplicationStatus::Rejected]
            }
            ApplicationStatus::Shortlisted => {
                &[ApplicationStatus::Hired, ApplicationStatus::Rejected]
            }
            ApplicationStatus::Rejected | ApplicationStatus::Hired => &[],
        }
    }

    pub fn can_transition_to(self, target: ApplicationStatus) -> bool {
        self.next_statuses().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub status: ApplicationStatus,
    /// Snapshot taken at creation; never recomputed.
    pub match_score: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Uuid,
    pub match_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSort {
    #[default]
    CreatedAt,
    MatchScore,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub candidate_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub sort: ApplicationSort,
}

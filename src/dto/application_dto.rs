use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::PageRequest;
use crate::error::{Error, Result};
use crate::models::application::{ApplicationFilter, ApplicationSort, ApplicationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationPayload {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub resume_id: Uuid,
}

/// `status` is taken as text so unknown values surface as a `bad_request`
/// error rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: String,
    pub expected_version: Option<i64>,
}

impl UpdateStatusPayload {
    pub fn target(&self) -> Result<ApplicationStatus> {
        parse_status(&self.status)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub candidate_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub sort: Option<String>,
}

impl ApplicationListQuery {
    pub fn filter(&self) -> Result<ApplicationFilter> {
        let status = self.status.as_deref().map(parse_status).transpose()?;
        let sort = match self.sort.as_deref() {
            None | Some("created_at") => ApplicationSort::CreatedAt,
            Some("match_score") => ApplicationSort::MatchScore,
            Some(other) => {
                return Err(Error::BadRequest(format!(
                    "sort must be `created_at` or `match_score`, got `{}`",
                    other
                )))
            }
        };
        Ok(ApplicationFilter {
            status,
            candidate_id: self.candidate_id,
            job_id: self.job_id,
            sort,
        })
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page)
    }
}

fn parse_status(raw: &str) -> Result<ApplicationStatus> {
    raw.trim()
        .parse()
        .map_err(|e: crate::models::application::UnknownStatus| Error::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_a_bad_request() {
        let payload = UpdateStatusPayload {
            status: "archived".into(),
            expected_version: None,
        };
        assert!(matches!(payload.target(), Err(Error::BadRequest(_))));
    }

    #[test]
    fn list_query_builds_filters() {
        let query = ApplicationListQuery {
            status: Some("shortlisted".into()),
            sort: Some("match_score".into()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(ApplicationStatus::Shortlisted));
        assert_eq!(filter.sort, ApplicationSort::MatchScore);

        let bad = ApplicationListQuery {
            sort: Some("name".into()),
            ..Default::default()
        };
        assert!(bad.filter().is_err());
    }
}

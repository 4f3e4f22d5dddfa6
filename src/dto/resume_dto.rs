use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resume::{NewResume, ParsedResume};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResumePayload {
    pub candidate_id: Uuid,
    pub file_name: Option<String>,
    pub parsed: ParsedResume,
}

impl From<CreateResumePayload> for NewResume {
    fn from(value: CreateResumePayload) -> Self {
        Self {
            candidate_id: value.candidate_id,
            file_name: value.file_name,
            parsed: value.parsed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResumePayload {
    pub file_name: Option<String>,
    pub parsed: ParsedResume,
}

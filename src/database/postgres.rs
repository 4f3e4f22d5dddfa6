use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
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

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, created_at, updated_at";
const RESUME_COLUMNS: &str = "id, candidate_id, file_name, parsed, created_at, updated_at";
const JOB_COLUMNS: &str = "id, title, description, requirements, required_skills, min_experience, education_required, is_active, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "id, candidate_id, job_id, resume_id, status, match_score, version, created_at, updated_at";

// Must match the predicate of `applications_open_pair_idx`.
const OPEN_STATUSES: &str = "('pending', 'reviewing', 'shortlisted')";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn resume_from_row(row: &PgRow) -> Result<Resume> {
    let parsed: Json<ParsedResume> = row.try_get("parsed")?;
    Ok(Resume {
        id: row.try_get("id")?,
        candidate_id: row.try_get("candidate_id")?,
        file_name: row.try_get("file_name")?,
        parsed: parsed.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn job_from_row(row: &PgRow) -> Result<Job> {
    Ok(Job {
        id: row.try_get("id")?,
        posting: JobPosting {
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            requirements: row.try_get("requirements")?,
            required_skills: row.try_get("required_skills")?,
            min_experience: row.try_get("min_experience")?,
            education_required: row.try_get("education_required")?,
        },
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn application_from_row(row: &PgRow) -> Result<Application> {
    let status: String = row.try_get("status")?;
    Ok(Application {
        id: row.try_get("id")?,
        candidate_id: row.try_get("candidate_id")?,
        job_id: row.try_get("job_id")?,
        resume_id: row.try_get("resume_id")?,
        status: status
            .parse()
            .map_err(|e| Error::Internal(format!("corrupt application row: {}", e)))?,
        match_score: row.try_get("match_score")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn unique_violation_to_conflict(err: sqlx::Error, message: String) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Error::Conflict(message)
        }
        _ => err.into(),
    }
}

fn where_clause(filters: &[String]) -> String {
    if filters.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", filters.join(" AND "))
    }
}

fn job_filters(filter: &JobFilter) -> (Vec<String>, Vec<String>) {
    let mut filters = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if filter.active_only {
        filters.push("is_active = TRUE".to_string());
    }
    if let Some(search) = &filter.search {
        filters.push(format!("title ILIKE ${}", args.len() + 1));
        args.push(format!("%{}%", search));
    }
    (filters, args)
}

#[async_trait]
impl CandidateRepository for PgStore {
    async fn insert(&self, candidate: NewCandidate) -> Result<Candidate> {
        let at = now();
        let email = candidate.email.clone();
        sqlx::query_as::<_, Candidate>(&format!(
            "INSERT INTO candidates (id, name, email, phone, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            CANDIDATE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(candidate.name)
        .bind(candidate.email)
        .bind(candidate.phone)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_violation_to_conflict(e, format!("A candidate with email {} already exists", email))
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Candidate>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE id = ANY($1)",
            CANDIDATE_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Candidate>> {
        let items = sqlx::query_as::<_, Candidate>(&format!(
            "SELECT {} FROM candidates ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            CANDIDATE_COLUMNS
        ))
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }
}

#[async_trait]
impl ResumeRepository for PgStore {
    async fn insert(&self, resume: NewResume) -> Result<Resume> {
        let row = sqlx::query(&format!(
            "INSERT INTO resumes (id, candidate_id, file_name, parsed, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            RESUME_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(resume.candidate_id)
        .bind(resume.file_name)
        .bind(Json(resume.parsed))
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        resume_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Resume>> {
        let row = sqlx::query(&format!("SELECT {} FROM resumes WHERE id = $1", RESUME_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(resume_from_row).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        file_name: Option<String>,
        parsed: ParsedResume,
    ) -> Result<Option<Resume>> {
        let row = sqlx::query(&format!(
            "UPDATE resumes
             SET file_name = COALESCE($2, file_name), parsed = $3, updated_at = $4
             WHERE id = $1
             RETURNING {}",
            RESUME_COLUMNS
        ))
        .bind(id)
        .bind(file_name)
        .bind(Json(parsed))
        .bind(now())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(resume_from_row).transpose()
    }

    async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Resume>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM resumes WHERE candidate_id = $1 ORDER BY updated_at DESC, id",
            RESUME_COLUMNS
        ))
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(resume_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<Resume>> {
        let rows = sqlx::query(&format!("SELECT {} FROM resumes ORDER BY id", RESUME_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(resume_from_row).collect()
    }
}

#[async_trait]
impl JobRepository for PgStore {
    async fn insert(&self, posting: JobPosting, is_active: bool) -> Result<Job> {
        let row = sqlx::query(&format!(
            "INSERT INTO jobs (id, title, description, requirements, required_skills, min_experience, education_required, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(posting.title)
        .bind(posting.description)
        .bind(posting.requirements)
        .bind(posting.required_skills)
        .bind(posting.min_experience)
        .bind(posting.education_required)
        .bind(is_active)
        .bind(now())
        .fetch_one(&self.pool)
        .await?;
        job_from_row(&row)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn update(&self, id: Uuid, posting: JobPosting, is_active: bool) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "UPDATE jobs
             SET title = $2, description = $3, requirements = $4, required_skills = $5,
                 min_experience = $6, education_required = $7, is_active = $8, updated_at = $9
             WHERE id = $1
             RETURNING {}",
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(posting.title)
        .bind(posting.description)
        .bind(posting.requirements)
        .bind(posting.required_skills)
        .bind(posting.min_experience)
        .bind(posting.education_required)
        .bind(is_active)
        .bind(now())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list(&self, filter: &JobFilter, page: PageRequest) -> Result<Page<Job>> {
        let (filters, args) = job_filters(filter);
        let where_clause = where_clause(&filters);

        let items_query = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC, id LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let mut items_statement = sqlx::query(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let rows = items_statement
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let items = rows.iter().map(job_from_row).collect::<Result<Vec<_>>>()?;

        let total_query = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn list_all(&self, filter: &JobFilter) -> Result<Vec<Job>> {
        let (filters, args) = job_filters(filter);
        let query = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at DESC, id",
            JOB_COLUMNS,
            where_clause(&filters)
        );
        let mut statement = sqlx::query(&query);
        for value in &args {
            statement = statement.bind(value);
        }
        let rows = statement.fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn insert_if_absent(&self, application: NewApplication) -> Result<(Application, bool)> {
        // An open record can close between the insert and the lookup, so
        // retry a few times before reporting the race.
        for _ in 0..3 {
            let at = now();
            let inserted = sqlx::query(&format!(
                "INSERT INTO applications (id, candidate_id, job_id, resume_id, status, match_score, version, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, 'pending', $5, 1, $6, $6)
                 ON CONFLICT (candidate_id, job_id) WHERE status IN {} DO NOTHING
                 RETURNING {}",
                OPEN_STATUSES, APPLICATION_COLUMNS
            ))
            .bind(Uuid::new_v4())
            .bind(application.candidate_id)
            .bind(application.job_id)
            .bind(application.resume_id)
            .bind(application.match_score)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = inserted {
                return Ok((application_from_row(&row)?, true));
            }

            let existing = sqlx::query(&format!(
                "SELECT {} FROM applications
                 WHERE candidate_id = $1 AND job_id = $2 AND status IN {}",
                APPLICATION_COLUMNS, OPEN_STATUSES
            ))
            .bind(application.candidate_id)
            .bind(application.job_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = existing {
                return Ok((application_from_row(&row)?, false));
            }
        }

        Err(Error::Conflict(format!(
            "Application for candidate {} and job {} changed concurrently",
            application.candidate_id, application.job_id
        )))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Application>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn list(&self, filter: &ApplicationFilter, page: PageRequest) -> Result<Page<Application>> {
        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            filters.push(format!("status = ${}", args.len() + 1));
            args.push(status.as_str().to_string());
        }
        if let Some(candidate_id) = filter.candidate_id {
            filters.push(format!("candidate_id = ${}::uuid", args.len() + 1));
            args.push(candidate_id.to_string());
        }
        if let Some(job_id) = filter.job_id {
            filters.push(format!("job_id = ${}::uuid", args.len() + 1));
            args.push(job_id.to_string());
        }
        let where_clause = where_clause(&filters);

        let order_by = match filter.sort {
            ApplicationSort::CreatedAt => "created_at DESC, id",
            ApplicationSort::MatchScore => "match_score DESC, created_at DESC, id",
        };

        let items_query = format!(
            "SELECT {} FROM applications {} ORDER BY {} LIMIT ${} OFFSET ${}",
            APPLICATION_COLUMNS,
            where_clause,
            order_by,
            args.len() + 1,
            args.len() + 2
        );
        let mut items_statement = sqlx::query(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let rows = items_statement
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let items = rows
            .iter()
            .map(application_from_row)
            .collect::<Result<Vec<_>>>()?;

        let total_query = format!("SELECT COUNT(*) FROM applications {}", where_clause);
        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected_version: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let row = sqlx::query(&format!(
            "UPDATE applications
             SET status = $3, version = version + 1, updated_at = $4
             WHERE id = $1 AND version = $2
             RETURNING {}",
            APPLICATION_COLUMNS
        ))
        .bind(id)
        .bind(expected_version)
        .bind(status.as_str())
        .bind(now())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(application_from_row).transpose()
    }

    async fn job_ids_for_candidate(&self, candidate_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT job_id FROM applications WHERE candidate_id = $1",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn candidate_ids_for_job(&self, job_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT candidate_id FROM applications WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

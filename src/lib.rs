pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::Stores;
use crate::error::Result;
use crate::services::{
    application_service::ApplicationService, candidate_service::CandidateService,
    job_service::JobService, match_service::MatchService, profile_builder::ProfileBuilder,
    ranking_service::RankingService, requirement_builder::RequirementBuilder,
    resume_service::ResumeService, scoring_service::MatchScorer,
    skill_normalizer::SkillNormalizer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub candidate_service: CandidateService,
    pub resume_service: ResumeService,
    pub job_service: JobService,
    pub application_service: ApplicationService,
    pub match_service: MatchService,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Result<Self> {
        let normalizer = SkillNormalizer::new(config.skill_synonyms.load()?);
        let profile_builder = ProfileBuilder::new(normalizer.clone(), config.experience_precedence);
        let requirement_builder = RequirementBuilder::new(normalizer);
        let ranking_service = RankingService::new(
            MatchScorer::new(config.scoring_weights),
            config.ranking_threads,
        )?;

        let candidate_service = CandidateService::new(stores.candidates.clone());
        let resume_service =
            ResumeService::new(stores.resumes, stores.candidates, profile_builder);
        let job_service = JobService::new(stores.jobs, requirement_builder);
        let application_service =
            ApplicationService::new(stores.applications, config.status_update_retries);
        let match_service = MatchService::new(
            candidate_service.clone(),
            resume_service.clone(),
            job_service.clone(),
            application_service.clone(),
            ranking_service,
        );

        Ok(Self {
            config: Arc::new(config),
            candidate_service,
            resume_service,
            job_service,
            application_service,
            match_service,
        })
    }
}

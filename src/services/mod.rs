pub mod application_service;
pub mod candidate_service;
pub mod job_service;
pub mod match_service;
pub mod profile_builder;
pub mod ranking_service;
pub mod requirement_builder;
pub mod resume_service;
pub mod scoring_service;
pub mod skill_normalizer;

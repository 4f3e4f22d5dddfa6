use std::cmp::Ordering;
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};
use crate::models::matching::{CandidateProfile, JobRequirement, MatchResult};
use crate::services::scoring_service::MatchScorer;

/// An ordered list of match results, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    results: Vec<MatchResult>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_vec(self) -> Vec<MatchResult> {
        self.results
    }
}

impl IntoIterator for Ranking {
    type Item = MatchResult;
    type IntoIter = std::vec::IntoIter<MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Scores many pairs on a dedicated rayon pool so large batches never stall
/// the async runtime.
#[derive(Clone)]
pub struct RankingService {
    scorer: MatchScorer,
    pool: Arc<ThreadPool>,
}

impl RankingService {
    pub fn new(scorer: MatchScorer, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("ranking-{}", i))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build ranking pool: {}", e)))?;

        Ok(Self {
            scorer,
            pool: Arc::new(pool),
        })
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// Every job scored against one profile. Ties go to the newer requirement,
    /// then to the lower job id.
    pub fn rank_jobs_for_resume(
        &self,
        profile: &CandidateProfile,
        requirements: &[JobRequirement],
    ) -> Ranking {
        let scorer = self.scorer;
        let mut scored: Vec<(MatchResult, &JobRequirement)> = self.pool.install(|| {
            requirements
                .par_iter()
                .map(|requirement| (scorer.score(profile, requirement), requirement))
                .collect()
        });

        scored.sort_by(|(a, ra), (b, rb)| {
            by_score_desc(a, b)
                .then_with(|| rb.created_at.cmp(&ra.created_at))
                .then_with(|| ra.job_id.cmp(&rb.job_id))
        });

        Ranking {
            results: scored.into_iter().map(|(result, _)| result).collect(),
        }
    }

    /// Every profile scored against one requirement. Ties go to the more
    /// recently updated resume, then to the lower candidate id and profile id.
    pub fn rank_candidates_for_job(
        &self,
        requirement: &JobRequirement,
        profiles: &[CandidateProfile],
    ) -> Ranking {
        let scorer = self.scorer;
        let mut scored: Vec<(MatchResult, &CandidateProfile)> = self.pool.install(|| {
            profiles
                .par_iter()
                .map(|profile| (scorer.score(profile, requirement), profile))
                .collect()
        });

        scored.sort_by(|(a, pa), (b, pb)| {
            by_score_desc(a, b)
                .then_with(|| pb.source_updated_at.cmp(&pa.source_updated_at))
                .then_with(|| pa.candidate_id.cmp(&pb.candidate_id))
                .then_with(|| pa.profile_id.cmp(&pb.profile_id))
        });

        Ranking {
            results: scored.into_iter().map(|(result, _)| result).collect(),
        }
    }

    pub async fn rank_jobs(
        &self,
        profile: CandidateProfile,
        requirements: Vec<JobRequirement>,
    ) -> Result<Ranking> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.rank_jobs_for_resume(&profile, &requirements))
            .await
            .map_err(|e| Error::Internal(format!("ranking task failed: {}", e)))
    }

    pub async fn rank_candidates(
        &self,
        requirement: JobRequirement,
        profiles: Vec<CandidateProfile>,
    ) -> Result<Ranking> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || {
            service.rank_candidates_for_job(&requirement, &profiles)
        })
        .await
        .map_err(|e| Error::Internal(format!("ranking task failed: {}", e)))
    }
}

fn by_score_desc(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score.total_cmp(&a.score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Page, PageRequest};
    use crate::models::matching::EducationLevel;
    use crate::services::skill_normalizer::SkillNormalizer;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn profile(id: u128, candidate: u128, skills: &[&str], updated_day: u32) -> CandidateProfile {
        CandidateProfile {
            profile_id: Uuid::from_u128(id),
            candidate_id: Uuid::from_u128(candidate),
            skills: SkillNormalizer::default().skill_set(skills),
            experience_years: 5.0,
            education_level: EducationLevel::Masters,
            source_updated_at: at(updated_day),
        }
    }

    fn requirement(id: u128, skills: &[&str], created_day: u32) -> JobRequirement {
        JobRequirement {
            job_id: Uuid::from_u128(id),
            required_skills: SkillNormalizer::default().skill_set(skills),
            min_experience_years: 2.0,
            required_education: EducationLevel::Bachelors,
            created_at: at(created_day),
        }
    }

    fn service(threads: usize) -> RankingService {
        RankingService::new(MatchScorer::default(), threads).unwrap()
    }

    fn job_ids(ranking: &Ranking) -> Vec<u128> {
        ranking.clone().into_iter().map(|r| r.job_id.as_u128()).collect()
    }

    #[test]
    fn jobs_are_ordered_by_score_then_recency_then_id() {
        let candidate = profile(1, 1, &["rust", "sql"], 1);
        let requirements = vec![
            requirement(30, &["rust", "go"], 5),
            requirement(20, &["rust", "sql"], 1),
            requirement(11, &["rust", "go"], 9),
            requirement(10, &["rust", "go"], 9),
            requirement(40, &["java"], 1),
        ];

        let ranking = service(2).rank_jobs_for_resume(&candidate, &requirements);
        assert_eq!(job_ids(&ranking), vec![20, 10, 11, 30, 40]);

        let scores: Vec<f64> = ranking.into_iter().map(|r| r.score).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn candidates_are_ordered_by_score_then_resume_recency_then_ids() {
        let job = requirement(1, &["rust", "sql"], 1);
        let profiles = vec![
            profile(100, 3, &["rust"], 4),
            profile(101, 2, &["rust", "sql"], 1),
            profile(102, 1, &["rust"], 4),
            profile(103, 1, &["rust"], 2),
            profile(104, 5, &["cobol"], 9),
        ];

        let ranking = service(3).rank_candidates_for_job(&job, &profiles);
        let order: Vec<u128> = ranking.into_iter().map(|r| r.profile_id.as_u128()).collect();
        assert_eq!(order, vec![101, 102, 100, 103, 104]);
    }

    #[test]
    fn ranking_is_independent_of_input_order_and_pool_size() {
        let candidate = profile(1, 1, &["python", "docker", "aws"], 1);
        let mut requirements: Vec<JobRequirement> = (0..64u128)
            .map(|i| {
                let skills: &[&str] = match i % 4 {
                    0 => &["python"],
                    1 => &["python", "docker"],
                    2 => &["go", "aws"],
                    _ => &["haskell"],
                };
                requirement(i, skills, (i % 7) as u32 + 1)
            })
            .collect();

        let baseline = service(1).rank_jobs_for_resume(&candidate, &requirements);
        requirements.reverse();
        let reversed = service(8).rank_jobs_for_resume(&candidate, &requirements);
        assert_eq!(baseline, reversed);
        assert_eq!(baseline.len(), 64);
    }

    #[test]
    fn empty_inputs_give_empty_rankings() {
        let ranking = service(1).rank_jobs_for_resume(&profile(1, 1, &["go"], 1), &[]);
        assert!(ranking.is_empty());
    }

    #[test]
    fn pages_keep_the_ranked_order() {
        let candidate = profile(1, 1, &["go"], 1);
        let requirements: Vec<JobRequirement> =
            (0..5u128).map(|i| requirement(i, &["go"], 1)).collect();
        let ranked = service(2).rank_jobs_for_resume(&candidate, &requirements).into_vec();

        let second = Page::from_sorted(ranked.clone(), PageRequest::new(Some(2), Some(2)));
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.items[0].job_id, Uuid::from_u128(2));
        assert_eq!(second.total_pages, 3);

        let last = Page::from_sorted(ranked.clone(), PageRequest::new(Some(3), Some(2)));
        assert_eq!(last.items.len(), 1);
        assert!(Page::from_sorted(ranked, PageRequest::new(Some(4), Some(2))).items.is_empty());
    }

    #[tokio::test]
    async fn async_wrappers_match_the_blocking_calls() {
        let svc = service(2);
        let candidate = profile(1, 1, &["rust"], 1);
        let requirements = vec![requirement(1, &["rust"], 1), requirement(2, &["go"], 1)];

        let blocking = svc.rank_jobs_for_resume(&candidate, &requirements);
        let awaited = svc.rank_jobs(candidate, requirements).await.unwrap();
        assert_eq!(blocking, awaited);
    }
}

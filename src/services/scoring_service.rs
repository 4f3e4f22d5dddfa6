use crate::error::{Error, Result};
use crate::models::matching::{
    CandidateProfile, EducationLevel, JobRequirement, MatchResult, ScoreBreakdown, SkillSet,
};

/// Allowed drift of the weight sum away from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Credit lost per education level below the requirement.
pub const EDUCATION_GAP_PENALTY: f64 = 0.34;

/// Relative importance of the three sub-scores. Always sums to 1.0;
/// construct through [`ScoringWeights::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    skill_weight: f64,
    experience_weight: f64,
    education_weight: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill_weight: 0.6,
            experience_weight: 0.25,
            education_weight: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn new(skill_weight: f64, experience_weight: f64, education_weight: f64) -> Result<Self> {
        let weights = [
            ("skill_weight", skill_weight),
            ("experience_weight", experience_weight),
            ("education_weight", education_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidWeights(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let sum = skill_weight + experience_weight + education_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidWeights(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(Self {
            skill_weight,
            experience_weight,
            education_weight,
        })
    }

    pub fn skill_weight(&self) -> f64 {
        self.skill_weight
    }

    pub fn experience_weight(&self) -> f64 {
        self.experience_weight
    }

    pub fn education_weight(&self) -> f64 {
        self.education_weight
    }
}

pub struct SkillCoverage {
    pub ratio: f64,
    pub matched: SkillSet,
    pub unmatched: SkillSet,
}

/// Fraction of required skills the candidate holds. No requirement means full coverage.
pub fn skill_coverage(candidate_skills: &SkillSet, required_skills: &SkillSet) -> SkillCoverage {
    let (matched, unmatched): (SkillSet, SkillSet) = required_skills
        .iter()
        .cloned()
        .partition(|skill| candidate_skills.contains(skill));

    let ratio = if required_skills.is_empty() {
        1.0
    } else {
        matched.len() as f64 / required_skills.len() as f64
    };

    SkillCoverage {
        ratio,
        matched,
        unmatched,
    }
}

pub fn experience_sufficiency(experience_years: f64, min_experience_years: f64) -> f64 {
    if min_experience_years <= 0.0 {
        return 1.0;
    }
    (experience_years / min_experience_years.max(1.0)).clamp(0.0, 1.0)
}

pub fn education_sufficiency(have: EducationLevel, required: EducationLevel) -> f64 {
    if have >= required {
        return 1.0;
    }
    let gap = f64::from(have.levels_below(required));
    (1.0 - EDUCATION_GAP_PENALTY * gap).max(0.0)
}

/// Deterministic (profile, requirement) scorer. Pure; safe to share across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchScorer {
    weights: ScoringWeights,
}

impl MatchScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> ScoringWeights {
        self.weights
    }

    /// Swaps the weights, rejecting sets that do not sum to 1.0.
    pub fn reconfigure(
        &mut self,
        skill_weight: f64,
        experience_weight: f64,
        education_weight: f64,
    ) -> Result<()> {
        self.weights = ScoringWeights::new(skill_weight, experience_weight, education_weight)?;
        Ok(())
    }

    pub fn score(&self, profile: &CandidateProfile, requirement: &JobRequirement) -> MatchResult {
        let coverage = skill_coverage(&profile.skills, &requirement.required_skills);
        let experience =
            experience_sufficiency(profile.experience_years, requirement.min_experience_years);
        let education =
            education_sufficiency(profile.education_level, requirement.required_education);

        let weighted = self.weights.skill_weight * coverage.ratio
            + self.weights.experience_weight * experience
            + self.weights.education_weight * education;

        MatchResult {
            profile_id: profile.profile_id,
            candidate_id: profile.candidate_id,
            job_id: requirement.job_id,
            score: weighted.clamp(0.0, 1.0),
            matched_skills: coverage.matched,
            unmatched_required_skills: coverage.unmatched,
            breakdown: ScoreBreakdown {
                skill_coverage: coverage.ratio,
                experience_sufficiency: experience,
                education_sufficiency: education,
            },
        }
    }
}

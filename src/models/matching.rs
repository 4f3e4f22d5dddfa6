use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::skill_normalizer::normalize;

/// A canonical skill token. Only the normalizer constructs these, so two
/// skills compare equal exactly when their normalized text is equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skill(String);

impl Skill {
    pub(crate) fn from_normalized(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type SkillSet = BTreeSet<Skill>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "high_school")]
    HighSchool,
    #[serde(rename = "bachelors")]
    Bachelors,
    #[serde(rename = "masters")]
    Masters,
    #[serde(rename = "phd")]
    PhD,
}

// Short forms that collide with ordinary words only count when they are the
// whole degree string.
const WHOLE_STRING_DEGREES: &[(&str, EducationLevel)] = &[
    ("high school", EducationLevel::HighSchool),
    ("secondary", EducationLevel::HighSchool),
    ("ba", EducationLevel::Bachelors),
    ("bs", EducationLevel::Bachelors),
    ("be", EducationLevel::Bachelors),
    ("ma", EducationLevel::Masters),
    ("ms", EducationLevel::Masters),
    ("graduate", EducationLevel::Masters),
];

const DEGREE_WORDS: &[(&str, EducationLevel)] = &[
    ("ged", EducationLevel::HighSchool),
    ("diploma", EducationLevel::HighSchool),
    ("associate", EducationLevel::HighSchool),
    ("associates", EducationLevel::HighSchool),
    ("bachelor", EducationLevel::Bachelors),
    ("bachelors", EducationLevel::Bachelors),
    ("bsc", EducationLevel::Bachelors),
    ("btech", EducationLevel::Bachelors),
    ("undergraduate", EducationLevel::Bachelors),
    ("master", EducationLevel::Masters),
    ("masters", EducationLevel::Masters),
    ("msc", EducationLevel::Masters),
    ("mtech", EducationLevel::Masters),
    ("mba", EducationLevel::Masters),
    ("phd", EducationLevel::PhD),
    ("doctorate", EducationLevel::PhD),
    ("doctoral", EducationLevel::PhD),
    ("dphil", EducationLevel::PhD),
];

impl EducationLevel {
    pub const ALL: [EducationLevel; 4] = [
        EducationLevel::HighSchool,
        EducationLevel::Bachelors,
        EducationLevel::Masters,
        EducationLevel::PhD,
    ];

    pub fn ordinal(self) -> u8 {
        match self {
            EducationLevel::HighSchool => 0,
            EducationLevel::Bachelors => 1,
            EducationLevel::Masters => 2,
            EducationLevel::PhD => 3,
        }
    }

    /// Number of ordinal steps `self` sits below `required`; zero when it meets it.
    pub fn levels_below(self, required: EducationLevel) -> u8 {
        required.ordinal().saturating_sub(self.ordinal())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "high_school",
            EducationLevel::Bachelors => "bachelors",
            EducationLevel::Masters => "masters",
            EducationLevel::PhD => "phd",
        }
    }

    /// Reads a free-text degree ("B.Sc. Computer Science", "MBA", "Ph.D.")
    /// and returns the highest level it names, if any.
    pub fn from_degree_text(raw: &str) -> Option<Self> {
        let text = normalize(&raw.replace('_', " "));
        if text.is_empty() {
            return None;
        }
        let text = text.as_str();

        let mut found = WHOLE_STRING_DEGREES
            .iter()
            .find(|(alias, _)| *alias == text)
            .map(|(_, level)| *level);

        if text.contains("high school") {
            found = found.max(Some(EducationLevel::HighSchool));
        }

        for word in text.split(|c: char| c == ' ' || c == '-') {
            if let Some((_, level)) = DEGREE_WORDS.iter().find(|(alias, _)| *alias == word) {
                found = found.max(Some(*level));
            }
        }

        found
    }
}

impl fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured view of one resume. Built by the profile builder and never
/// edited in place; a changed resume produces a new profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub profile_id: Uuid,
    pub candidate_id: Uuid,
    pub skills: SkillSet,
    pub experience_years: f64,
    pub education_level: EducationLevel,
    /// When the source resume was last written; used to order ties.
    pub source_updated_at: DateTime<Utc>,
}

/// Structured view of one job posting. Replaced wholesale when the posting changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirement {
    pub job_id: Uuid,
    pub required_skills: SkillSet,
    pub min_experience_years: f64,
    pub required_education: EducationLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill_coverage: f64,
    pub experience_sufficiency: f64,
    pub education_sufficiency: f64,
}

/// Derived on demand from a (profile, requirement) pair; never the source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub profile_id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub score: f64,
    pub matched_skills: SkillSet,
    pub unmatched_required_skills: SkillSet,
    pub breakdown: ScoreBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn education_levels_are_ordered() {
        assert!(EducationLevel::HighSchool < EducationLevel::Bachelors);
        assert!(EducationLevel::Bachelors < EducationLevel::Masters);
        assert!(EducationLevel::Masters < EducationLevel::PhD);
        assert_eq!(EducationLevel::HighSchool.levels_below(EducationLevel::PhD), 3);
        assert_eq!(EducationLevel::PhD.levels_below(EducationLevel::Bachelors), 0);
    }

    #[test]
    fn degree_text_maps_to_levels() {
        assert_eq!(
            EducationLevel::from_degree_text("B.Sc. Computer Science"),
            Some(EducationLevel::Bachelors)
        );
        assert_eq!(
            EducationLevel::from_degree_text("Master of Business Administration"),
            Some(EducationLevel::Masters)
        );
        assert_eq!(EducationLevel::from_degree_text("Ph.D."), Some(EducationLevel::PhD));
        assert_eq!(EducationLevel::from_degree_text("M.S."), Some(EducationLevel::Masters));
        assert_eq!(
            EducationLevel::from_degree_text("High School Diploma"),
            Some(EducationLevel::HighSchool)
        );
        assert_eq!(EducationLevel::from_degree_text("high_school"), Some(EducationLevel::HighSchool));
        assert_eq!(EducationLevel::from_degree_text("BSc and MSc"), Some(EducationLevel::Masters));
    }

    #[test]
    fn short_aliases_need_the_whole_string() {
        assert_eq!(EducationLevel::from_degree_text("BE"), Some(EducationLevel::Bachelors));
        assert_eq!(EducationLevel::from_degree_text("to be completed"), None);
        assert_eq!(EducationLevel::from_degree_text("Certificate in welding"), None);
        assert_eq!(EducationLevel::from_degree_text("   "), None);
    }

    #[test]
    fn education_level_serializes_in_snake_case() {
        let json = serde_json::to_string(&EducationLevel::PhD).unwrap();
        assert_eq!(json, "\"phd\"");
        let parsed: EducationLevel = serde_json::from_str("\"high_school\"").unwrap();
        assert_eq!(parsed, EducationLevel::HighSchool);
    }
}

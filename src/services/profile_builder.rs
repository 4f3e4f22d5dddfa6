use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::models::matching::{CandidateProfile, EducationLevel, SkillSet};
use crate::models::resume::{ExperienceEntry, ParsedResume, Resume};
use crate::services::skill_normalizer::SkillNormalizer;
use crate::utils::time::{round_to_hundredths, years_between};

/// How the candidate-level experience figure combines with itemized entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExperiencePrecedence {
    /// The stated figure wins whenever present; itemized entries fill in otherwise.
    #[default]
    Explicit,
    /// The larger of the stated figure and the itemized total.
    Maximum,
}

impl fmt::Display for ExperiencePrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperiencePrecedence::Explicit => f.write_str("explicit"),
            ExperiencePrecedence::Maximum => f.write_str("maximum"),
        }
    }
}

impl FromStr for ExperiencePrecedence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(ExperiencePrecedence::Explicit),
            "maximum" | "max" => Ok(ExperiencePrecedence::Maximum),
            other => Err(format!("expected `explicit` or `maximum`, got `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    normalizer: SkillNormalizer,
    precedence: ExperiencePrecedence,
}

impl ProfileBuilder {
    pub fn new(normalizer: SkillNormalizer, precedence: ExperiencePrecedence) -> Self {
        Self {
            normalizer,
            precedence,
        }
    }

    /// Builds the profile for one stored resume. Pure: the same resume always
    /// yields the same profile.
    pub fn build(&self, resume: &Resume) -> Result<CandidateProfile> {
        let (skills, experience_years, education_level) = self.derive(&resume.parsed)?;
        Ok(CandidateProfile {
            profile_id: resume.id,
            candidate_id: resume.candidate_id,
            skills,
            experience_years,
            education_level,
            source_updated_at: resume.updated_at,
        })
    }

    /// Checks a parsed resume before it is stored.
    pub fn validate(&self, parsed: &ParsedResume) -> Result<()> {
        self.derive(parsed).map(|_| ())
    }

    fn derive(&self, parsed: &ParsedResume) -> Result<(SkillSet, f64, EducationLevel)> {
        let skills = self.normalizer.skill_set(&parsed.skills);
        if skills.is_empty() {
            return Err(Error::InvalidResumeData(
                "resume lists no recognisable skills".to_string(),
            ));
        }
        Ok((skills, self.experience_years(parsed)?, highest_education(parsed)))
    }

    fn experience_years(&self, parsed: &ParsedResume) -> Result<f64> {
        let stated = match parsed.experience_years {
            Some(years) if !years.is_finite() || years < 0.0 => {
                return Err(Error::InvalidResumeData(format!(
                    "experience_years must be a non-negative number, got {}",
                    years
                )))
            }
            other => other,
        };
        let itemized = itemized_experience(&parsed.experience_entries, parsed.parsed_on)?;

        let years = match (self.precedence, stated, itemized) {
            (ExperiencePrecedence::Explicit, Some(stated), _) => stated,
            (ExperiencePrecedence::Maximum, Some(stated), Some(itemized)) => stated.max(itemized),
            (_, Some(stated), None) => stated,
            (_, None, Some(itemized)) => itemized,
            (_, None, None) => 0.0,
        };
        Ok(years)
    }
}

/// Total years across itemized entries. Dated entries are merged as
/// intervals so overlapping positions count once; entries without a usable
/// range contribute their `years` figure. `None` when nothing contributes.
pub fn itemized_experience(
    entries: &[ExperienceEntry],
    parsed_on: Option<NaiveDate>,
) -> Result<Option<f64>> {
    let mut intervals: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    let mut undated_years = 0.0;
    let mut contributed = false;

    for entry in entries {
        if let Some(years) = entry.years {
            if !years.is_finite() || years < 0.0 {
                return Err(Error::InvalidResumeData(format!(
                    "experience entry has negative or invalid duration: {}",
                    years
                )));
            }
        }

        match (entry.start_date, entry.end_date.or(parsed_on)) {
            (Some(start), Some(end)) => {
                if end < start {
                    return Err(Error::InvalidResumeData(format!(
                        "experience entry ends ({}) before it starts ({})",
                        end, start
                    )));
                }
                intervals.push((start, end));
                contributed = true;
            }
            _ => {
                if let Some(years) = entry.years {
                    undated_years += years;
                    contributed = true;
                }
            }
        }
    }

    if !contributed {
        return Ok(None);
    }

    intervals.sort();
    let mut merged_years = 0.0;
    let mut current: Option<(NaiveDate, NaiveDate)> = None;
    for (start, end) in intervals {
        current = match current {
            Some((cur_start, cur_end)) if start <= cur_end => Some((cur_start, cur_end.max(end))),
            Some((cur_start, cur_end)) => {
                merged_years += years_between(cur_start, cur_end);
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((start, end)) = current {
        merged_years += years_between(start, end);
    }

    Ok(Some(round_to_hundredths(merged_years + undated_years)))
}

/// Highest level named by any education entry; high school when none is recognised.
pub fn highest_education(parsed: &ParsedResume) -> EducationLevel {
    parsed
        .education_entries
        .iter()
        .filter_map(|entry| EducationLevel::from_degree_text(&entry.degree))
        .max()
        .unwrap_or(EducationLevel::HighSchool)
}

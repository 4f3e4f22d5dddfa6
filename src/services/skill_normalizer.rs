use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::models::matching::{Skill, SkillSet};

/// Canonicalizes one free-text skill token.
///
/// NFKC-folds and lower-cases the input, drops punctuation, keeps `+` and `#`
/// (so `c`, `c++` and `c#` stay distinct), keeps hyphens only between two
/// alphanumerics, and collapses whitespace. Never fails; input with nothing
/// usable yields an empty skill.
pub fn normalize(raw: &str) -> Skill {
    let folded: Vec<char> = raw
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '+' || c == '#' || c == '-' {
                Some(c)
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    let mut cleaned = String::with_capacity(folded.len());
    for (i, &c) in folded.iter().enumerate() {
        if c == '-' {
            let internal = i > 0
                && i + 1 < folded.len()
                && folded[i - 1].is_alphanumeric()
                && folded[i + 1].is_alphanumeric();
            cleaned.push(if internal { '-' } else { ' ' });
        } else {
            cleaned.push(c);
        }
    }

    Skill::from_normalized(cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Alias → canonical table applied after normalization. Lookups are a
/// single step; canonical values are not re-resolved.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    aliases: HashMap<Skill, Skill>,
}

const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("ecmascript", "javascript"),
    ("es6", "javascript"),
    ("ts", "typescript"),
    ("node", "nodejs"),
    ("node js", "nodejs"),
    ("reactjs", "react"),
    ("react js", "react"),
    ("vuejs", "vue"),
    ("angularjs", "angular"),
    ("golang", "go"),
    ("python3", "python"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("mongo", "mongodb"),
    ("k8s", "kubernetes"),
    ("csharp", "c#"),
    ("c sharp", "c#"),
    ("cpp", "c++"),
    ("amazon web services", "aws"),
    ("google cloud platform", "gcp"),
    ("google cloud", "gcp"),
    ("microsoft azure", "azure"),
    ("sklearn", "scikit-learn"),
    ("ml", "machine learning"),
    ("ci-cd", "cicd"),
    ("springboot", "spring boot"),
];

impl SynonymTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_SYNONYMS.iter().copied())
    }

    pub fn from_pairs<I, A, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let aliases = pairs
            .into_iter()
            .filter_map(|(alias, canonical)| {
                let alias = normalize(alias.as_ref());
                let canonical = normalize(canonical.as_ref());
                if alias.is_empty() || canonical.is_empty() || alias == canonical {
                    None
                } else {
                    Some((alias, canonical))
                }
            })
            .collect();
        Self { aliases }
    }

    /// Loads a JSON object of `"alias": "canonical"` pairs.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read synonym file {}: {}", path.display(), e))
        })?;
        let pairs: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("Invalid synonym file {}: {}", path.display(), e))
        })?;
        let table = Self::from_pairs(pairs);
        if table.is_empty() {
            warn!(path = %path.display(), "synonym file holds no usable aliases");
        } else {
            info!(path = %path.display(), aliases = table.len(), "loaded skill synonyms");
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn resolve(&self, skill: Skill) -> Skill {
        match self.aliases.get(&skill) {
            Some(canonical) => canonical.clone(),
            None => skill,
        }
    }
}

/// Normalization plus the configured synonym table. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SkillNormalizer {
    synonyms: Arc<SynonymTable>,
}

impl SkillNormalizer {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self {
            synonyms: Arc::new(synonyms),
        }
    }

    pub fn canonical(&self, raw: &str) -> Skill {
        self.synonyms.resolve(normalize(raw))
    }

    /// Normalizes and deduplicates a list of raw tokens, dropping empties.
    pub fn skill_set<I, S>(&self, raws: I) -> SkillSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raws.into_iter()
            .map(|raw| self.canonical(raw.as_ref()))
            .filter(|skill| !skill.is_empty())
            .collect()
    }

    /// Splits a delimited skills string (commas, semicolons or newlines).
    pub fn split_list(&self, raw: &str) -> SkillSet {
        self.skill_set(raw.split(|c| c == ',' || c == ';' || c == '\n'))
    }
}

//! Rubric spec files
//!
//! `rubric.yaml` / `rubric.yml` / `rubric.json` next to an assignment's
//! `meta.json`. Parsed into [`RawRubricSpec`] and checked once into
//! [`RubricSpec`].

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::yaml::{parse_structured_file, YamlError};

/// Errors in a rubric spec; each one skips only its own folder
#[derive(Debug, Error)]
pub enum RubricSpecError {
    #[error(transparent)]
    Parse(#[from] YamlError),

    #[error("rubric must have a non-empty 'title'")]
    MissingTitle,

    #[error("rubric must have a non-empty 'criteria' list")]
    NoCriteria,

    #[error("criterion {index} must have a 'description'")]
    MissingDescription { index: usize },

    #[error("criterion '{criterion}' must have a non-empty 'ratings' list")]
    NoRatings { criterion: String },

    #[error("criterion '{criterion}' rating {index} must have a 'description'")]
    RatingDescription { criterion: String, index: usize },

    #[error("criterion '{criterion}' rating {index} must have 'points'")]
    RatingPoints { criterion: String, index: usize },

    #[error("criterion '{criterion}' has unknown kind '{kind}' (expected local or outcome)")]
    UnknownKind { criterion: String, kind: String },

    #[error("'{value}' is not a valid id")]
    InvalidId { value: String },
}

/// An id written either as a number or as a string of digits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(u64),
    Text(String),
}

impl IdValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            IdValue::Number(n) => Some(*n),
            IdValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for IdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdValue::Number(n) => write!(f, "{}", n),
            IdValue::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRubricSpec {
    pub title: Option<String>,
    #[serde(alias = "free_form_comments")]
    pub free_form_criterion_comments: Option<bool>,
    pub association: Option<RawAssociation>,
    pub criteria: Option<Vec<RawCriterion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssociation {
    /// Accepted for compatibility; associations always target an assignment
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<IdValue>,
    pub purpose: Option<String>,
    pub use_for_grading: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCriterion {
    pub id: Option<IdValue>,
    pub kind: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub points: Option<f64>,
    pub use_range: Option<bool>,
    pub ratings: Option<Vec<RawRating>>,
    pub outcome_code: Option<String>,
    pub mastery_points: Option<f64>,
    pub use_for_scoring: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRating {
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub points: Option<f64>,
}

/// How the created rubric is bound to its assignment
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationPolicy {
    /// Explicit assignment id; the assignment matched by name otherwise
    pub assignment_id: Option<u64>,
    pub purpose: String,
    pub use_for_grading: bool,
}

impl Default for AssociationPolicy {
    fn default() -> Self {
        Self {
            assignment_id: None,
            purpose: "grading".to_string(),
            use_for_grading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    Local,
    Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingSpec {
    pub description: String,
    pub long_description: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionSpec {
    pub id: String,
    pub kind: CriterionKind,
    pub description: String,
    pub long_description: String,
    /// Explicit points; authoritative when set
    pub points: Option<f64>,
    pub use_range: bool,
    pub ratings: Vec<RatingSpec>,
    pub outcome_code: Option<String>,
    pub mastery_points: Option<f64>,
    pub use_for_scoring: bool,
}

impl CriterionSpec {
    /// Explicit points, else the highest rating, else 0
    pub fn effective_points(&self) -> f64 {
        self.points.unwrap_or_else(|| {
            self.ratings
                .iter()
                .map(|r| r.points)
                .fold(None, |max: Option<f64>, p| Some(max.map_or(p, |m| m.max(p))))
                .unwrap_or(0.0)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RubricSpec {
    pub title: String,
    pub free_form_comments: bool,
    pub association: AssociationPolicy,
    pub criteria: Vec<CriterionSpec>,
}

impl RubricSpec {
    /// Read and check a rubric file (YAML or JSON by extension)
    pub fn load(path: &Path) -> Result<Self, RubricSpecError> {
        let raw: RawRubricSpec = parse_structured_file(path)?;
        Self::try_from(raw)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<RawRubricSpec> for RubricSpec {
    type Error = RubricSpecError;

    fn try_from(raw: RawRubricSpec) -> Result<Self, Self::Error> {
        let title = non_empty(raw.title).ok_or(RubricSpecError::MissingTitle)?;

        let raw_criteria = raw.criteria.unwrap_or_default();
        if raw_criteria.is_empty() {
            return Err(RubricSpecError::NoCriteria);
        }
        let criteria = raw_criteria
            .into_iter()
            .enumerate()
            .map(|(i, c)| criterion(i + 1, c))
            .collect::<Result<Vec<_>, _>>()?;

        let association = match raw.association {
            Some(a) => {
                let defaults = AssociationPolicy::default();
                AssociationPolicy {
                    assignment_id: a
                        .id
                        .map(|id| {
                            id.as_u64().ok_or_else(|| RubricSpecError::InvalidId {
                                value: id.to_string(),
                            })
                        })
                        .transpose()?,
                    purpose: non_empty(a.purpose).unwrap_or(defaults.purpose),
                    use_for_grading: a.use_for_grading.unwrap_or(defaults.use_for_grading),
                }
            }
            None => AssociationPolicy::default(),
        };

        Ok(Self {
            title,
            free_form_comments: raw.free_form_criterion_comments.unwrap_or(false),
            association,
            criteria,
        })
    }
}

/// Check one criterion; `position` is 1-based
fn criterion(position: usize, raw: RawCriterion) -> Result<CriterionSpec, RubricSpecError> {
    let id = non_empty(raw.id.map(|id| id.to_string())).unwrap_or_else(|| format!("crit_{}", position));
    let description =
        non_empty(raw.description).ok_or(RubricSpecError::MissingDescription { index: position })?;

    let kind = match non_empty(raw.kind).map(|k| k.to_ascii_lowercase()).as_deref() {
        None | Some("local") => CriterionKind::Local,
        Some("outcome") => CriterionKind::Outcome,
        Some(other) => {
            return Err(RubricSpecError::UnknownKind {
                criterion: id,
                kind: other.to_string(),
            })
        }
    };

    let raw_ratings = raw.ratings.unwrap_or_default();
    if raw_ratings.is_empty() {
        return Err(RubricSpecError::NoRatings { criterion: id });
    }
    let mut ratings = Vec::with_capacity(raw_ratings.len());
    for (index, rating) in raw_ratings.into_iter().enumerate() {
        let description =
            non_empty(rating.description).ok_or_else(|| RubricSpecError::RatingDescription {
                criterion: id.clone(),
                index: index + 1,
            })?;
        let points = rating.points.ok_or_else(|| RubricSpecError::RatingPoints {
            criterion: id.clone(),
            index: index + 1,
        })?;
        ratings.push(RatingSpec {
            description,
            long_description: rating.long_description.unwrap_or_default(),
            points,
        });
    }

    Ok(CriterionSpec {
        id,
        kind,
        description,
        long_description: raw.long_description.unwrap_or_default(),
        points: raw.points,
        use_range: raw.use_range.unwrap_or(false),
        ratings,
        outcome_code: non_empty(raw.outcome_code),
        mastery_points: raw.mastery_points,
        use_for_scoring: raw.use_for_scoring.unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse_yaml;

    fn spec(yaml: &str) -> Result<RubricSpec, RubricSpecError> {
        let raw: RawRubricSpec = parse_yaml(yaml, "rubric.yaml").unwrap();
        RubricSpec::try_from(raw)
    }

    const ESSAY: &str = r#"
title: Essay Rubric
free_form_comments: true
criteria:
  - description: Thesis
    ratings:
      - {description: Strong, points: 5}
      - {description: Weak, points: 1}
  - id: evidence
    kind: outcome
    outcome_code: OC-1
    description: Evidence
    points: 10
    ratings:
      - {description: Full, points: 4}
      - {description: None, points: 3}
"#;

    #[test]
    fn test_defaults_applied() {
        let spec = spec(ESSAY).unwrap();
        assert!(spec.free_form_comments);
        assert_eq!(spec.association, AssociationPolicy::default());
        assert_eq!(spec.criteria[0].id, "crit_1");
        assert_eq!(spec.criteria[0].kind, CriterionKind::Local);
        assert!(spec.criteria[0].use_for_scoring);
        assert_eq!(spec.criteria[1].id, "evidence");
        assert_eq!(spec.criteria[1].kind, CriterionKind::Outcome);
    }

    #[test]
    fn test_points_policy() {
        let spec = spec(ESSAY).unwrap();
        // Highest rating when unset
        assert_eq!(spec.criteria[0].effective_points(), 5.0);
        // Explicit value wins over ratings that sum to 7
        assert_eq!(spec.criteria[1].effective_points(), 10.0);
    }

    #[test]
    fn test_negative_ratings_still_pick_the_max() {
        let c = CriterionSpec {
            id: "c".to_string(),
            kind: CriterionKind::Local,
            description: "d".to_string(),
            long_description: String::new(),
            points: None,
            use_range: false,
            ratings: vec![
                RatingSpec {
                    description: "a".to_string(),
                    long_description: String::new(),
                    points: -2.0,
                },
                RatingSpec {
                    description: "b".to_string(),
                    long_description: String::new(),
                    points: -1.0,
                },
            ],
            outcome_code: None,
            mastery_points: None,
            use_for_scoring: true,
        };
        assert_eq!(c.effective_points(), -1.0);
    }

    #[test]
    fn test_association_overrides() {
        let spec = spec(
            "title: T\nassociation: {type: Assignment, id: \"42\", purpose: bookmark, use_for_grading: false}\ncriteria:\n  - {description: A, ratings: [{description: x, points: 1}]}\n",
        )
        .unwrap();
        assert_eq!(spec.association.assignment_id, Some(42));
        assert_eq!(spec.association.purpose, "bookmark");
        assert!(!spec.association.use_for_grading);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(spec("criteria: []"), Err(RubricSpecError::MissingTitle)));
        assert!(matches!(spec("title: T\ncriteria: []"), Err(RubricSpecError::NoCriteria)));
        assert!(matches!(
            spec("title: T\ncriteria:\n  - {ratings: [{description: x, points: 1}]}"),
            Err(RubricSpecError::MissingDescription { index: 1 })
        ));
        assert!(matches!(
            spec("title: T\ncriteria:\n  - {description: A, ratings: []}"),
            Err(RubricSpecError::NoRatings { .. })
        ));
        assert!(matches!(
            spec("title: T\ncriteria:\n  - {description: A, ratings: [{description: x}]}"),
            Err(RubricSpecError::RatingPoints { index: 1, .. })
        ));
        assert!(matches!(
            spec("title: T\ncriteria:\n  - {description: A, kind: peer, ratings: [{description: x, points: 1}]}"),
            Err(RubricSpecError::UnknownKind { .. })
        ));
        assert!(matches!(
            spec("title: T\nassociation: {id: abc}\ncriteria:\n  - {description: A, ratings: [{description: x, points: 1}]}"),
            Err(RubricSpecError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_load_json_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("rubric.json");
        std::fs::write(
            &path,
            r#"{"title": "J", "criteria": [{"description": "A", "ratings": [{"description": "x", "points": 2}]}]}"#,
        )
        .unwrap();
        let spec = RubricSpec::load(&path).unwrap();
        assert_eq!(spec.title, "J");
        assert_eq!(spec.criteria[0].effective_points(), 2.0);
    }
}

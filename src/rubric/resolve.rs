//! Outcome alignment and points resolution
//!
//! Turns a checked [`RubricSpec`] into the rubric that is actually sent:
//! every criterion has its final points, and outcome criteria either carry a
//! remote outcome id or have been downgraded to local.

use crate::rubric::outcomes::OutcomeMapping;
use crate::rubric::spec::{AssociationPolicy, CriterionKind, CriterionSpec, RatingSpec, RubricSpec};

/// Outcome linkage of a criterion
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeLink {
    pub learning_outcome_id: u64,
    pub mastery_points: f64,
    pub use_for_scoring: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCriterion {
    pub id: String,
    pub description: String,
    pub long_description: String,
    pub points: f64,
    pub use_range: bool,
    pub ratings: Vec<RatingSpec>,
    pub outcome: Option<OutcomeLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRubric {
    pub title: String,
    pub free_form_comments: bool,
    pub association: AssociationPolicy,
    pub criteria: Vec<ResolvedCriterion>,
}

impl ResolvedRubric {
    /// Ratings in the widest criterion
    pub fn max_ratings(&self) -> usize {
        self.criteria.iter().map(|c| c.ratings.len()).max().unwrap_or(0)
    }
}

/// An outcome criterion rendered as local
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeFallback {
    pub criterion: String,
    pub reason: String,
}

impl std::fmt::Display for OutcomeFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "criterion '{}' created as local: {}", self.criterion, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub rubric: ResolvedRubric,
    /// At most one per criterion
    pub fallbacks: Vec<OutcomeFallback>,
}

pub fn resolve(spec: &RubricSpec, outcomes: &OutcomeMapping) -> Resolution {
    let mut fallbacks = Vec::new();
    let criteria = spec
        .criteria
        .iter()
        .map(|c| {
            let (outcome, fallback) = align(c, outcomes);
            fallbacks.extend(fallback);
            ResolvedCriterion {
                id: c.id.clone(),
                description: c.description.clone(),
                long_description: c.long_description.clone(),
                points: c.effective_points(),
                use_range: c.use_range,
                ratings: c.ratings.clone(),
                outcome,
            }
        })
        .collect();

    Resolution {
        rubric: ResolvedRubric {
            title: spec.title.clone(),
            free_form_comments: spec.free_form_comments,
            association: spec.association.clone(),
            criteria,
        },
        fallbacks,
    }
}

fn align(criterion: &CriterionSpec, outcomes: &OutcomeMapping) -> (Option<OutcomeLink>, Option<OutcomeFallback>) {
    if criterion.kind != CriterionKind::Outcome {
        return (None, None);
    }
    let fallback = |reason: String| OutcomeFallback {
        criterion: criterion.id.clone(),
        reason,
    };

    let Some(code) = criterion.outcome_code.as_deref() else {
        return (None, Some(fallback("no outcome_code given".to_string())));
    };
    match outcomes.get(code) {
        Some(id) => (
            Some(OutcomeLink {
                learning_outcome_id: id,
                mastery_points: criterion
                    .mastery_points
                    .unwrap_or_else(|| criterion.effective_points()),
                use_for_scoring: criterion.use_for_scoring,
            }),
            None,
        ),
        None => (None, Some(fallback(format!("outcome code '{}' is not in the outcome map", code)))),
    }
}

//! Request payloads for rubric creation

use crate::remote::NewRubricAssociation;
use crate::rubric::resolve::ResolvedRubric;
use crate::rubric::upload::format_points;

/// The assignment a rubric is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationTarget {
    pub assignment_id: u64,
    pub assignment_name: String,
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Flattened form parameters for the create-and-associate request
pub fn inline_params(rubric: &ResolvedRubric, target: &AssociationTarget) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("title".into(), rubric.title.clone()),
        ("rubric_id".into(), "new".into()),
        ("rubric[title]".into(), rubric.title.clone()),
        (
            "rubric[free_form_criterion_comments]".into(),
            flag(rubric.free_form_comments),
        ),
        ("rubric_association[association_type]".into(), "Assignment".into()),
        (
            "rubric_association[association_id]".into(),
            target.assignment_id.to_string(),
        ),
        (
            "rubric_association[use_for_grading]".into(),
            flag(rubric.association.use_for_grading),
        ),
        (
            "rubric_association[purpose]".into(),
            rubric.association.purpose.clone(),
        ),
        ("rubric_association[title]".into(), target.assignment_name.clone()),
    ];

    for (i, criterion) in rubric.criteria.iter().enumerate() {
        let base = format!("rubric[criteria][{}]", i);
        params.push((format!("{}[description]", base), criterion.description.clone()));
        params.push((
            format!("{}[long_description]", base),
            criterion.long_description.clone(),
        ));
        params.push((format!("{}[points]", base), format_points(criterion.points)));
        params.push((
            format!("{}[criterion_use_range]", base),
            flag(criterion.use_range),
        ));

        if let Some(outcome) = &criterion.outcome {
            params.push((
                format!("{}[learning_outcome_id]", base),
                outcome.learning_outcome_id.to_string(),
            ));
            params.push((
                format!("{}[mastery_points]", base),
                format_points(outcome.mastery_points),
            ));
            params.push((
                format!("{}[ignore_for_scoring]", base),
                flag(!outcome.use_for_scoring),
            ));
        }

        for (j, rating) in criterion.ratings.iter().enumerate() {
            let rbase = format!("{}[ratings][{}]", base, j);
            params.push((format!("{}[description]", rbase), rating.description.clone()));
            params.push((
                format!("{}[long_description]", rbase),
                rating.long_description.clone(),
            ));
            params.push((format!("{}[points]", rbase), format_points(rating.points)));
        }
    }

    params
}

/// Association request for a rubric created by an upload job
pub fn association_request(
    rubric: &ResolvedRubric,
    rubric_id: u64,
    target: &AssociationTarget,
) -> NewRubricAssociation {
    NewRubricAssociation {
        rubric_id,
        assignment_id: target.assignment_id,
        title: target.assignment_name.clone(),
        purpose: rubric.association.purpose.clone(),
        use_for_grading: rubric.association.use_for_grading,
    }
}

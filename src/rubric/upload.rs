//! CSV documents for rubric upload jobs

use crate::rubric::resolve::ResolvedRubric;

/// Columns preceding the rating groups
pub const CRITERION_COLUMNS: [&str; 6] = [
    "Rubric Name",
    "Criteria Name",
    "Criteria Description",
    "Criteria Points",
    "Criteria Enable Range",
    "Learning Outcome ID",
];

/// Columns repeated once per rating
pub const RATING_COLUMNS: [&str; 3] = ["Rating Name", "Rating Description", "Rating Points"];

/// Points without a trailing `.0` for whole numbers
pub fn format_points(points: f64) -> String {
    format!("{}", points)
}

/// One row per criterion; rows are padded to the widest criterion
pub fn render_csv(rubric: &ResolvedRubric) -> Result<Vec<u8>, csv::Error> {
    let width = rubric.max_ratings();
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = CRITERION_COLUMNS.to_vec();
    for _ in 0..width {
        header.extend(RATING_COLUMNS);
    }
    writer.write_record(&header)?;

    for criterion in &rubric.criteria {
        let mut row = vec![
            rubric.title.clone(),
            criterion.description.clone(),
            criterion.long_description.clone(),
            format_points(criterion.points),
            criterion.use_range.to_string(),
            criterion
                .outcome
                .as_ref()
                .map(|o| o.learning_outcome_id.to_string())
                .unwrap_or_default(),
        ];
        for rating in &criterion.ratings {
            row.push(rating.description.clone());
            row.push(rating.long_description.clone());
            row.push(format_points(rating.points));
        }
        row.resize(CRITERION_COLUMNS.len() + width * RATING_COLUMNS.len(), String::new());
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

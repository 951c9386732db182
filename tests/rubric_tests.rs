//! Rubric creation against an in-memory course

mod common;

use std::time::Duration;

use common::{fast_plan, TestCourse, MIXED_RUBRIC};
use zaphod::core::config::RubricStrategy;
use zaphod::core::loader::ChangeSet;
use zaphod::core::pipeline::{Pipeline, SyncPlan};
use zaphod::core::report::{Outcome, RunReport};
use zaphod::remote::{JobState, MemoryCourse, Mutation};
use zaphod::rubric::PollSettings;

fn rubric_plan(strategy: RubricStrategy) -> SyncPlan {
    let mut plan = fast_plan();
    plan.modules = false;
    plan.strategy = strategy;
    plan
}

fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn inline_params(course: &MemoryCourse) -> Vec<Vec<(String, String)>> {
    course
        .mutations()
        .into_iter()
        .filter_map(|m| match m {
            Mutation::CreateRubric { params } => Some(params),
            _ => None,
        })
        .collect()
}

fn uploads(course: &MemoryCourse) -> Vec<String> {
    course
        .mutations()
        .into_iter()
        .filter_map(|m| match m {
            Mutation::SubmitRubricUpload { csv } => Some(csv),
            _ => None,
        })
        .collect()
}

fn association_calls(course: &MemoryCourse) -> usize {
    course
        .mutations()
        .iter()
        .filter(|m| matches!(m, Mutation::CreateRubricAssociation(_)))
        .count()
}

/// One essay assignment with the mixed rubric
fn essay_course() -> (TestCourse, MemoryCourse, u64) {
    let tc = TestCourse::new();
    let folder = tc.assignment("essay.assignment", "Essay", &[]);
    tc.rubric(&folder, MIXED_RUBRIC);
    tc.outcome_map(r#"{"OC1": 9001}"#);

    let course = MemoryCourse::new(3);
    let assignment_id = course.add_assignment("Essay");
    (tc, course, assignment_id)
}

fn run(tc: &TestCourse, course: &MemoryCourse, plan: &SyncPlan) -> RunReport {
    let layout = tc.layout();
    Pipeline::new(&layout, course).sync(plan, None).unwrap()
}

#[test]
fn test_inline_rubric_with_outcome() {
    let (tc, course, assignment_id) = essay_course();

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Inline));

    assert_eq!(report.count(Outcome::Created), 1);
    assert_eq!(report.count(Outcome::Warned), 0);

    let calls = inline_params(&course);
    assert_eq!(calls.len(), 1);
    let params = &calls[0];
    assert_eq!(param(params, "rubric[title]"), Some("Essay Rubric"));
    assert_eq!(param(params, "rubric[free_form_criterion_comments]"), Some("1"));
    assert_eq!(param(params, "rubric[criteria][0][learning_outcome_id]"), None);
    assert_eq!(param(params, "rubric[criteria][1][learning_outcome_id]"), Some("9001"));
    assert_eq!(param(params, "rubric[criteria][1][mastery_points]"), Some("5"));
    assert_eq!(
        param(params, "rubric_association[association_id]"),
        Some(assignment_id.to_string().as_str())
    );

    let associations = course.associations();
    assert_eq!(associations.len(), 1);
    assert_eq!(associations[0].assignment_id, assignment_id);
    assert_eq!(associations[0].purpose, "grading");
    assert!(associations[0].use_for_grading);
}

#[test]
fn test_upload_rubric_with_outcome() {
    let (tc, course, assignment_id) = essay_course();
    course.script_uploads(vec![JobState::Pending, JobState::Processing, JobState::Imported]);

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Upload));

    assert_eq!(report.count(Outcome::Created), 1);
    let csv = uploads(&course);
    assert_eq!(csv.len(), 1);
    let rows: Vec<&str> = csv[0].lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("Essay Rubric,Thesis,,10,false,,"));
    assert!(rows[2].starts_with("Essay Rubric,Evidence,,5,false,9001,"));

    let associations = course.associations();
    assert_eq!(associations.len(), 1);
    assert_eq!(associations[0].assignment_id, assignment_id);
    assert_eq!(course.rubric_count(), 1);
}

#[test]
fn test_unknown_outcome_code_falls_back_to_local() {
    let (tc, course, _) = essay_course();
    tc.outcome_map(r#"{"OTHER": 1}"#);

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Inline));

    assert_eq!(report.count(Outcome::Created), 1);
    let warnings: Vec<String> = report
        .with_outcome(Outcome::Warned)
        .map(|e| e.detail.clone())
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("crit_2"));
    assert!(warnings[0].contains("OC1"));

    let params = &inline_params(&course)[0];
    assert_eq!(param(params, "rubric[criteria][1][learning_outcome_id]"), None);
    assert_eq!(param(params, "rubric[criteria][1][points]"), Some("5"));
}

#[test]
fn test_declared_points_win_over_ratings() {
    let tc = TestCourse::new();
    let folder = tc.assignment("lab.assignment", "Lab", &[]);
    tc.rubric(
        &folder,
        r#"
title: Lab Rubric
criteria:
  - description: Method
    points: 10
    ratings:
      - {description: Good, points: 4}
      - {description: Fair, points: 3}
"#,
    );
    tc.outcome_map("{}");
    let course = MemoryCourse::new(3);
    course.add_assignment("Lab");

    run(&tc, &course, &rubric_plan(RubricStrategy::Inline));
    run(&tc, &course, &rubric_plan(RubricStrategy::Upload));

    let params = &inline_params(&course)[0];
    assert_eq!(param(params, "rubric[criteria][0][points]"), Some("10"));
    let csv = &uploads(&course)[0];
    assert!(csv.lines().nth(1).unwrap().starts_with("Lab Rubric,Method,,10,"));
}

#[test]
fn test_failed_upload_creates_no_association() {
    let (tc, course, _) = essay_course();
    course.script_uploads(vec![JobState::Processing, JobState::Failed]);

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Upload));

    assert_eq!(report.count(Outcome::Failed), 1);
    assert_eq!(association_calls(&course), 0);
    assert!(course.associations().is_empty());
}

#[test]
fn test_timed_out_upload_creates_no_association() {
    let (tc, course, _) = essay_course();
    course.script_uploads(vec![JobState::Processing]);
    let mut plan = rubric_plan(RubricStrategy::Upload);
    plan.poll = PollSettings {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(25),
    };

    let report = run(&tc, &course, &plan);

    let failed: Vec<String> = report
        .with_outcome(Outcome::Failed)
        .map(|e| e.detail.clone())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].contains("PROCESSING"), "{}", failed[0]);
    assert_eq!(association_calls(&course), 0);
}

#[test]
fn test_rejected_association_is_reported() {
    let (tc, course, _) = essay_course();
    course.fail_associations();

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Upload));

    assert_eq!(report.count(Outcome::Failed), 1);
    assert_eq!(course.rubric_count(), 1);
    assert!(course.associations().is_empty());
}

#[test]
fn test_bad_rubric_skips_only_its_folder() {
    let (tc, course, _) = essay_course();
    let broken = tc.assignment("broken.assignment", "Broken", &[]);
    tc.rubric(&broken, "title: Broken\ncriteria: []\n");
    let orphan = tc.assignment("orphan.assignment", "Orphan", &[]);
    tc.rubric(&orphan, MIXED_RUBRIC);
    course.add_assignment("Broken");

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Inline));

    let failed: Vec<&str> = report
        .with_outcome(Outcome::Failed)
        .map(|e| e.subject.as_str())
        .collect();
    assert_eq!(failed, vec!["broken.assignment", "orphan.assignment"]);
    assert_eq!(report.count(Outcome::Created), 1);
    assert_eq!(course.associations().len(), 1);
}

#[test]
fn test_change_set_limits_rubric_folders() {
    let (tc, course, _) = essay_course();
    let other = tc.assignment("quiz.assignment", "Quiz", &[]);
    let changed = tc.rubric(&other, MIXED_RUBRIC);
    course.add_assignment("Quiz");

    let layout = tc.layout();
    let changes = ChangeSet::new([changed]);
    let report = Pipeline::new(&layout, &course)
        .sync(&rubric_plan(RubricStrategy::Inline), Some(&changes))
        .unwrap();

    let created: Vec<&str> = report
        .with_outcome(Outcome::Created)
        .map(|e| e.subject.as_str())
        .collect();
    assert_eq!(created, vec!["quiz.assignment"]);
    assert_eq!(inline_params(&course).len(), 1);
}

#[test]
fn test_explicit_association_id_is_used() {
    let tc = TestCourse::new();
    let folder = tc.assignment("essay.assignment", "Essay", &[]);
    tc.rubric(
        &folder,
        r#"
title: Essay Rubric
association: {type: Assignment, id: "555", purpose: bookmark, use_for_grading: false}
criteria:
  - description: Thesis
    ratings: [{description: Strong, points: 3}]
"#,
    );
    tc.outcome_map("{}");
    let course = MemoryCourse::new(3);

    let report = run(&tc, &course, &rubric_plan(RubricStrategy::Upload));

    assert_eq!(report.count(Outcome::Created), 1);
    let associations = course.associations();
    assert_eq!(associations[0].assignment_id, 555);
    assert_eq!(associations[0].purpose, "bookmark");
    assert!(!associations[0].use_for_grading);
}

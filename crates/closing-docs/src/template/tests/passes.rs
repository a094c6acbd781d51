use super::common::*;
use crate::template::{TemplateProcessor, Value};

fn rush_model(rush: bool) -> Value {
    Value::object([
        ("Clause", Value::text("IF Loan.Rush")),
        ("Rush", Value::Bool(rush)),
    ])
}

#[test]
fn markers_revealed_by_substitution_run_in_extra_pass() {
    let model = rush_model(true);
    let mut containers = vec![body(&["{Loan.Clause}", "Rush delivery", "ENDIF"])];

    let report = TemplateProcessor::new("Loan").process(&mut containers, &model);

    assert_eq!(lines(&containers[0]), vec!["Rush delivery"]);
    assert_eq!(report.containers[0].extra_passes, 1);
    assert_eq!(report.containers[0].markers_remaining, 0);
}

#[test]
fn zero_extra_passes_leaves_revealed_markers() {
    let model = rush_model(false);
    let mut containers = vec![body(&["{Loan.Clause}", "Rush delivery", "ENDIF"])];

    let report = TemplateProcessor::new("Loan")
        .with_max_extra_passes(0)
        .process(&mut containers, &model);

    assert_eq!(
        lines(&containers[0]),
        vec!["IF Loan.Rush", "Rush delivery", "ENDIF"]
    );
    assert_eq!(report.containers[0].markers_remaining, 2);
}

#[test]
fn unchanged_pass_stops_early() {
    let model = rush_model(true);
    let mut containers = vec![body(&["stray", "ENDIF"])];

    let report = TemplateProcessor::new("Loan")
        .with_max_extra_passes(5)
        .process(&mut containers, &model);

    assert_eq!(lines(&containers[0]), vec!["stray", "ENDIF"]);
    assert_eq!(report.containers[0].extra_passes, 1);
    assert_eq!(report.containers[0].markers_remaining, 1);
}

#[test]
fn merged_text_is_not_treated_as_template() {
    let model = Value::object([
        ("Note", Value::text("{Loan.Secret}")),
        ("Secret", Value::text("LEAKED")),
    ]);
    let mut containers = vec![body(&["Memo: {Loan.Note}", "IF Loan.Secret == 'x'"])];

    let report = TemplateProcessor::new("Loan")
        .with_max_extra_passes(3)
        .process(&mut containers, &model);

    assert_eq!(
        lines(&containers[0]),
        vec!["Memo: {Loan.Secret}", "IF Loan.Secret == 'x'"]
    );
    assert_eq!(report.containers[0].extra_passes, 1);
    assert!(report.containers[0].aborted);
}

use serde_json::json;

use super::common::*;
use crate::template::{Block, Container, Leaf, TemplateProcessor};

#[test]
fn placeholder_split_over_three_leaves_matches_single_leaf() {
    let model = loan();
    let mut split = Container::new(
        "body",
        vec![Block::new(vec![
            Leaf::formatted("Loan number {Lo", json!({"bold": true})),
            Leaf::formatted("an.Num", json!({"italic": true})),
            Leaf::formatted("ber} closes.", json!({"size": 11})),
        ])],
    );
    let mut whole = body(&["Loan number {Loan.Number} closes."]);

    let processor = TemplateProcessor::new("Loan");
    processor.process(std::slice::from_mut(&mut split), &model);
    processor.process(std::slice::from_mut(&mut whole), &model);

    assert_eq!(lines(&split), lines(&whole));
    assert_eq!(lines(&split), vec!["Loan number LN-1042 closes."]);
    let leaves = &split.blocks[0].leaves;
    assert_eq!(leaves[0].format.0, json!({"bold": true}));
    assert_eq!(leaves[1].format.0, json!({"italic": true}));
    assert_eq!(leaves[2].text, " closes.");
    assert_eq!(leaves[2].format.0, json!({"size": 11}));
}

#[test]
fn renders_typed_values() {
    let model = loan();
    let mut containers = vec![body(&[
        "Amount: ${Loan.Amount}",
        "Closing on {Loan.Closing}",
        "Product: {Loan.Product} ({Loan.Product.Name}/{Loan.Product.Value})",
        "Occupancy: [{Loan.Occupancy.Description}]",
        "Recording fee: {Loan.Fees.recording}",
        "Parties:{TAB}{Loan.Parties.Count}",
    ])];

    let report = TemplateProcessor::new("Loan").process(&mut containers, &model);

    assert_eq!(
        lines(&containers[0]),
        vec![
            "Amount: $325000",
            "Closing on March 7, 2025",
            "Product: 30-Year Fixed (Fixed30/30)",
            "Occupancy: []",
            "Recording fee: 120",
            "Parties:\t3",
        ]
    );
    assert_eq!(report.containers[0].unresolved, 0);
}

#[test]
fn unresolved_paths_blank_and_unqualified_stay() {
    let model = loan();
    let mut containers = vec![body(&["[{Loan.Lender.Name}] [{Deal.Number}]"])];

    let report = TemplateProcessor::new("Loan").process(&mut containers, &model);

    assert_eq!(lines(&containers[0]), vec!["[] [{Deal.Number}]"]);
    let body = report.container("body").expect("body report");
    assert_eq!(body.unresolved, 1);
    assert_eq!(body.unqualified, 1);
}

#[test]
fn second_run_over_output_is_unchanged() {
    let model = loan();
    let mut containers = vec![body(&[
        "Borrowers of {Loan.Number}:",
        "FOREACH p in Loan.Parties",
        "IF p.Signs",
        "{p.Name} signs as {p.Role}",
        "ENDIF",
        "ENDFOREACH",
        "Unknown {Other.Thing}",
    ])];
    let processor = TemplateProcessor::new("Loan");

    processor.process(&mut containers, &model);
    let first = containers.clone();
    let report = processor.process(&mut containers, &model);

    assert_eq!(containers, first);
    assert!(report.is_clean());
    assert_eq!(report.containers[0].extra_passes, 0);
}

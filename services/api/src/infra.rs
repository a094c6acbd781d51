use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use closing_docs::error::AppError;
use closing_docs::package::{DocumentAdapter, JsonDocumentAdapter, SourceError, TemplateSource};
use closing_docs::rules::{
    Condition, ConditionGroup, ConditionOperator, ConditionTerm, DocumentId, EvaluationContext,
    LoanType, LogicalOperator, OutputRule,
};
use closing_docs::template::{
    Block, Container, EnumValue, Leaf, TemplateDocument, TemplateProcessor, Value,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use serde_json::json;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) processor: TemplateProcessor,
}

/// Template store kept in memory, seeded with the sample package.
#[derive(Default, Clone)]
pub(crate) struct InMemoryTemplateSource {
    templates: Arc<Mutex<HashMap<DocumentId, Vec<u8>>>>,
}

impl InMemoryTemplateSource {
    pub(crate) fn with_samples() -> Result<Self, AppError> {
        let source = Self::default();
        for (id, document) in sample_templates() {
            source.insert(DocumentId::from(id), JsonDocumentAdapter.write(&document)?);
        }
        Ok(source)
    }

    pub(crate) fn insert(&self, id: DocumentId, bytes: Vec<u8>) {
        self.templates
            .lock()
            .expect("template store mutex poisoned")
            .insert(id, bytes);
    }
}

impl TemplateSource for InMemoryTemplateSource {
    fn fetch(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, SourceError> {
        let guard = self.templates.lock().expect("template store mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn leaf(field: &str, operator: ConditionOperator, value: &str, join: LogicalOperator) -> ConditionTerm {
    ConditionTerm::leaf(Condition::new(field, operator, [value]), join)
}

pub(crate) fn sample_loan_type() -> LoanType {
    LoanType {
        name: "Conventional Purchase".to_string(),
        default_documents: vec![
            DocumentId::from("promissory-note"),
            DocumentId::from("closing-disclosure"),
        ],
        rules: vec![
            OutputRule {
                name: "West coast addendum".to_string(),
                condition: Some(ConditionGroup::new(vec![leaf(
                    "PropertyState",
                    ConditionOperator::In,
                    "CA, OR, WA",
                    LogicalOperator::And,
                )])),
                then_generate: vec![DocumentId::from("state-addendum")],
            },
            OutputRule {
                name: "Non-owner occupancy rider".to_string(),
                condition: Some(ConditionGroup::new(vec![
                    leaf(
                        "Occupancy",
                        ConditionOperator::NotEquals,
                        "Primary",
                        LogicalOperator::Or,
                    ),
                    leaf(
                        "HasCoBorrower",
                        ConditionOperator::Equals,
                        "yes",
                        LogicalOperator::And,
                    ),
                ])),
                then_generate: vec![
                    DocumentId::from("occupancy-rider"),
                    DocumentId::from("promissory-note"),
                ],
            },
        ],
    }
}

pub(crate) fn sample_context() -> EvaluationContext {
    EvaluationContext::new()
        .with("PropertyState", "CA")
        .with("Occupancy", "Primary")
        .with("HasCoBorrower", "yes")
}

pub(crate) fn sample_model() -> Value {
    Value::from_json(json!({
        "Number": "LN-2025-0042",
        "Amount": 512000,
        "Rate": 6.125,
        "TermMonths": 360,
        "Closing": {"$date": "2025-11-14"},
        "Product": {"$enum": {"name": "Fixed30", "value": 30, "description": "30-Year Fixed"}},
        "Occupancy": {"$enum": {"name": "Primary", "value": 1, "description": "Primary Residence"}},
        "Property": {"Street": "1180 Harbor View Dr", "City": "Oakland", "State": "CA"},
        "Borrowers": [
            {"Name": "Ada Lovelace", "Role": "Borrower", "Email": "ada@example.com"},
            {"Name": "Charles Babbage", "Role": "Co-Borrower", "Email": null}
        ],
        "Fees": {"$map": {"Origination": 2560, "Appraisal": 550, "Recording": 120}}
    }))
}

fn lines(name: &str, text: &[&str]) -> Container {
    Container::new(name, text.iter().map(|line| Block::text(*line)).collect())
}

pub(crate) fn sample_templates() -> Vec<(&'static str, TemplateDocument)> {
    let signature = Block::new(vec![
        Leaf::new("Signed: {"),
        Leaf::formatted("borrower.Na", json!({"bold": true})),
        Leaf::new("me} ({borrower.Role})"),
    ]);

    let mut note_body = lines(
        "body",
        &[
            "FOR VALUE RECEIVED, the undersigned promise to pay ${Loan.Amount} at {Loan.Rate}% over {Loan.TermMonths} months.",
            "Product:{TAB}{Loan.Product}",
            "FOREACH borrower in Loan.Borrowers",
        ],
    );
    note_body.blocks.push(signature);
    note_body.blocks.extend(
        ["IF borrower.Email <> null", "Notices to {borrower.Email}", "ENDIF", "ENDFOREACH"]
            .into_iter()
            .map(Block::text),
    );

    vec![
        (
            "promissory-note",
            TemplateDocument::new(
                "Promissory Note",
                vec![
                    lines("header", &["Loan {Loan.Number}"]),
                    note_body,
                    lines("footer", &["Closing {Loan.Closing}"]),
                ],
            ),
        ),
        (
            "closing-disclosure",
            TemplateDocument::new(
                "Closing Disclosure",
                vec![lines(
                    "body",
                    &[
                        "Property: {Loan.Property.Street}, {Loan.Property.City} {Loan.Property.State}",
                        "Origination fee: ${Loan.Fees.Origination}",
                        "Appraisal fee: ${Loan.Fees.appraisal}",
                        "IF Loan.Amount > 500000 and Loan.Occupancy = 'Primary'",
                        "High-balance primary residence disclosure applies.",
                        "ENDIF",
                    ],
                )],
            ),
        ),
        (
            "state-addendum",
            TemplateDocument::new(
                "State Addendum",
                vec![lines(
                    "body",
                    &["{Loan.Property.State} addendum to loan {Loan.Number}, {Loan.Borrowers.Count} signers."],
                )],
            ),
        ),
        (
            "occupancy-rider",
            TemplateDocument::new(
                "Occupancy Rider",
                vec![lines(
                    "body",
                    &["Occupancy: {Loan.Occupancy.Description}"],
                )],
            ),
        ),
    ]
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Enum built from CLI-supplied text, used for quick what-if runs.
pub(crate) fn occupancy(name: &str) -> Value {
    match name.trim().to_ascii_lowercase().as_str() {
        "investment" => Value::Enum(EnumValue::new("Investment", 3, "Investment Property")),
        "second" | "second-home" => Value::Enum(EnumValue::new("SecondHome", 2, "Second Home")),
        _ => Value::Enum(EnumValue::new("Primary", 1, "Primary Residence")),
    }
}

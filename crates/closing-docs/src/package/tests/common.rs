use std::collections::HashMap;
use std::sync::Arc;

use crate::merge::MergeQueue;
use crate::package::{
    ClosingPackageService, DocumentAdapter, JsonDocumentAdapter, SourceError, TemplateSource,
};
use crate::rules::{
    Condition, ConditionGroup, ConditionOperator, ConditionTerm, DocumentId, LoanType,
    LogicalOperator, OutputRule,
};
use crate::template::{Block, Container, TemplateDocument, Value};

#[derive(Default)]
pub(super) struct MemorySource {
    templates: HashMap<DocumentId, Vec<u8>>,
}

impl MemorySource {
    pub(super) fn with(mut self, id: &str, lines: &[&str]) -> Self {
        let document = TemplateDocument::new(
            "",
            vec![Container::new(
                "body",
                lines.iter().map(|line| Block::text(*line)).collect(),
            )],
        );
        let bytes = JsonDocumentAdapter.write(&document).expect("serialize template");
        self.templates.insert(DocumentId::from(id), bytes);
        self
    }

    pub(super) fn with_raw(mut self, id: &str, bytes: &[u8]) -> Self {
        self.templates.insert(DocumentId::from(id), bytes.to_vec());
        self
    }
}

impl TemplateSource for MemorySource {
    fn fetch(&self, id: &DocumentId) -> Result<Option<Vec<u8>>, SourceError> {
        Ok(self.templates.get(id).cloned())
    }
}

pub(super) struct OfflineSource;

impl TemplateSource for OfflineSource {
    fn fetch(&self, _id: &DocumentId) -> Result<Option<Vec<u8>>, SourceError> {
        Err(SourceError::Unavailable("store offline".to_string()))
    }
}

pub(super) type MemoryService = ClosingPackageService<MemorySource, JsonDocumentAdapter>;

pub(super) fn source() -> MemorySource {
    MemorySource::default()
        .with("note", &["Promissory note for {Loan.Borrower}"])
        .with("deed", &["Deed of trust, {Loan.State}"])
        .with("ca-addendum", &["California addendum"])
}

pub(super) fn service(source: MemorySource) -> (Arc<MemoryService>, MergeQueue) {
    let queue = MergeQueue::new();
    let service = ClosingPackageService::new(
        Arc::new(source),
        Arc::new(JsonDocumentAdapter),
        queue.clone(),
    );
    (Arc::new(service), queue)
}

pub(super) fn loan_type() -> LoanType {
    LoanType {
        name: "Purchase".to_string(),
        default_documents: vec![DocumentId::from("note"), DocumentId::from("deed")],
        rules: vec![OutputRule {
            name: "California".to_string(),
            condition: Some(ConditionGroup::new(vec![ConditionTerm::leaf(
                Condition::new("State", ConditionOperator::Equals, ["CA"]),
                LogicalOperator::And,
            )])),
            then_generate: vec![DocumentId::from("ca-addendum")],
        }],
    }
}

pub(super) fn model() -> Value {
    Value::object([
        ("Borrower", Value::text("Ada Lovelace")),
        ("State", Value::text("CA")),
    ])
}

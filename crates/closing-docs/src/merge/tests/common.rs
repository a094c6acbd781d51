use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::MergeConfig;
use crate::merge::{MergeEventBus, MergeOrchestrator, MergeQueue, OutputRenderer, RenderError};
use crate::template::{Block, Container, TemplateDocument, Value};

pub(super) fn config(max_concurrency: usize) -> MergeConfig {
    MergeConfig {
        max_concurrency,
        poll_interval: Duration::from_millis(10),
        ..MergeConfig::default()
    }
}

pub(super) fn orchestrator(max_concurrency: usize) -> MergeOrchestrator {
    MergeOrchestrator::new(
        MergeQueue::new(),
        Arc::new(MergeEventBus::default()),
        &config(max_concurrency),
    )
}

pub(super) fn document(name: &str, line: &str) -> TemplateDocument {
    TemplateDocument::new(name, vec![Container::new("body", vec![Block::text(line)])])
}

pub(super) fn model() -> Arc<Value> {
    Arc::new(Value::object([("Borrower", Value::text("Ada"))]))
}

/// Counts renders in flight and remembers the peak.
#[derive(Default)]
pub(super) struct GaugedRenderer {
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub rendered: AtomicUsize,
}

impl OutputRenderer for GaugedRenderer {
    fn render(&self, document: &TemplateDocument) -> Result<Vec<u8>, RenderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(25));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(document.name.clone().into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }
}

/// Panics on documents named `boom`.
pub(super) struct FragileRenderer;

impl OutputRenderer for FragileRenderer {
    fn render(&self, document: &TemplateDocument) -> Result<Vec<u8>, RenderError> {
        if document.name == "boom" {
            panic!("renderer exploded");
        }
        Ok(document.name.clone().into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain"
    }
}

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use closing_docs::config::MergeConfig;
use closing_docs::error::AppError;
use closing_docs::merge::{
    MergeEvent, MergeEventBus, MergeOrchestrator, MergeQueue, OutputRenderer, PlainTextRenderer,
};
use closing_docs::package::{ClosingPackageService, JsonDocumentAdapter};
use closing_docs::rules::{EvaluationContext, LoanType, RuleEvaluator};
use closing_docs::template::{TemplateDocument, TemplateProcessor, Value};

use crate::cli::{OutputFormat, RulesEvaluateArgs, TemplateProcessArgs};
use crate::infra::{
    occupancy, read_json, sample_context, sample_loan_type, sample_model, InMemoryTemplateSource,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Property state used for document selection (defaults to CA)
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Occupancy: primary, second-home or investment
    #[arg(long)]
    pub(crate) occupancy: Option<String>,
    /// Closing date (YYYY-MM-DD) merged into the documents
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) closing_date: Option<NaiveDate>,
    /// Number of merges allowed to run at once
    #[arg(long, default_value_t = 2)]
    pub(crate) max_concurrency: usize,
}

pub(crate) fn run_rules_evaluate(args: RulesEvaluateArgs) -> Result<(), AppError> {
    let loan_type: LoanType = read_json(&args.loan_type)?;
    let context: serde_json::Value = read_json(&args.context)?;
    let context = EvaluationContext::from_json(&context);

    let selection = RuleEvaluator::new()
        .with_trace(args.trace)
        .evaluate(&loan_type, &context);

    println!("Documents for {}", display_name(&loan_type));
    for id in &selection.document_ids {
        println!("- {id}");
    }

    if args.trace {
        println!("\nTrace");
        for entry in &selection.trace {
            match &entry.rule {
                Some(rule) => println!("  [{rule}] {}", entry.message),
                None => println!("  {}", entry.message),
            }
        }
    }

    Ok(())
}

pub(crate) fn run_template_process(args: TemplateProcessArgs) -> Result<(), AppError> {
    let mut document: TemplateDocument = read_json(&args.template)?;
    let model: Value = read_json(&args.model)?;

    let report = TemplateProcessor::new(args.root.trim()).process_document(&mut document, &model);

    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&document)?,
        OutputFormat::Text => PlainTextRenderer::to_text(&document),
    };

    match &args.output {
        Some(path) => std::fs::write(path, rendered.as_bytes())?,
        None => println!("{rendered}"),
    }

    for container in &report.containers {
        if container.aborted || container.markers_remaining > 0 || container.unqualified > 0 {
            eprintln!(
                "warning: container '{}' aborted={} markers_left={} unresolved={} unqualified={}",
                container.name,
                container.aborted,
                container.markers_remaining,
                container.unresolved,
                container.unqualified
            );
        }
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        state,
        occupancy: occupancy_name,
        closing_date,
        max_concurrency,
    } = args;

    let loan_type = sample_loan_type();
    let mut context = sample_context();
    let mut model = sample_model();

    if let Some(state) = state.as_deref() {
        context.insert("PropertyState", state.trim().to_ascii_uppercase());
        set_member(&mut model, &["Property", "State"], Value::text(state.trim().to_ascii_uppercase()));
    }
    if let Some(name) = occupancy_name.as_deref() {
        let value = occupancy(name);
        if let Value::Enum(selected) = &value {
            context.insert("Occupancy", selected.name.clone().unwrap_or_default());
        }
        set_member(&mut model, &["Occupancy"], value);
    }
    if let Some(date) = closing_date {
        set_member(&mut model, &["Closing"], Value::Date(date));
    }

    println!("Closing package demo: {}", display_name(&loan_type));

    let queue = MergeQueue::new();
    let events = Arc::new(MergeEventBus::default());
    let mut subscriber = events.subscribe();
    let config = MergeConfig {
        max_concurrency: max_concurrency.max(1),
        ..MergeConfig::default()
    };
    let renderer: Arc<dyn OutputRenderer> = Arc::new(PlainTextRenderer);
    let orchestrator = MergeOrchestrator::new(queue.clone(), Arc::clone(&events), &config)
        .with_renderer(renderer);
    let service = ClosingPackageService::new(
        Arc::new(InMemoryTemplateSource::with_samples()?),
        Arc::new(JsonDocumentAdapter),
        queue,
    );

    let receipt = service.dispatch("demo-loan", &loan_type, &context, model)?;
    println!("\nSelected documents");
    for (id, job) in receipt.document_ids.iter().zip(&receipt.jobs) {
        println!("- {id} ({job})");
    }

    let started = Instant::now();
    let merged = orchestrator.process_pending().await;
    println!(
        "\nMerged {merged} document(s) with up to {} at once in {} ms",
        orchestrator.max_concurrency(),
        started.elapsed().as_millis()
    );

    while let Ok(event) = subscriber.try_recv() {
        match event {
            MergeEvent::Completed { job_id, key, output, .. } => {
                println!("  event: {job_id} completed {key} ({} bytes)", output.len())
            }
            MergeEvent::Failed { job_id, key, error, .. } => {
                println!("  event: {job_id} failed {key}: {error}")
            }
        }
    }

    let package = service.results("demo-loan").await?;
    for id in &receipt.document_ids {
        if let Some(output) = package.get(id.as_str()) {
            println!("\n=== {id} ===");
            println!("{}", String::from_utf8_lossy(output));
        }
    }

    Ok(())
}

fn display_name(loan_type: &LoanType) -> &str {
    if loan_type.name.is_empty() {
        "unnamed loan type"
    } else {
        &loan_type.name
    }
}

/// Overwrite a nested object member, creating intermediate objects.
fn set_member(model: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = model;
    for segment in parents {
        let Value::Object(members) = current else {
            return;
        };
        current = members
            .entry((*segment).to_string())
            .or_insert_with(|| Value::object(Vec::<(String, Value)>::new()));
    }
    if let Value::Object(members) = current {
        members.insert((*last).to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use closing_docs::template::Scope;

    #[test]
    fn set_member_replaces_nested_values() {
        let mut model = sample_model();
        set_member(&mut model, &["Property", "State"], Value::text("NV"));
        set_member(&mut model, &["Servicer", "Name"], Value::text("Harbor"));

        let scope = Scope::new("Loan", &model);
        assert_eq!(
            scope.resolve("Loan.Property.State").into_value(),
            Some(Value::text("NV"))
        );
        assert_eq!(
            scope.resolve("Loan.Servicer.Name").into_value(),
            Some(Value::text("Harbor"))
        );
    }

    #[tokio::test]
    async fn demo_runs_end_to_end() {
        let args = DemoArgs {
            state: Some("nv".to_string()),
            occupancy: Some("investment".to_string()),
            closing_date: NaiveDate::from_ymd_opt(2025, 12, 1),
            max_concurrency: 2,
        };

        run_demo(args).await.expect("demo completes");
    }
}

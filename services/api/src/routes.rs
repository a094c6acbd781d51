use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use closing_docs::package::{package_router, ClosingPackageService, DocumentAdapter, TemplateSource};
use closing_docs::rules::{DocumentSelection, EvaluationContext, LoanType, RuleEvaluator};
use closing_docs::template::{ProcessReport, TemplateDocument, TemplateProcessor, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::infra::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct RuleEvaluationRequest {
    pub(crate) loan_type: LoanType,
    #[serde(default)]
    pub(crate) context: serde_json::Value,
    #[serde(default)]
    pub(crate) trace: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TemplateProcessRequest {
    pub(crate) document: TemplateDocument,
    #[serde(default)]
    pub(crate) root_name: Option<String>,
    #[serde(default)]
    pub(crate) model: Value,
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateProcessResponse {
    pub(crate) document: TemplateDocument,
    pub(crate) report: ProcessReport,
}

pub(crate) fn with_closing_routes<S, D>(service: Arc<ClosingPackageService<S, D>>) -> axum::Router
where
    S: TemplateSource + 'static,
    D: DocumentAdapter + 'static,
{
    package_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/rules/evaluate",
            axum::routing::post(rules_evaluate_endpoint),
        )
        .route(
            "/api/v1/templates/process",
            axum::routing::post(template_process_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn rules_evaluate_endpoint(
    Json(payload): Json<RuleEvaluationRequest>,
) -> Json<DocumentSelection> {
    let context = EvaluationContext::from_json(&payload.context);
    let selection = RuleEvaluator::new()
        .with_trace(payload.trace)
        .evaluate(&payload.loan_type, &context);
    Json(selection)
}

pub(crate) async fn template_process_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<TemplateProcessRequest>,
) -> Json<TemplateProcessResponse> {
    let TemplateProcessRequest {
        mut document,
        root_name,
        model,
    } = payload;

    let processor = match root_name {
        Some(root) if !root.trim().is_empty() => {
            TemplateProcessor::new(root.trim()).with_max_extra_passes(state.processor.max_extra_passes())
        }
        _ => state.processor.clone(),
    };
    let report = processor.process_document(&mut document, &model);

    Json(TemplateProcessResponse { document, report })
}

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::adapter::DocumentAdapter;
use super::service::{ClosingPackageService, PackageError};
use super::source::TemplateSource;
use crate::rules::{EvaluationContext, LoanType};
use crate::template::Value;

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub loan_type: LoanType,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub model: Value,
}

/// Router exposing package dispatch and status per loan.
pub fn package_router<S, D>(service: Arc<ClosingPackageService<S, D>>) -> Router
where
    S: TemplateSource + 'static,
    D: DocumentAdapter + 'static,
{
    Router::new()
        .route(
            "/api/v1/loans/:loan_id/documents",
            post(dispatch_handler::<S, D>).get(status_handler::<S, D>),
        )
        .with_state(service)
}

pub(crate) async fn dispatch_handler<S, D>(
    State(service): State<Arc<ClosingPackageService<S, D>>>,
    Path(loan_id): Path<String>,
    axum::Json(request): axum::Json<DispatchRequest>,
) -> Response
where
    S: TemplateSource + 'static,
    D: DocumentAdapter + 'static,
{
    let context = EvaluationContext::from_json(&request.context);
    match service.dispatch(&loan_id, &request.loan_type, &context, request.model) {
        Ok(receipt) => (StatusCode::ACCEPTED, axum::Json(receipt)).into_response(),
        Err(error @ PackageError::TemplateNotFound(_)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error @ PackageError::Adapter(_)) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn status_handler<S, D>(
    State(service): State<Arc<ClosingPackageService<S, D>>>,
    Path(loan_id): Path<String>,
) -> Response
where
    S: TemplateSource + 'static,
    D: DocumentAdapter + 'static,
{
    match service.status(&loan_id) {
        Ok(status) => {
            let payload = json!({ "loan_id": loan_id, "status": status });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

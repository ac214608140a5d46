use actix_web::{web, HttpResponse};
use crate::error::ApiError;
use crate::models::{HealthResponse, PredictionRequest, PredictionSummary, RequestError, UnhealthyResponse};
use crate::routes::info;
use crate::services::{UpstreamClient, UpstreamError};
use std::sync::Arc;
use tracing::Instrument;

/// Request body limit when none is configured
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub body_limit: usize,
}

impl AppState {
    pub fn new(upstream: UpstreamClient) -> Self {
        Self {
            upstream: Arc::new(upstream),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }
}

/// Configure the prediction routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/predict")
            .route(web::post().to(forward_prediction))
            .route(web::get().to(health_check))
            .default_service(web::to(info::method_not_allowed)),
    );
}

/// Forward a prediction request to the backend
///
/// POST /api/predict
///
/// Request body:
/// ```json
/// {
///   "age": 58, "sex": 0, "cp": 0, "trestbps": 100, "chol": 248, "fbs": 0,
///   "restecg": 0, "thalach": 122, "exang": 0, "oldpeak": 1.0, "slope": 1,
///   "ca": 0, "thal": 2
/// }
/// ```
///
/// The payload is read by the handler rather than an extractor so that
/// malformed JSON and oversized bodies still get a JSON error body.
async fn forward_prediction(
    state: web::Data<AppState>,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let span = tracing::info_span!("predict", request_id = %uuid::Uuid::new_v4());

    receive(&state, payload).instrument(span).await
}

async fn receive(state: &AppState, payload: web::Payload) -> Result<HttpResponse, ApiError> {
    let body = read_body(payload, state.body_limit).await?;
    forward(&state.upstream, &body).await
}

async fn read_body(payload: web::Payload, limit: usize) -> Result<web::Bytes, ApiError> {
    match payload.to_bytes_limited(limit).await {
        Ok(Ok(body)) => Ok(body),
        Ok(Err(e)) => {
            tracing::error!("[Prediction] Failed to read body: {}", e);
            Err(RequestError::Payload(e.to_string()).into())
        }
        Err(_) => {
            tracing::info!("[Prediction] Body exceeds {} bytes", limit);
            Err(ApiError::PayloadTooLarge(limit))
        }
    }
}

async fn forward(upstream: &UpstreamClient, body: &[u8]) -> Result<HttpResponse, ApiError> {
    let record = PredictionRequest::parse(body).map_err(|e| {
        tracing::error!("[Prediction] Server error: {}", e);
        ApiError::from(e)
    })?;

    let missing = record.missing_fields();
    if !missing.is_empty() {
        tracing::info!("[Prediction] Missing required fields: {:?}", missing);
        return Err(ApiError::MissingFields(missing));
    }

    tracing::info!("[Prediction] Forwarding request to {}", upstream.endpoint("predict"));

    match upstream.predict(&record).await {
        Ok(result) => {
            tracing::info!("[Prediction] Success - {}", PredictionSummary::from_body(&result));
            Ok(HttpResponse::Ok().json(result))
        }
        Err(e) => {
            match &e {
                UpstreamError::Rejected { status, message } => {
                    tracing::error!("[Prediction] Backend error: status={}, error={}", status, message);
                }
                other => tracing::error!("[Prediction] Server error: {}", other),
            }
            Err(e.into())
        }
    }
}

/// Backend health check
///
/// GET /api/predict
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let api_url = state.upstream.api_url().to_string();

    match state.upstream.health().await {
        Ok(backend) => HttpResponse::Ok().json(HealthResponse {
            status: "healthy".to_string(),
            backend,
            api_url,
        }),
        Err(UpstreamError::Unhealthy(status)) => {
            tracing::warn!("Backend health check returned {}", status);
            HttpResponse::ServiceUnavailable().json(UnhealthyResponse {
                status: "unhealthy".to_string(),
                message: "Backend API is not responding".to_string(),
                api_url,
                error: None,
            })
        }
        Err(e) => {
            tracing::warn!("Backend health check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(UnhealthyResponse {
                status: "unhealthy".to_string(),
                message: "Cannot reach backend API".to_string(),
                api_url,
                error: Some(e.to_string()),
            })
        }
    }
}

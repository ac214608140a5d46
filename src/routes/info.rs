use actix_web::{HttpRequest, HttpResponse, Responder};
use crate::models::{ErrorResponse, ServiceInfo};

/// Service status
///
/// GET /
pub async fn service_info() -> impl Responder {
    HttpResponse::Ok().json(ServiceInfo {
        message: "HeartScan gateway is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// JSON 404 for unknown paths
pub async fn not_found(req: HttpRequest) -> impl Responder {
    tracing::debug!("No route for {} {}", req.method(), req.path());
    HttpResponse::NotFound().json(ErrorResponse::new("Not found").with_details(req.path()))
}

/// JSON 405 for known paths hit with an unsupported method
pub async fn method_not_allowed(req: HttpRequest) -> impl Responder {
    HttpResponse::MethodNotAllowed().json(
        ErrorResponse::new("Method not allowed")
            .with_details(format!("{} {}", req.method(), req.path())),
    )
}

// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Label, PredictionSummary};
pub use requests::{PredictionRequest, RequestError, REQUIRED_FIELDS};
pub use responses::{ErrorResponse, HealthResponse, ServiceInfo, UnhealthyResponse};

//! HeartScan gateway - prediction forwarding service for the HeartScan form
//!
//! Receives patient records from the browser form, checks that every required
//! clinical parameter is present, and relays them to the external prediction
//! backend. Backend failures are normalized into JSON error responses.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use error::ApiError;
pub use models::{PredictionRequest, PredictionSummary, REQUIRED_FIELDS};
pub use routes::{configure_routes, AppState};
pub use services::{UpstreamClient, UpstreamError};

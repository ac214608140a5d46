// Service exports
pub mod upstream;

pub use upstream::{rejection_message, UpstreamClient, UpstreamError};

//! # api-adapters
//!
//! The HTTP surface of Classboard: a JSON API over the application
//! services, a small server-rendered index page, and the `/metrics`
//! endpoint.

pub mod metrics;
pub mod templates;

#[cfg(feature = "web-axum")]
pub mod dto;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
mod router;

use std::sync::Arc;

use services::Services;

pub use metrics::Metrics;
#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use router::router;

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
            metrics: Metrics::new(),
        }
    }
}

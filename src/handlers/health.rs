//! # Health Check Handler
//!
//! Used by load balancers and monitoring systems. It never touches the
//! database, so it answers as long as the process is serving.

use axum::Json;
use serde_json::{json, Value};

/// GET /health
///
/// ```json
/// { "status": "healthy", "service": "yelp-camp-server" }
/// ```
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "yelp-camp-server"
    }))
}

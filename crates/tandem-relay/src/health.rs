//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

/// Health check response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" while the process is serving.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently open WebSocket connections.
    pub connections: usize,
    /// Sessions referenced since startup.
    pub active_sessions: usize,
}

/// `GET /health` handler.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_owned(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        connections: state.relay.connection_count(),
        active_sessions: state.relay.registry.session_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes() {
        let response = HealthResponse {
            status: "ok".into(),
            uptime_secs: 42,
            connections: 2,
            active_sessions: 1,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["uptime_secs"], 42);
        assert_eq!(json["connections"], 2);
        assert_eq!(json["active_sessions"], 1);
    }
}

//! Read-only health view over the service state.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::capabilities::ServiceState;
use crate::clock::now_rfc3339;
use crate::routes::AppState;

/// Fixed, unauthenticated path of the health endpoint.
pub const HEALTH_PATH: &str = "/api/health";

/// Value of the `status` field; the process answering is healthy by definition.
pub const STATUS_OK: &str = "OK";

/// Database reachability as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    /// The startup connection attempt succeeded.
    Connected,
    /// The service runs degraded.
    Disconnected,
}

/// Health summary derived from a [`ServiceState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Always [`STATUS_OK`].
    pub status: &'static str,
    /// Database reachability.
    pub database_status: DatabaseStatus,
    /// Human-readable summary.
    pub message: String,
}

/// Builds the health summary for `state`. Pure; identical states yield
/// identical reports.
#[must_use]
pub fn report(state: &ServiceState) -> HealthReport {
    if state.database_connected() {
        HealthReport {
            status: STATUS_OK,
            database_status: DatabaseStatus::Connected,
            message: "Police records service is running with database connectivity".to_owned(),
        }
    } else {
        HealthReport {
            status: STATUS_OK,
            database_status: DatabaseStatus::Disconnected,
            message: "Police records service is running in degraded mode without database \
                      connectivity"
                .to_owned(),
        }
    }
}

/// Body served at [`HEALTH_PATH`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// RFC 3339 time the response was produced.
    pub timestamp: String,
    #[serde(flatten)]
    report: HealthReport,
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        timestamp: now_rfc3339(),
        report: report(state.service()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityRegistry, Environment};
    use blotter_config::RunMode;
    use rstest::rstest;

    fn state(connected: bool) -> ServiceState {
        let mut registry = CapabilityRegistry::new(Environment {
            mode: RunMode::Production,
            port: 5000,
        });
        if connected {
            registry.mark_database_connected();
        }
        registry.snapshot()
    }

    #[rstest]
    #[case(false, DatabaseStatus::Disconnected)]
    #[case(true, DatabaseStatus::Connected)]
    fn reflects_database_status(#[case] connected: bool, #[case] expected: DatabaseStatus) {
        let health = report(&state(connected));
        assert_eq!(health.status, STATUS_OK);
        assert_eq!(health.database_status, expected);
    }

    #[test]
    fn repeated_reports_are_identical() {
        let snapshot = state(false);
        assert_eq!(report(&snapshot), report(&snapshot));
    }

    #[test]
    fn serialises_with_wire_field_names() {
        let body = serde_json::to_value(HealthResponse {
            timestamp: "2026-01-01T00:00:00Z".to_owned(),
            report: report(&state(false)),
        })
        .expect("health response serialises");
        assert_eq!(body["status"], "OK");
        assert_eq!(body["databaseStatus"], "disconnected");
        assert_eq!(body["timestamp"], "2026-01-01T00:00:00Z");
        assert!(body["message"].is_string());
    }
}

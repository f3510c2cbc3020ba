use serde::Serialize;
use utoipa::ToSchema;

/// Reachability of the trivia backend at probe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendProbe {
    /// A backend is installed and answered the probe.
    Reachable,
    /// A backend is installed but the probe failed.
    Unreachable,
    /// No backend is installed yet.
    Missing,
}

/// Payload of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when the backend answered, `degraded` otherwise.
    pub status: &'static str,
    /// Outcome of the backend probe.
    pub backend: BackendProbe,
    /// Number of live play sessions.
    pub sessions: usize,
}

impl HealthResponse {
    /// Summarise a probe outcome.
    pub fn from_probe(backend: BackendProbe, sessions: usize) -> Self {
        let status = match backend {
            BackendProbe::Reachable => "ok",
            BackendProbe::Unreachable | BackendProbe::Missing => "degraded",
        };
        Self {
            status,
            backend,
            sessions,
        }
    }
}

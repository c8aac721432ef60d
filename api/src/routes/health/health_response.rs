use ai_llm_service::health_service::HealthStatus;
use file_store::StoreStats;
use serde::Serialize;

/// Response payload for /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"ok"` when every probe passed, `"degraded"` otherwise.
    pub status: &'static str,
    /// Chat and embedding backends, in that order.
    pub providers: Vec<HealthStatus>,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StoreStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

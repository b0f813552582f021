use axum::{extract::State, response::Json as ResponseJson};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct HealthStatus {
    pub database: bool,
    pub payment_gateway: bool,
    pub signature: bool,
    pub crm: bool,
}

/// Liveness and database connectivity
pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<HealthStatus>> {
    let database = sqlx::query("SELECT 1")
        .execute(&deployment.db().pool)
        .await
        .inspect_err(|e| tracing::error!("Health check query failed: {e}"))
        .is_ok();
    let integrations = deployment.integrations();
    ResponseJson(ApiResponse::success(HealthStatus {
        database,
        payment_gateway: integrations.payment_gateway.is_some(),
        signature: integrations.signature.is_some(),
        crm: integrations.crm.is_some(),
    }))
}

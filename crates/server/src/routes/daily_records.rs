use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate, NaiveTime};
use db::models::daily_record::{
    AttendanceEntry, DEFAULT_LATE_TOLERANCE_MINUTES, DailyRecord, UpsertDailyRecord,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
    pub tolerance_minutes: Option<i64>,
}

/// Check-in/out of a child; date and time default to now.
#[derive(Debug, Deserialize)]
pub struct PresenceMark {
    pub child_id: Uuid,
    pub date: Option<NaiveDate>,
    pub at: Option<NaiveTime>,
}

impl PresenceMark {
    fn resolve(&self) -> (NaiveDate, NaiveTime) {
        let now = Local::now().naive_local();
        (
            self.date.unwrap_or(now.date()),
            self.at.unwrap_or(now.time()),
        )
    }
}

/// Daily records of every child for one day
pub async fn records_for_day(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<DateQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<DailyRecord>>>, ApiError> {
    let date = query.date.unwrap_or_else(utils::date::today);
    let records = DailyRecord::find_by_date(&deployment.db().pool, date).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

/// Create or replace a child's record for a day
pub async fn upsert_record(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<UpsertDailyRecord>,
) -> Result<ResponseJson<ApiResponse<DailyRecord>>, ApiError> {
    if let (Some(start), Some(end)) = (payload.nap_start, payload.nap_end) {
        if end < start {
            return Err(ApiError::BadRequest("nap ends before it starts".into()));
        }
    }
    let record = DailyRecord::upsert(&deployment.db().pool, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// Record a child's arrival
pub async fn check_in(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<PresenceMark>,
) -> Result<ResponseJson<ApiResponse<DailyRecord>>, ApiError> {
    let (date, at) = payload.resolve();
    let record = DailyRecord::check_in(&deployment.db().pool, payload.child_id, date, at).await?;
    tracing::info!(child_id = %payload.child_id, %date, %at, "Check-in");
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// Record a child's departure
pub async fn check_out(
    State(deployment): State<DeploymentImpl>,
    axum::Json(payload): axum::Json<PresenceMark>,
) -> Result<ResponseJson<ApiResponse<DailyRecord>>, ApiError> {
    let (date, at) = payload.resolve();
    let record = DailyRecord::check_out(&deployment.db().pool, payload.child_id, date, at).await?;
    tracing::info!(child_id = %payload.child_id, %date, %at, "Check-out");
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// Delete a daily record
pub async fn delete_record(
    State(deployment): State<DeploymentImpl>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if DailyRecord::delete(&deployment.db().pool, id).await? == 0 {
        return Err(ApiError::NotFound("daily record"));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Attendance status of every active child for one day
pub async fn attendance(
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<AttendanceQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AttendanceEntry>>>, ApiError> {
    let date = query.date.unwrap_or_else(utils::date::today);
    let tolerance = query
        .tolerance_minutes
        .unwrap_or(DEFAULT_LATE_TOLERANCE_MINUTES)
        .max(0);
    let sheet = DailyRecord::attendance_sheet(&deployment.db().pool, date, tolerance).await?;
    Ok(ResponseJson(ApiResponse::success(sheet)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .nest(
            "/daily-records",
            Router::new()
                .route("/", get(records_for_day).put(upsert_record))
                .route("/check-in", post(check_in))
                .route("/check-out", post(check_out))
                .route("/{id}", delete(delete_record)),
        )
        .route("/attendance", get(attendance))
}

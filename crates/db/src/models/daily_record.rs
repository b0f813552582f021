use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::child::Child;

/// Minutes after the expected arrival before a check-in counts as late.
pub const DEFAULT_LATE_TOLERANCE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Derive the attendance label from the stored record fields.
    pub fn derive(
        check_in: Option<NaiveTime>,
        expected_arrival: Option<NaiveTime>,
        absence_justified: bool,
        tolerance_minutes: i64,
    ) -> Self {
        match (check_in, expected_arrival) {
            (None, _) if absence_justified => AttendanceStatus::Excused,
            (None, _) => AttendanceStatus::Absent,
            (Some(arrived), Some(expected))
                if arrived > expected + TimeDelta::minutes(tolerance_minutes) =>
            {
                AttendanceStatus::Late
            }
            (Some(_), _) => AttendanceStatus::Present,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Presente",
            AttendanceStatus::Absent => "Ausente",
            AttendanceStatus::Late => "Atrasado",
            AttendanceStatus::Excused => "Falta justificada",
        }
    }
}

/// One child's agenda entry for a day
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DailyRecord {
    pub id: Uuid,
    pub child_id: Uuid,
    pub record_date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub absence_justified: bool,
    pub mood: Option<String>,
    pub nap_start: Option<NaiveTime>,
    pub nap_end: Option<NaiveTime>,
    pub meals_summary: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertDailyRecord {
    pub child_id: Uuid,
    pub record_date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub absence_justified: Option<bool>,
    pub mood: Option<String>,
    pub nap_start: Option<NaiveTime>,
    pub nap_end: Option<NaiveTime>,
    pub meals_summary: Option<String>,
    pub notes: Option<String>,
}

/// Attendance sheet line: every active child appears, with or without a record
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AttendanceEntry {
    pub child_id: Uuid,
    pub child_name: String,
    pub classroom: Option<String>,
    pub record: Option<DailyRecord>,
    pub status: AttendanceStatus,
    pub status_label: String,
}

impl DailyRecord {
    pub fn nap_minutes(&self) -> Option<i64> {
        match (self.nap_start, self.nap_end) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_minutes()),
            _ => None,
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(r#"SELECT * FROM daily_records WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_date(
        pool: &SqlitePool,
        record_date: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            r#"SELECT * FROM daily_records WHERE record_date = $1 ORDER BY created_at ASC"#,
        )
        .bind(record_date)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_child_in_range(
        pool: &SqlitePool,
        child_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            r#"SELECT * FROM daily_records
               WHERE child_id = $1 AND record_date >= $2 AND record_date <= $3
               ORDER BY record_date DESC"#,
        )
        .bind(child_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }

    /// Insert or replace the record of `(child_id, record_date)`.
    pub async fn upsert(pool: &SqlitePool, data: &UpsertDailyRecord) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            r#"INSERT INTO daily_records (id, child_id, record_date, check_in, check_out, absence_justified, mood, nap_start, nap_end, meals_summary, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT(child_id, record_date) DO UPDATE SET
                   check_in = excluded.check_in,
                   check_out = excluded.check_out,
                   absence_justified = excluded.absence_justified,
                   mood = excluded.mood,
                   nap_start = excluded.nap_start,
                   nap_end = excluded.nap_end,
                   meals_summary = excluded.meals_summary,
                   notes = excluded.notes,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(data.child_id)
        .bind(data.record_date)
        .bind(data.check_in)
        .bind(data.check_out)
        .bind(data.absence_justified.unwrap_or(false))
        .bind(&data.mood)
        .bind(data.nap_start)
        .bind(data.nap_end)
        .bind(&data.meals_summary)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn check_in(
        pool: &SqlitePool,
        child_id: Uuid,
        record_date: NaiveDate,
        at: NaiveTime,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            r#"INSERT INTO daily_records (id, child_id, record_date, check_in)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT(child_id, record_date) DO UPDATE SET
                   check_in = excluded.check_in,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(child_id)
        .bind(record_date)
        .bind(at)
        .fetch_one(pool)
        .await
    }

    pub async fn check_out(
        pool: &SqlitePool,
        child_id: Uuid,
        record_date: NaiveDate,
        at: NaiveTime,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, DailyRecord>(
            r#"INSERT INTO daily_records (id, child_id, record_date, check_out)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT(child_id, record_date) DO UPDATE SET
                   check_out = excluded.check_out,
                   updated_at = datetime('now', 'subsec')
               RETURNING *"#,
        )
        .bind(Uuid::new_v4())
        .bind(child_id)
        .bind(record_date)
        .bind(at)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM daily_records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Attendance for every active child on `record_date`.
    pub async fn attendance_sheet(
        pool: &SqlitePool,
        record_date: NaiveDate,
        tolerance_minutes: i64,
    ) -> Result<Vec<AttendanceEntry>, sqlx::Error> {
        let children = Child::find_active(pool).await?;
        let mut records = Self::find_by_date(pool, record_date).await?;

        Ok(children
            .into_iter()
            .map(|child| {
                let record = records
                    .iter()
                    .position(|r| r.child_id == child.id)
                    .map(|idx| records.swap_remove(idx));
                let status = AttendanceStatus::derive(
                    record.as_ref().and_then(|r| r.check_in),
                    child.expected_arrival,
                    record.as_ref().is_some_and(|r| r.absence_justified),
                    tolerance_minutes,
                );
                AttendanceEntry {
                    child_id: child.id,
                    child_name: child.full_name,
                    classroom: child.classroom,
                    record,
                    status,
                    status_label: status.label().to_string(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, models::child::tests::sample_child};

    fn at(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_attendance_status_derivation() {
        assert_eq!(
            AttendanceStatus::derive(None, at(8, 0), true, 15),
            AttendanceStatus::Excused
        );
        assert_eq!(
            AttendanceStatus::derive(None, at(8, 0), false, 15),
            AttendanceStatus::Absent
        );
        assert_eq!(
            AttendanceStatus::derive(at(8, 15), at(8, 0), false, 15),
            AttendanceStatus::Present
        );
        assert_eq!(
            AttendanceStatus::derive(at(8, 16), at(8, 0), false, 15),
            AttendanceStatus::Late
        );
        // No expected arrival configured: any check-in is on time
        assert_eq!(
            AttendanceStatus::derive(at(11, 0), None, false, 15),
            AttendanceStatus::Present
        );
    }

    #[tokio::test]
    async fn test_check_in_then_check_out_share_one_row() {
        let db = DBService::new_in_memory().await.unwrap();
        let child_id = Uuid::new_v4();
        Child::create(&db.pool, &sample_child("Helena"), child_id)
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();

        let first = DailyRecord::check_in(&db.pool, child_id, day, at(8, 30).unwrap())
            .await
            .unwrap();
        let second = DailyRecord::check_out(&db.pool, child_id, day, at(17, 0).unwrap())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.check_in, at(8, 30));
        assert_eq!(second.check_out, at(17, 0));

        let sheet = DailyRecord::attendance_sheet(&db.pool, day, DEFAULT_LATE_TOLERANCE_MINUTES)
            .await
            .unwrap();
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].status, AttendanceStatus::Late);
        assert_eq!(sheet[0].status_label, "Atrasado");
    }

    #[tokio::test]
    async fn test_attendance_sheet_lists_children_without_record() {
        let db = DBService::new_in_memory().await.unwrap();
        Child::create(&db.pool, &sample_child("Pedro"), Uuid::new_v4())
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let sheet = DailyRecord::attendance_sheet(&db.pool, day, 15).await.unwrap();
        assert_eq!(sheet.len(), 1);
        assert!(sheet[0].record.is_none());
        assert_eq!(sheet[0].status, AttendanceStatus::Absent);
    }
}

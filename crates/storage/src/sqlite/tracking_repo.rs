use hifz_core::model::{ScheduleId, StudentId, TrackingRecord, ValidatedTracking};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_tracking_row, tracking_id_from_i64, write_err};
use crate::repository::{StorageError, TrackingRepository};

#[async_trait::async_trait]
impl TrackingRepository for SqliteRepository {
    async fn append_record(
        &self,
        record: ValidatedTracking,
    ) -> Result<TrackingRecord, StorageError> {
        let schedule_id = record
            .schedule_id
            .map(|id| id_i64("schedule_id", id.value()))
            .transpose()?;
        let range = record.range;

        let res = sqlx::query(
            r"
                INSERT INTO tracking_records (
                    student_id, schedule_id, date,
                    surah_from, verse_from, surah_to, verse_to, page_from, page_to,
                    reading_type, pages_memorized, notes
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )
        .bind(id_i64("student_id", record.student_id.value())?)
        .bind(schedule_id)
        .bind(record.date)
        .bind(i64::from(range.surah_from))
        .bind(i64::from(range.verse_from))
        .bind(i64::from(range.surah_to))
        .bind(i64::from(range.verse_to))
        .bind(range.page_from.map(i64::from))
        .bind(range.page_to.map(i64::from))
        .bind(record.reading_type.as_str())
        .bind(record.pages_memorized.map(i64::from))
        .bind(record.notes.clone())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(record.assign_id(tracking_id_from_i64(res.last_insert_rowid())?))
    }

    async fn records_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<TrackingRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, student_id, schedule_id, date,
                    surah_from, verse_from, surah_to, verse_to, page_from, page_to,
                    reading_type, pages_memorized, notes
                FROM tracking_records
                WHERE student_id = ?1
                ORDER BY date ASC, id ASC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_tracking_row(&row)?);
        }
        Ok(out)
    }

    async fn count_for_schedule(&self, schedule_id: ScheduleId) -> Result<u64, StorageError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tracking_records WHERE schedule_id = ?1")
                .bind(id_i64("schedule_id", schedule_id.value())?)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        u64::try_from(count).map_err(|_| StorageError::Serialization("count overflow".into()))
    }
}

use hifz_core::model::{Schedule, ScheduleId, StudentId};

use super::SqliteRepository;
use super::mapping::{db_err, id_i64, map_schedule_row, schedule_id_from_i64, write_err};
use crate::repository::{ScheduleRepository, StorageError};

const SCHEDULE_COLUMNS: &str = r"
    id, student_id, title, schedule_type, pages_per_period, verses_per_period,
    start_date, expected_completion_date, target_total_pages, is_active, created_at
";

#[async_trait::async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<ScheduleId, StorageError> {
        let rate = schedule.target_rate();
        let res = sqlx::query(
            r"
            INSERT INTO schedules (
                student_id, title, schedule_type, pages_per_period, verses_per_period,
                start_date, expected_completion_date, target_total_pages, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(id_i64("student_id", schedule.student_id().value())?)
        .bind(schedule.title().map(ToOwned::to_owned))
        .bind(schedule.schedule_type().as_str())
        .bind(rate.pages_per_period())
        .bind(rate.verses_per_period())
        .bind(schedule.start_date())
        .bind(schedule.expected_completion_date())
        .bind(schedule.target_total_pages().map(i64::from))
        .bind(i64::from(schedule.is_active()))
        .bind(schedule.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        schedule_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let rate = schedule.target_rate();
        sqlx::query(
            r"
            INSERT INTO schedules (
                id, student_id, title, schedule_type, pages_per_period, verses_per_period,
                start_date, expected_completion_date, target_total_pages, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                -- student_id and created_at are fixed at insert
                title = excluded.title,
                schedule_type = excluded.schedule_type,
                pages_per_period = excluded.pages_per_period,
                verses_per_period = excluded.verses_per_period,
                start_date = excluded.start_date,
                expected_completion_date = excluded.expected_completion_date,
                target_total_pages = excluded.target_total_pages,
                is_active = excluded.is_active
            ",
        )
        .bind(id_i64("schedule_id", schedule.id().value())?)
        .bind(id_i64("student_id", schedule.student_id().value())?)
        .bind(schedule.title().map(ToOwned::to_owned))
        .bind(schedule.schedule_type().as_str())
        .bind(rate.pages_per_period())
        .bind(rate.verses_per_period())
        .bind(schedule.start_date())
        .bind(schedule.expected_completion_date())
        .bind(schedule.target_total_pages().map(i64::from))
        .bind(i64::from(schedule.is_active()))
        .bind(schedule.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?1"
        ))
        .bind(id_i64("schedule_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_schedule_row).transpose()
    }

    async fn schedules_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Schedule>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE student_id = ?1 ORDER BY id ASC"
        ))
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_schedule_row(&row)?);
        }
        Ok(out)
    }

    async fn active_schedule(
        &self,
        student_id: StudentId,
    ) -> Result<Option<Schedule>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE student_id = ?1 AND is_active = 1"
        ))
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_schedule_row).transpose()
    }

    async fn activate_schedule(
        &self,
        student_id: StudentId,
        schedule_id: ScheduleId,
    ) -> Result<(), StorageError> {
        let student = id_i64("student_id", student_id.value())?;
        let schedule = id_i64("schedule_id", schedule_id.value())?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Write first so the transaction takes the write lock before reading;
        // a competing activation waits on busy_timeout.
        sqlx::query(
            r"
            UPDATE schedules SET is_active = 0
            WHERE student_id = ?1 AND is_active = 1 AND id <> ?2
            ",
        )
        .bind(student)
        .bind(schedule)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        let res = sqlx::query(
            r"
            UPDATE schedules SET is_active = 1
            WHERE id = ?1 AND student_id = ?2
            ",
        )
        .bind(schedule)
        .bind(student)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;

        if res.rows_affected() == 0 {
            let owner: Option<i64> =
                sqlx::query_scalar("SELECT student_id FROM schedules WHERE id = ?1")
                    .bind(schedule)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            tx.rollback().await.map_err(db_err)?;
            return Err(match owner {
                Some(_) => StorageError::Conflict,
                None => StorageError::NotFound,
            });
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn deactivate_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE schedules SET is_active = 0 WHERE id = ?1")
            .bind(id_i64("schedule_id", schedule_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_schedule(&self, schedule_id: ScheduleId) -> Result<(), StorageError> {
        let id = id_i64("schedule_id", schedule_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tracking_records WHERE schedule_id = ?1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        if referenced > 0 {
            tx.rollback().await.map_err(db_err)?;
            return Err(StorageError::Conflict);
        }

        let res = sqlx::query("DELETE FROM schedules WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        if res.rows_affected() == 0 {
            tx.rollback().await.map_err(db_err)?;
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

use hifz_core::model::{Homework, StudentId, ValidatedHomework};

use super::SqliteRepository;
use super::mapping::{db_err, homework_id_from_i64, id_i64, map_homework_row, write_err};
use crate::repository::{HomeworkRepository, StorageError};

#[async_trait::async_trait]
impl HomeworkRepository for SqliteRepository {
    async fn insert_homework(
        &self,
        homework: ValidatedHomework,
    ) -> Result<Homework, StorageError> {
        let range = homework.range;
        let res = sqlx::query(
            r"
                INSERT INTO homework (
                    student_id, surah_from, verse_from, surah_to, verse_to,
                    page_from, page_to, assigned_on, due_on, notes
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(id_i64("student_id", homework.student_id.value())?)
        .bind(i64::from(range.surah_from))
        .bind(i64::from(range.verse_from))
        .bind(i64::from(range.surah_to))
        .bind(i64::from(range.verse_to))
        .bind(range.page_from.map(i64::from))
        .bind(range.page_to.map(i64::from))
        .bind(homework.assigned_on)
        .bind(homework.due_on)
        .bind(homework.notes.clone())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(homework.assign_id(homework_id_from_i64(res.last_insert_rowid())?))
    }

    async fn homework_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<Homework>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, student_id, surah_from, verse_from, surah_to, verse_to,
                    page_from, page_to, assigned_on, due_on, notes
                FROM homework
                WHERE student_id = ?1
                ORDER BY assigned_on DESC, id DESC
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_homework_row(&row)?);
        }
        Ok(out)
    }
}

use hifz_core::model::{
    Homework, HomeworkId, ReadingType, Schedule, ScheduleId, ScheduleType, StudentId, TargetRate,
    TrackingRecord, TrackingRecordId, VerseRange,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Maps constraint violations to `Conflict`, everything else to `Connection`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            StorageError::Conflict
        }
        _ => db_err(e),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn schedule_id_from_i64(v: i64) -> Result<ScheduleId, StorageError> {
    Ok(ScheduleId::new(i64_to_u64("schedule_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn tracking_id_from_i64(v: i64) -> Result<TrackingRecordId, StorageError> {
    Ok(TrackingRecordId::new(i64_to_u64("tracking_id", v)?))
}

pub(crate) fn homework_id_from_i64(v: i64) -> Result<HomeworkId, StorageError> {
    Ok(HomeworkId::new(i64_to_u64("homework_id", v)?))
}

pub(crate) fn parse_schedule_type(s: &str) -> Result<ScheduleType, StorageError> {
    match s {
        "daily" => Ok(ScheduleType::Daily),
        "weekly" => Ok(ScheduleType::Weekly),
        "monthly" => Ok(ScheduleType::Monthly),
        _ => Err(StorageError::Serialization(format!(
            "invalid schedule type: {s}"
        ))),
    }
}

pub(crate) fn parse_reading_type(s: &str) -> Result<ReadingType, StorageError> {
    match s {
        "memorize" => Ok(ReadingType::Memorize),
        "revise" => Ok(ReadingType::Revise),
        "read" => Ok(ReadingType::Read),
        _ => Err(StorageError::Serialization(format!(
            "invalid reading type: {s}"
        ))),
    }
}

fn u16_column(row: &SqliteRow, column: &'static str) -> Result<u16, StorageError> {
    let raw: i64 = row.try_get(column).map_err(ser)?;
    u16::try_from(raw).map_err(|_| StorageError::Serialization(format!("invalid {column}: {raw}")))
}

fn opt_u16_column(row: &SqliteRow, column: &'static str) -> Result<Option<u16>, StorageError> {
    row.try_get::<Option<i64>, _>(column)
        .map_err(ser)?
        .map(|raw| {
            u16::try_from(raw)
                .map_err(|_| StorageError::Serialization(format!("invalid {column}: {raw}")))
        })
        .transpose()
}

/// Reads the six range columns shared by tracking records and homework.
///
/// Ranges are not re-validated here; invalid ranges surface during
/// aggregation.
pub(crate) fn range_from_row(row: &SqliteRow) -> Result<VerseRange, StorageError> {
    Ok(VerseRange {
        surah_from: u16_column(row, "surah_from")?,
        verse_from: u16_column(row, "verse_from")?,
        surah_to: u16_column(row, "surah_to")?,
        verse_to: u16_column(row, "verse_to")?,
        page_from: opt_u16_column(row, "page_from")?,
        page_to: opt_u16_column(row, "page_to")?,
    })
}

pub(crate) fn map_schedule_row(row: &SqliteRow) -> Result<Schedule, StorageError> {
    let schedule_type =
        parse_schedule_type(row.try_get::<String, _>("schedule_type").map_err(ser)?.as_str())?;
    let target_rate = TargetRate::new(
        row.try_get("pages_per_period").map_err(ser)?,
        row.try_get("verses_per_period").map_err(ser)?,
    )
    .map_err(ser)?;
    let target_total_pages = row
        .try_get::<Option<i64>, _>("target_total_pages")
        .map_err(ser)?
        .map(|raw| {
            u32::try_from(raw).map_err(|_| {
                StorageError::Serialization(format!("invalid target_total_pages: {raw}"))
            })
        })
        .transpose()?;

    Schedule::from_persisted(
        schedule_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        schedule_type,
        target_rate,
        row.try_get("start_date").map_err(ser)?,
        row.try_get("expected_completion_date").map_err(ser)?,
        target_total_pages,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_tracking_row(row: &SqliteRow) -> Result<TrackingRecord, StorageError> {
    let reading_type =
        parse_reading_type(row.try_get::<String, _>("reading_type").map_err(ser)?.as_str())?;
    let pages_memorized = row
        .try_get::<Option<i64>, _>("pages_memorized")
        .map_err(ser)?
        .map(|raw| {
            i32::try_from(raw)
                .map_err(|_| StorageError::Serialization(format!("invalid pages_memorized: {raw}")))
        })
        .transpose()?;

    Ok(TrackingRecord {
        id: tracking_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        schedule_id: row
            .try_get::<Option<i64>, _>("schedule_id")
            .map_err(ser)?
            .map(schedule_id_from_i64)
            .transpose()?,
        date: row.try_get("date").map_err(ser)?,
        range: range_from_row(row)?,
        reading_type,
        pages_memorized,
        notes: row.try_get("notes").map_err(ser)?,
    })
}

pub(crate) fn map_homework_row(row: &SqliteRow) -> Result<Homework, StorageError> {
    Ok(Homework {
        id: homework_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        range: range_from_row(row)?,
        assigned_on: row.try_get("assigned_on").map_err(ser)?,
        due_on: row.try_get("due_on").map_err(ser)?,
        notes: row.try_get("notes").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_columns_round_trip_through_as_str() {
        for t in [ScheduleType::Daily, ScheduleType::Weekly, ScheduleType::Monthly] {
            assert_eq!(parse_schedule_type(t.as_str()).unwrap(), t);
        }
        for t in [ReadingType::Memorize, ReadingType::Revise, ReadingType::Read] {
            assert_eq!(parse_reading_type(t.as_str()).unwrap(), t);
        }
        assert!(matches!(
            parse_reading_type("recite"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn ids_reject_negative_values() {
        assert!(schedule_id_from_i64(-1).is_err());
        assert_eq!(student_id_from_i64(7).unwrap(), StudentId::new(7));
        assert!(id_i64("schedule_id", u64::MAX).is_err());
    }
}

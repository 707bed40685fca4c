use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

/// Schema history, oldest first. Applied versions are never edited.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    statements: &[
        r"
        CREATE TABLE IF NOT EXISTS schedules (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            title TEXT,
            schedule_type TEXT NOT NULL
                CHECK (schedule_type IN ('daily', 'weekly', 'monthly')),
            pages_per_period REAL CHECK (pages_per_period IS NULL OR pages_per_period > 0),
            verses_per_period REAL CHECK (verses_per_period IS NULL OR verses_per_period > 0),
            start_date TEXT NOT NULL,
            expected_completion_date TEXT,
            target_total_pages INTEGER
                CHECK (target_total_pages IS NULL OR target_total_pages > 0),
            is_active INTEGER NOT NULL DEFAULT 0 CHECK (is_active IN (0, 1)),
            created_at TEXT NOT NULL,
            CHECK (pages_per_period IS NOT NULL OR verses_per_period IS NOT NULL)
        )
        ",
        // pages_memorized is unchecked; negative values are skipped during aggregation
        r"
        CREATE TABLE IF NOT EXISTS tracking_records (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            schedule_id INTEGER REFERENCES schedules(id) ON DELETE RESTRICT,
            date TEXT NOT NULL,
            surah_from INTEGER NOT NULL,
            verse_from INTEGER NOT NULL,
            surah_to INTEGER NOT NULL,
            verse_to INTEGER NOT NULL,
            page_from INTEGER,
            page_to INTEGER,
            reading_type TEXT NOT NULL
                CHECK (reading_type IN ('memorize', 'revise', 'read')),
            pages_memorized INTEGER,
            notes TEXT
        )
        ",
        r"
        CREATE TABLE IF NOT EXISTS homework (
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            surah_from INTEGER NOT NULL,
            verse_from INTEGER NOT NULL,
            surah_to INTEGER NOT NULL,
            verse_to INTEGER NOT NULL,
            page_from INTEGER,
            page_to INTEGER,
            assigned_on TEXT NOT NULL,
            due_on TEXT,
            notes TEXT
        )
        ",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_schedules_one_active \
         ON schedules(student_id) WHERE is_active = 1",
        "CREATE INDEX IF NOT EXISTS idx_schedules_student ON schedules(student_id, id)",
        "CREATE INDEX IF NOT EXISTS idx_tracking_student_date \
         ON tracking_records(student_id, date, id)",
        "CREATE INDEX IF NOT EXISTS idx_tracking_schedule ON tracking_records(schedule_id)",
        "CREATE INDEX IF NOT EXISTS idx_homework_student_assigned \
         ON homework(student_id, assigned_on)",
    ],
}];

/// Brings the schema up to the latest version.
///
/// Each version runs in its own transaction together with its
/// `schema_migrations` row, so a failed step leaves no partial schema behind.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)
             ON CONFLICT(version) DO NOTHING",
        )
        .bind(migration.version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(version = migration.version, "applied schema migration");
    }

    Ok(())
}

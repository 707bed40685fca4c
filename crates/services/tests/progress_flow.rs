use chrono::Duration;
use hifz_core::config::EngineConfig;
use hifz_core::model::{
    HomeworkDraft, ReadingType, ScheduleDraft, ScheduleType, Status, StudentId, TrackingDraft,
    VerseRange,
};
use hifz_core::time::{fixed_now, fixed_today};
use hifz_services::{AppServices, Clock, ScheduleServiceError};

fn schedule_draft(active: bool, days_ago: i64) -> ScheduleDraft {
    ScheduleDraft {
        student_id: StudentId::new(1),
        title: Some("Juz Amma".into()),
        schedule_type: ScheduleType::Daily,
        pages_per_period: Some(5.0),
        verses_per_period: None,
        start_date: fixed_today() - Duration::days(days_ago),
        expected_completion_date: Some(fixed_today() + Duration::days(30)),
        target_total_pages: Some(100),
        is_active: active,
    }
}

fn memorized(days_ago: i64, pages: i32, range: VerseRange) -> TrackingDraft {
    TrackingDraft {
        student_id: StudentId::new(1),
        schedule_id: None,
        date: fixed_today() - Duration::days(days_ago),
        range,
        reading_type: ReadingType::Memorize,
        pages_memorized: Some(pages),
        notes: None,
    }
}

#[tokio::test]
async fn full_flow_from_schedule_to_snapshot() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()), EngineConfig::default()).unwrap();

    let schedule = app
        .schedules()
        .create_schedule(schedule_draft(true, 10))
        .await
        .unwrap();

    let progress = app
        .progress()
        .progress_for_student(StudentId::new(1))
        .await
        .unwrap();
    assert_eq!(progress.schedule.id(), schedule.id());
    assert_eq!(progress.snapshot.cumulative_pages, 0);
    assert_eq!(progress.snapshot.status, Status::SignificantlyBehind);

    let tracking = app.tracking();
    tracking
        .record(memorized(8, 20, VerseRange::within(78, 1, 40)))
        .await
        .unwrap();
    tracking
        .record(memorized(4, 20, VerseRange::within(79, 1, 46)))
        .await
        .unwrap();
    let mut revision = memorized(2, 30, VerseRange::within(80, 1, 42));
    revision.reading_type = ReadingType::Revise;
    tracking.record(revision).await.unwrap();
    // a single verse is a valid tracking range
    tracking
        .record(memorized(1, 0, VerseRange::within(81, 1, 1)))
        .await
        .unwrap();

    let progress = app
        .progress()
        .progress_for_student(StudentId::new(1))
        .await
        .unwrap();
    let snap = &progress.snapshot;
    assert_eq!(snap.cumulative_pages, 40);
    assert_eq!(snap.cumulative_verses, 87);
    assert!((snap.expected_pages_to_date - 50.0).abs() < f64::EPSILON);
    assert_eq!(snap.percentage, Some(40));
    assert_eq!(snap.status, Status::Behind);

    let json = serde_json::to_value(&progress).unwrap();
    assert_eq!(json["snapshot"]["status"], "behind");
    assert_eq!(json["snapshot"]["measure"], "pages");

    app.homework()
        .assign(HomeworkDraft {
            student_id: StudentId::new(1),
            range: VerseRange::within(82, 1, 19),
            due_on: Some(fixed_today() + Duration::days(3)),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(
        app.homework()
            .list_for_student(StudentId::new(1))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn switching_schedules_changes_progress_target() {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()), EngineConfig::default()).unwrap();
    let schedules = app.schedules();

    let first = schedules
        .create_schedule(schedule_draft(true, 10))
        .await
        .unwrap();
    let second = schedules
        .create_schedule(schedule_draft(false, 2))
        .await
        .unwrap();
    app.tracking()
        .record(memorized(1, 12, VerseRange::within(2, 1, 20)))
        .await
        .unwrap();

    schedules
        .activate(StudentId::new(1), second.id())
        .await
        .unwrap();
    let progress = app
        .progress()
        .progress_for_student(StudentId::new(1))
        .await
        .unwrap();
    assert_eq!(progress.schedule.id(), second.id());
    assert_eq!(progress.snapshot.status, Status::OnTrack);

    let all = app
        .progress()
        .progress_for_all(StudentId::new(1))
        .await
        .unwrap();
    let first_status = all
        .iter()
        .find(|p| p.schedule.id() == first.id())
        .map(|p| p.snapshot.status);
    assert_eq!(first_status, Some(Status::Inactive));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activation_through_services() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("services.sqlite3").display()
    );
    let app = AppServices::new_sqlite(&url, Clock::fixed(fixed_now()), EngineConfig::default())
        .await
        .expect("sqlite services");
    let schedules = app.schedules();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let s = schedules
            .create_schedule(schedule_draft(false, 5))
            .await
            .unwrap();
        ids.push(s.id());
    }

    let mut handles = Vec::new();
    for round in 0..18 {
        let svc = app.schedules();
        let id = ids[round % ids.len()];
        handles.push(tokio::spawn(async move {
            svc.activate(StudentId::new(1), id).await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("activate");
    }

    let active: Vec<_> = schedules
        .list_for_student(StudentId::new(1))
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.is_active())
        .collect();
    assert_eq!(active.len(), 1);

    assert!(matches!(
        schedules.delete_schedule(ids[0], false).await,
        Err(ScheduleServiceError::ConfirmationRequired { .. })
    ));
}

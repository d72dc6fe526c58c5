use chrono::Duration;
use storage::repository::{
    StorageError, StudentRepository, VideoCatalogRepository, WatchHistoryRepository,
};
use storage::sqlite::SqliteRepository;
use vidlearn_core::model::{ProgressSample, Student, StudentId, Video, VideoId};
use vidlearn_core::time::fixed_now;

fn sample(student: u64, video: u64, watched: f64, total: f64) -> ProgressSample {
    ProgressSample::new(StudentId::new(student), VideoId::new(video), watched, total).unwrap()
}

fn build_video(id: u64, title: &str) -> Video {
    Video::new(
        VideoId::new(id),
        title,
        Some("course footage".into()),
        format!("https://videos.example.com/{id}"),
        Some(format!("https://videos.example.com/{id}.jpg")),
        600.0,
        fixed_now() - Duration::days(i64::try_from(id).unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_upsert_reports_outcome_and_preserves_first_watch() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let t0 = fixed_now();
    let t1 = t0 + Duration::minutes(30);

    // The referenced video is deliberately absent from the catalogue; the
    // upsert must not care.
    let first = repo
        .upsert_watch_record(&sample(1, 1, 300.0, 600.0).into_record(t0))
        .await
        .unwrap();
    assert!(first.created);

    let second = repo
        .upsert_watch_record(&sample(1, 1, 560.0, 600.0).into_record(t1))
        .await
        .unwrap();
    assert!(!second.created);

    let records = repo.records_for_student(StudentId::new(1)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].first_watched_at(), t0);
    assert_eq!(records[0].watched_at(), t1);
    assert!((records[0].progress_percent() - 93.333).abs() < 0.01);
    assert!(records[0].completed());
}

#[tokio::test]
async fn sqlite_resume_queries_filter_and_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_resume?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let now = fixed_now();
    repo.upsert_watch_record(&sample(1, 10, 600.0, 600.0).into_record(now))
        .await
        .unwrap();
    repo.upsert_watch_record(&sample(1, 20, 120.0, 600.0).into_record(now - Duration::hours(1)))
        .await
        .unwrap();
    repo.upsert_watch_record(&sample(1, 30, 60.0, 600.0).into_record(now - Duration::hours(2)))
        .await
        .unwrap();

    let incomplete = repo
        .most_recent_incomplete(StudentId::new(1))
        .await
        .unwrap()
        .expect("incomplete record");
    assert_eq!(incomplete.video_id(), VideoId::new(20));

    let latest = repo
        .most_recent(StudentId::new(1))
        .await
        .unwrap()
        .expect("latest record");
    assert_eq!(latest.video_id(), VideoId::new(10));

    // Equal watched_at resolves to the lowest video id.
    repo.upsert_watch_record(&sample(2, 7, 60.0, 600.0).into_record(now))
        .await
        .unwrap();
    repo.upsert_watch_record(&sample(2, 3, 60.0, 600.0).into_record(now))
        .await
        .unwrap();
    let tied = repo
        .most_recent_incomplete(StudentId::new(2))
        .await
        .unwrap()
        .expect("tied record");
    assert_eq!(tied.video_id(), VideoId::new(3));

    // A record exactly at the threshold is not resumable.
    repo.upsert_watch_record(&sample(3, 5, 540.0, 600.0).into_record(now))
        .await
        .unwrap();
    assert!(
        repo.most_recent_incomplete(StudentId::new(3))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_view_counts_and_duration_backfill() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_videos?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.insert_video(&build_video(1, "Rust Ownership"))
        .await
        .unwrap();

    repo.increment_view_count(VideoId::new(1)).await.unwrap();
    repo.increment_view_count(VideoId::new(1)).await.unwrap();
    // Unknown id is a silent no-op.
    repo.increment_view_count(VideoId::new(99)).await.unwrap();

    let stored = repo.get_video(VideoId::new(1)).await.unwrap().unwrap();
    assert_eq!(stored.views(), 2);

    repo.set_duration(VideoId::new(1), 725.0).await.unwrap();
    let stored = repo.get_video(VideoId::new(1)).await.unwrap().unwrap();
    assert!((stored.duration_seconds() - 725.0).abs() < f64::EPSILON);

    assert!(matches!(
        repo.set_duration(VideoId::new(99), 725.0).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_student_conflicts_and_lookup() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_students?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let ada = Student::new(StudentId::new(1), "Ada", "ada@example.com", fixed_now()).unwrap();
    repo.insert_student(&ada).await.unwrap();

    let same_email =
        Student::new(StudentId::new(2), "Imposter", "ada@example.com", fixed_now()).unwrap();
    assert!(matches!(
        repo.insert_student(&same_email).await,
        Err(StorageError::Conflict)
    ));

    let same_id = Student::new(StudentId::new(1), "Twin", "twin@example.com", fixed_now()).unwrap();
    assert!(matches!(
        repo.insert_student(&same_id).await,
        Err(StorageError::Conflict)
    ));

    let found = repo
        .find_by_email("ada@example.com")
        .await
        .unwrap()
        .expect("student by email");
    assert_eq!(found.id(), StudentId::new(1));
    assert_eq!(found.name(), "Ada");

    assert!(repo.get_student(StudentId::new(42)).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_catalogue_queries_keep_order() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_catalogue?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for id in [3, 1, 2] {
        repo.insert_video(&build_video(id, "Rust Intro")).await.unwrap();
    }

    assert!(repo.videos_by_ids(&[]).await.unwrap().is_empty());

    let got = repo
        .videos_by_ids(&[VideoId::new(2), VideoId::new(9), VideoId::new(1)])
        .await
        .unwrap();
    let ids: Vec<u64> = got.iter().map(|v| v.id().value()).collect();
    assert_eq!(ids, [1, 2]);

    // uploaded_at goes back one day per id, so newest-first is ascending ids.
    let listed = repo.list_videos(2).await.unwrap();
    let ids: Vec<u64> = listed.iter().map(|v| v.id().value()).collect();
    assert_eq!(ids, [1, 2]);
}

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use studybud::database::{JsonFileStore, StudentStore};
use studybud::gamification::{record_session_for, GamificationEngine, SessionRequest};
use studybud::model::{PlanStatus, Priority, StudentProfile};
use studybud::planner;
use studybud::schedule::{RngSource, ScheduleGenerator};
use studybud::StudyError;

fn register(store: &dyn StudentStore, id: &str) {
    let subjects = vec!["math".to_string(), "physics".to_string()];
    let profile = StudentProfile::new(id, "Test Student", 9, &subjects).unwrap();
    assert!(store.create(&profile).unwrap());
}

#[test]
fn practice_sessions_persist_across_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let engine = GamificationEngine::new();
    {
        let store = JsonFileStore::open(dir.path()).unwrap();
        register(&store, "kim");
        for correct in [8, 6] {
            let request = SessionRequest {
                subject: "math".to_string(),
                topic: "Fractions".to_string(),
                questions_asked: 10,
                correct_answers: correct,
            };
            record_session_for(&store, &engine, "kim", &request).unwrap();
        }
    }

    let store = JsonFileStore::open(dir.path()).unwrap();
    let profile = store.require("kim").unwrap();
    assert_eq!(profile.progress["math"]["Fractions"], vec![80.0, 60.0]);
    assert_eq!(profile.subjects["math"].overall_score, 70.0);
    assert_eq!(profile.session_history.len(), 2);
}

#[test]
fn unknown_student_means_register_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let request = SessionRequest {
        subject: "math".to_string(),
        topic: "Fractions".to_string(),
        questions_asked: 1,
        correct_answers: 1,
    };
    let err = record_session_for(&store, &GamificationEngine::new(), "nobody", &request).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn generated_schedule_round_trips_through_plan_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    register(&store, "ola");

    let mut profile = store.require("ola").unwrap();
    profile.study_preferences.weekly_hours = 14;
    profile.subject_priorities = [("math".to_string(), Priority::High), ("physics".to_string(), Priority::Low)]
        .into_iter()
        .collect();
    store.save(&profile).unwrap();

    let generator = ScheduleGenerator::new(vec![]);
    let schedule = generator.generate(&profile, &mut RngSource::seeded(11));
    let daily_schedules = planner::schedule_to_plan(&schedule, 14);
    let plan = json!({ "daily_schedules": daily_schedules });

    assert_eq!(planner::save_study_plan_for(&store, "ola", &plan, "finish unit 1").unwrap(), 1);
    assert_eq!(planner::save_study_plan_for(&store, "ola", &plan, "finish unit 2").unwrap(), 2);
    for task in ["1", "2", "3", "4", "5", "6", "7"] {
        assert!(planner::mark_task_completed_for(&store, "ola", task).unwrap());
    }
    assert!(!planner::mark_task_completed_for(&store, "ola", "1").unwrap());

    let profile = store.require("ola").unwrap();
    assert_eq!(profile.study_plans[0].status, PlanStatus::Inactive);
    assert_eq!(profile.active_plan().unwrap().id, 2);

    let progress = planner::study_progress(&profile).unwrap();
    assert_eq!(progress.plan_id, 2);
    assert_eq!(progress.total_tasks, 14);
    assert_eq!(progress.completed_tasks, 7);
    assert_eq!(progress.completion_rate, 50.0);
}

#[test]
fn malformed_plan_leaves_stored_record_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    register(&store, "rae");

    let good = json!({ "daily_schedules": planner::fallback_plan(1, &["math".to_string()]) });
    planner::save_study_plan_for(&store, "rae", &good, "basics").unwrap();
    let before = store.require("rae").unwrap();

    let err = planner::save_study_plan_for(&store, "rae", &json!({"sessions": []}), "oops").unwrap_err();
    assert!(matches!(err, StudyError::MalformedPlan(_)));
    assert_eq!(store.require("rae").unwrap(), before);
}

#[test]
fn older_records_without_new_sections_still_load() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = json!({
        "student_id": "old",
        "name": "Legacy",
        "grade": 7,
        "created_at": "2024-03-01T12:00:00.123456",
        "subjects": {"math": {
            "topics": {"Algebra": {"questions_answered": 10, "correct_answers": 10, "sessions": 1, "average_score": 100.0}},
            "overall_score": 100.0,
            "questions_answered": 10
        }},
        "session_history": [{
            "date": "2024-03-01T12:05:30.5",
            "subject": "math",
            "topic": "Algebra",
            "questions_asked": 10,
            "correct_answers": 10,
            "score": 100.0
        }],
        "badges": [],
        "preferences": {"language": "en", "difficulty_level": "medium"},
        "login_tracking": {"last_login": "2024-03-01T12:00:00", "login_streak": 2}
    });
    std::fs::write(dir.path().join("old.json"), legacy.to_string()).unwrap();

    let store = JsonFileStore::open(dir.path()).unwrap();
    let profile = store.require("old").unwrap();
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::microseconds(123_456);
    assert_eq!(profile.created_at, Some(created));
    assert_eq!(profile.login_tracking.login_streak, 2);
    assert_eq!(profile.login_tracking.last_login, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
    assert_eq!(profile.session_history[0].date.date_naive().to_string(), "2024-03-01");
    assert!(profile.study_plans.is_empty());
    assert!(profile.completed_tasks.is_empty());

    let request = SessionRequest {
        subject: "math".to_string(),
        topic: "Fractions".to_string(),
        questions_asked: 10,
        correct_answers: 0,
    };
    let (profile, outcome) = record_session_for(&store, &GamificationEngine::new(), "old", &request).unwrap();
    assert_eq!(outcome.subject_score, 50.0);
    assert_eq!(profile.session_history.len(), 2);
}

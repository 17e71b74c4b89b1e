//! HTTP surface over the study engine.

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::analytics::PerformanceAnalyzer;
use crate::config::AppConfig;
use crate::curriculum;
use crate::database::StudentStore;
use crate::error::{Result, StudyError};
use crate::gamification::{self, GamificationEngine, SessionOutcome, SessionRequest};
use crate::model::{Difficulty, Preferences, Priority, StudentProfile, StudyPreferences};
use crate::planner::{self, PlanSummary, StudyProgress};
use crate::schedule::{RandomSource, RngSource, ScheduleGenerator, WeeklySchedule};
use crate::scoring::{self, PracticeResult, Question, QuestionKind};
use crate::tutor::TutorService;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn StudentStore>,
    pub engine: GamificationEngine,
    pub generator: ScheduleGenerator,
    pub tutor: TutorService,
    pub analyzer: PerformanceAnalyzer,
    rng: Mutex<Box<dyn RandomSource + Send>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn StudentStore>, tutor: TutorService) -> Self {
        let rng: Box<dyn RandomSource + Send> = match config.schedule_seed {
            Some(seed) => Box::new(RngSource::seeded(seed)),
            None => Box::new(RngSource::from_entropy()),
        };
        Self {
            generator: ScheduleGenerator::new(config.allowed_subjects.clone()),
            config,
            store,
            engine: GamificationEngine::new(),
            tutor,
            analyzer: PerformanceAnalyzer::new(),
            rng: Mutex::new(rng),
        }
    }

    fn generate_schedule(&self, profile: &StudentProfile) -> WeeklySchedule {
        // a poisoned lock still holds a usable generator
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.generator.generate(profile, &mut **rng)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for StudyError {
    fn status_code(&self) -> StatusCode {
        match self {
            StudyError::StudentNotFound(_) | StudyError::NoActivePlan(_) => StatusCode::NOT_FOUND,
            StudyError::StudentExists(_) => StatusCode::CONFLICT,
            StudyError::InvalidProfile(_) | StudyError::InvalidSession(_) => StatusCode::BAD_REQUEST,
            StudyError::MalformedPlan(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody { error: self.to_string() })
    }
}

type ApiResult = std::result::Result<HttpResponse, StudyError>;

#[derive(Deserialize)]
struct RegisterRequest {
    student_id: String,
    name: String,
    grade: u8,
}

#[derive(Serialize)]
struct LoginResponse {
    student_id: String,
    login_streak: u32,
    last_login: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize)]
struct PreferencesUpdate {
    preferences: Option<Preferences>,
    study_preferences: Option<StudyPreferences>,
    subject_priorities: Option<BTreeMap<String, Priority>>,
}

#[derive(Serialize)]
struct SessionResponse {
    outcome: SessionOutcome,
    badges: Vec<String>,
}

#[derive(Serialize)]
struct RecommendationResponse {
    subject: String,
    topics: Vec<String>,
}

#[derive(Deserialize, Default)]
struct ScheduleRequest {
    #[serde(default)]
    save: bool,
    #[serde(default)]
    goals: String,
}

#[derive(Serialize)]
struct ScheduleResponse {
    schedule: WeeklySchedule,
    plan_id: Option<u32>,
}

#[derive(Deserialize)]
struct SavePlanRequest {
    #[serde(default)]
    goals: String,
    plan: serde_json::Value,
}

#[derive(Serialize)]
struct SavePlanResponse {
    plan_id: u32,
}

#[derive(Serialize)]
struct ActivePlanResponse {
    plan: crate::model::StudyPlan,
    summary: PlanSummary,
}

#[derive(Serialize)]
struct TaskResponse {
    task_id: String,
    newly_completed: bool,
}

#[derive(Deserialize)]
struct PracticeSubmission {
    subject: String,
    topic: String,
    kind: QuestionKind,
    questions: Vec<Question>,
    #[serde(default)]
    answers: Vec<Option<String>>,
}

#[derive(Serialize)]
struct PracticeResponse {
    result: PracticeResult,
    evaluations: Vec<String>,
    encouragement: String,
    outcome: SessionOutcome,
}

#[derive(Deserialize)]
struct QuestionQuery {
    topic: Option<String>,
    kind: Option<QuestionKind>,
    count: Option<usize>,
    difficulty: Option<Difficulty>,
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy", "service": "studybud"}))
}

async fn create_student(state: web::Data<AppState>, body: web::Json<RegisterRequest>) -> ApiResult {
    let mut profile = StudentProfile::new(&body.student_id, &body.name, body.grade, &state.config.allowed_subjects)?;
    profile.preferences.language = state.config.default_language.clone();
    profile.preferences.difficulty_level = state.config.default_difficulty;

    if !state.store.create(&profile)? {
        return Err(StudyError::StudentExists(body.student_id.clone()));
    }
    info!(student = %profile.id, "student registered");
    Ok(HttpResponse::Created().json(profile))
}

async fn get_student(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let profile = state.store.require(&path)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn login(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let mut profile = state.store.require(&path)?;
    let login_streak = state.engine.record_login(&mut profile, chrono::Utc::now());
    state.store.save(&profile)?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        student_id: profile.id,
        login_streak,
        last_login: profile.login_tracking.last_login,
    }))
}

async fn update_preferences(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PreferencesUpdate>,
) -> ApiResult {
    let mut profile = state.store.require(&path)?;
    let update = body.into_inner();
    if let Some(preferences) = update.preferences {
        profile.preferences = preferences;
    }
    if let Some(study_preferences) = update.study_preferences {
        profile.study_preferences = study_preferences.validated()?;
    }
    if let Some(priorities) = update.subject_priorities {
        profile.subject_priorities = priorities;
    }
    state.store.save(&profile)?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn record_session(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<SessionRequest>,
) -> ApiResult {
    let (profile, outcome) = gamification::record_session_for(state.store.as_ref(), &state.engine, &path, &body)?;
    Ok(HttpResponse::Ok().json(SessionResponse { outcome, badges: profile.badges.into_iter().collect() }))
}

async fn recommendations(state: web::Data<AppState>, path: web::Path<(String, String)>) -> ApiResult {
    let (student_id, subject) = path.into_inner();
    let profile = state.store.require(&student_id)?;
    let topics = state.engine.recommended_topics(&profile, &subject);
    Ok(HttpResponse::Ok().json(RecommendationResponse { subject, topics }))
}

async fn generate_schedule(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: Option<web::Json<ScheduleRequest>>,
) -> ApiResult {
    let request = body.map(|b| b.into_inner()).unwrap_or_default();
    let profile = state.store.require(&path)?;
    let schedule = state.generate_schedule(&profile);

    let plan_id = if request.save {
        let daily_schedules = planner::schedule_to_plan(&schedule, profile.study_preferences.weekly_hours);
        let plan = serde_json::json!({ "daily_schedules": daily_schedules });
        Some(planner::save_study_plan_for(state.store.as_ref(), &path, &plan, &request.goals)?)
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(ScheduleResponse { schedule, plan_id }))
}

async fn save_plan(state: web::Data<AppState>, path: web::Path<String>, body: web::Json<SavePlanRequest>) -> ApiResult {
    let plan_id = planner::save_study_plan_for(state.store.as_ref(), &path, &body.plan, &body.goals)?;
    Ok(HttpResponse::Created().json(SavePlanResponse { plan_id }))
}

async fn active_plan(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let profile = state.store.require(&path)?;
    let plan = profile
        .active_plan()
        .cloned()
        .ok_or_else(|| StudyError::NoActivePlan(profile.id.clone()))?;
    let summary = planner::plan_summary(&plan.daily_schedules);
    Ok(HttpResponse::Ok().json(ActivePlanResponse { plan, summary }))
}

async fn study_progress(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let profile = state.store.require(&path)?;
    let progress: StudyProgress =
        planner::study_progress(&profile).ok_or_else(|| StudyError::NoActivePlan(profile.id.clone()))?;
    Ok(HttpResponse::Ok().json(progress))
}

async fn complete_task(state: web::Data<AppState>, path: web::Path<(String, String)>) -> ApiResult {
    let (student_id, task_id) = path.into_inner();
    let newly_completed = planner::mark_task_completed_for(state.store.as_ref(), &student_id, &task_id)?;
    Ok(HttpResponse::Ok().json(TaskResponse { task_id, newly_completed }))
}

async fn submit_practice(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<PracticeSubmission>,
) -> ApiResult {
    let submission = body.into_inner();
    let mut profile = state.store.require(&path)?;

    let (result, evaluations) = match submission.kind {
        QuestionKind::MultipleChoice => {
            (scoring::score_multiple_choice(&submission.questions, &submission.answers), Vec::new())
        }
        QuestionKind::OpenEnded => {
            let evaluations: Vec<String> = submission
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| {
                    let answer = submission.answers.get(i).cloned().flatten().unwrap_or_default();
                    state.tutor.evaluate_answer(&q.question, &answer, &submission.subject, profile.grade)
                })
                .collect();
            (scoring::score_open_ended(&evaluations), evaluations)
        }
    };

    let (questions_asked, correct_answers) = result.session_counts();
    let request = SessionRequest {
        subject: submission.subject,
        topic: submission.topic,
        questions_asked,
        correct_answers,
    };
    let outcome = state.engine.record_session(&mut profile, &request, chrono::Utc::now())?;
    state.store.save(&profile)?;

    Ok(HttpResponse::Ok().json(PracticeResponse {
        encouragement: result.encouragement().to_string(),
        result,
        evaluations,
        outcome,
    }))
}

async fn practice_questions(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<QuestionQuery>,
) -> HttpResponse {
    let subject = path.into_inner();
    let query = query.into_inner();
    let count = query.count.unwrap_or(5).clamp(1, state.config.max_practice_questions);
    let topic = query.topic.unwrap_or_else(|| {
        curriculum::starter_topics(&subject)
            .into_iter()
            .next()
            .unwrap_or_else(|| curriculum::REVIEW_TOPIC.to_string())
    });
    let questions = state.tutor.practice_questions(
        &subject,
        &topic,
        query.difficulty.unwrap_or(state.config.default_difficulty),
        query.kind.unwrap_or(QuestionKind::MultipleChoice),
        count,
    );
    HttpResponse::Ok().json(questions)
}

async fn performance_report(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let profile = state.store.require(&path)?;
    match state.analyzer.generate_report(&profile) {
        Some(report) => Ok(HttpResponse::Ok().json(report)),
        None => Ok(HttpResponse::Ok().json(serde_json::json!({
            "student_id": profile.id,
            "summary": "Not enough data to generate a report."
        }))),
    }
}

async fn sessions_csv(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let profile = state.store.require(&path)?;
    let csv = state.analyzer.export_sessions_csv(&profile)?;
    Ok(HttpResponse::Ok().content_type("text/csv").body(csv))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/students", web::post().to(create_student))
        .route("/students/{id}", web::get().to(get_student))
        .route("/students/{id}/login", web::post().to(login))
        .route("/students/{id}/preferences", web::put().to(update_preferences))
        .route("/students/{id}/sessions", web::post().to(record_session))
        .route("/students/{id}/recommendations/{subject}", web::get().to(recommendations))
        .route("/students/{id}/schedule", web::post().to(generate_schedule))
        .route("/students/{id}/plans", web::post().to(save_plan))
        .route("/students/{id}/plans/active", web::get().to(active_plan))
        .route("/students/{id}/progress", web::get().to(study_progress))
        .route("/students/{id}/tasks/{task_id}", web::post().to(complete_task))
        .route("/students/{id}/practice", web::post().to(submit_practice))
        .route("/students/{id}/report", web::get().to(performance_report))
        .route("/students/{id}/report.csv", web::get().to(sessions_csv))
        .route("/practice/questions/{subject}", web::get().to(practice_questions));
}

/// Builds shared state from config, opening the JSON file store.
pub fn build_state(config: AppConfig, tutor: TutorService) -> Result<AppState> {
    let store = crate::database::JsonFileStore::open(&config.data_dir)?;
    Ok(AppState::new(config, Arc::new(store), tutor))
}

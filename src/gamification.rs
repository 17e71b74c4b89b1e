use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::curriculum;
use crate::database::StudentStore;
use crate::error::{Result, StudyError};
use crate::model::{mean, SessionRecord, StudentProfile};

pub const MAX_RECOMMENDATIONS: usize = 3;
pub const WEAK_TOPIC_THRESHOLD: f64 = 70.0;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionRequest {
    pub subject: String,
    pub topic: String,
    pub questions_asked: u32,
    pub correct_answers: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionOutcome {
    pub score: f64,
    pub topic_mastery: f64,
    pub subject_score: f64,
    pub new_badges: Vec<String>,
}

#[derive(Clone)]
struct BadgeTemplate {
    name: String,
    condition: BadgeCondition,
}

#[derive(Clone)]
enum BadgeCondition {
    /// Awarded per subject as "<Subject> Explorer".
    SubjectExplorer { min_topics: usize, min_questions: u32, min_score: f64 },
    SessionCount(usize),
    AllSubjectsActive(u32),
}

/// Mastery aggregation, badge awarding and login streaks.
pub struct GamificationEngine {
    badges: Vec<BadgeTemplate>,
}

impl Default for GamificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GamificationEngine {
    pub fn new() -> Self {
        let badges = vec![
            BadgeTemplate {
                name: "Explorer".to_string(),
                condition: BadgeCondition::SubjectExplorer {
                    min_topics: 3,
                    min_questions: 10,
                    min_score: 90.0,
                },
            },
            BadgeTemplate {
                name: "Consistent Learner".to_string(),
                condition: BadgeCondition::SessionCount(10),
            },
            BadgeTemplate {
                name: "All-Rounder".to_string(),
                condition: BadgeCondition::AllSubjectsActive(20),
            },
        ];

        Self { badges }
    }

    pub fn calculate_score(&self, questions_asked: u32, correct_answers: u32) -> f64 {
        if questions_asked == 0 {
            return 0.0;
        }
        correct_answers as f64 * 100.0 / questions_asked as f64
    }

    /// Records one practice session against a topic and re-evaluates badges.
    pub fn record_session(
        &self,
        profile: &mut StudentProfile,
        request: &SessionRequest,
        now: DateTime<Utc>,
    ) -> Result<SessionOutcome> {
        if request.correct_answers > request.questions_asked {
            return Err(StudyError::InvalidSession(format!(
                "{} correct answers out of {} questions",
                request.correct_answers, request.questions_asked
            )));
        }
        if request.subject.trim().is_empty() || request.topic.trim().is_empty() {
            return Err(StudyError::InvalidSession("subject and topic are required".to_string()));
        }

        let score = self.calculate_score(request.questions_asked, request.correct_answers);

        profile.seed_progress_from_stats();
        let history = profile
            .progress
            .entry(request.subject.clone())
            .or_default()
            .entry(request.topic.clone())
            .or_default();
        history.push(score);
        let topic_mastery = mean(history).unwrap_or(0.0);

        let subject_stats = profile.subjects.entry(request.subject.clone()).or_default();
        subject_stats.questions_answered += request.questions_asked;

        let topic_stats = subject_stats.topics.entry(request.topic.clone()).or_default();
        topic_stats.questions_answered += request.questions_asked;
        topic_stats.correct_answers += request.correct_answers;
        topic_stats.sessions += 1;
        topic_stats.average_score = topic_mastery;

        let subject_score = subject_overall_score(profile, &request.subject);
        if let Some(stats) = profile.subjects.get_mut(&request.subject) {
            stats.overall_score = subject_score;
        }

        profile.session_history.push(SessionRecord {
            date: now,
            subject: request.subject.clone(),
            topic: request.topic.clone(),
            questions_asked: request.questions_asked,
            correct_answers: request.correct_answers,
            score,
        });

        let new_badges = self.award_badges(profile);

        debug!(
            student = %profile.id,
            subject = %request.subject,
            topic = %request.topic,
            score,
            "session recorded"
        );

        Ok(SessionOutcome { score, topic_mastery, subject_score, new_badges })
    }

    /// Badges the profile now qualifies for but does not yet hold.
    pub fn check_badges(&self, profile: &StudentProfile) -> Vec<String> {
        let mut earned = Vec::new();

        for template in &self.badges {
            match &template.condition {
                BadgeCondition::SubjectExplorer { min_topics, min_questions, min_score } => {
                    for (subject, stats) in &profile.subjects {
                        let mastered = stats
                            .topics
                            .values()
                            .filter(|t| t.questions_answered >= *min_questions && t.average_score >= *min_score)
                            .count();
                        if mastered >= *min_topics {
                            earned.push(format!("{} {}", curriculum::capitalize(subject), template.name));
                        }
                    }
                }
                BadgeCondition::SessionCount(target) => {
                    if profile.session_history.len() >= *target {
                        earned.push(template.name.clone());
                    }
                }
                BadgeCondition::AllSubjectsActive(min_questions) => {
                    let all_active = !profile.subjects.is_empty()
                        && profile.subjects.values().all(|s| s.questions_answered >= *min_questions);
                    if all_active {
                        earned.push(template.name.clone());
                    }
                }
            }
        }

        earned.retain(|name| !profile.badges.contains(name));
        earned
    }

    /// Adds newly earned badges. Existing badges are never removed.
    pub fn award_badges(&self, profile: &mut StudentProfile) -> Vec<String> {
        let new_badges = self.check_badges(profile);
        for badge in &new_badges {
            info!(student = %profile.id, badge = %badge, "badge awarded");
            profile.badges.insert(badge.clone());
        }
        new_badges
    }

    pub fn update_streak(&self, profile: &StudentProfile, now: DateTime<Utc>) -> u32 {
        let tracking = &profile.login_tracking;
        let Some(last_login) = tracking.last_login else {
            return 1;
        };

        let days = (now.date_naive() - last_login.date_naive()).num_days();
        match days {
            1 => tracking.login_streak + 1,
            d if d > 1 => 1,
            // same day, or a clock that moved backwards
            _ => tracking.login_streak,
        }
    }

    pub fn record_login(&self, profile: &mut StudentProfile, now: DateTime<Utc>) -> u32 {
        let streak = self.update_streak(profile, now);
        profile.login_tracking.login_streak = streak;
        profile.login_tracking.last_login = Some(now);
        streak
    }

    /// Up to three weakest practiced topics, or starter topics for an
    /// untouched subject.
    pub fn recommended_topics(&self, profile: &StudentProfile, subject: &str) -> Vec<String> {
        let topics = match profile.subjects.get(subject) {
            Some(stats) if !stats.topics.is_empty() => &stats.topics,
            _ => {
                return curriculum::starter_topics(subject)
                    .into_iter()
                    .take(MAX_RECOMMENDATIONS)
                    .collect()
            }
        };

        let mut weak: Vec<(&String, f64)> = topics
            .iter()
            .filter(|(_, t)| t.questions_answered > 0 && t.average_score < WEAK_TOPIC_THRESHOLD)
            .map(|(name, t)| (name, t.average_score))
            .collect();

        // sort_by is stable, ties keep map order
        weak.sort_by(|a, b| a.1.total_cmp(&b.1));

        weak.into_iter()
            .take(MAX_RECOMMENDATIONS)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Unweighted mean of per-topic mastery, over topics with recorded scores.
pub fn subject_overall_score(profile: &StudentProfile, subject: &str) -> f64 {
    let Some(topics) = profile.progress.get(subject) else {
        return 0.0;
    };
    let masteries: Vec<f64> = topics.values().filter_map(|scores| mean(scores)).collect();
    mean(&masteries).unwrap_or(0.0)
}

/// Loads, updates and persists a student in one read-modify-write.
pub fn record_session_for(
    store: &dyn StudentStore,
    engine: &GamificationEngine,
    student_id: &str,
    request: &SessionRequest,
) -> Result<(StudentProfile, SessionOutcome)> {
    let mut profile = store.require(student_id)?;
    let outcome = engine.record_session(&mut profile, request, Utc::now())?;
    store.save(&profile)?;
    Ok((profile, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::model::TopicStats;

    fn profile() -> StudentProfile {
        let subjects = vec!["math".to_string(), "physics".to_string()];
        StudentProfile::new("s1", "Ada", 10, &subjects).unwrap()
    }

    fn request(subject: &str, topic: &str, asked: u32, correct: u32) -> SessionRequest {
        SessionRequest {
            subject: subject.to_string(),
            topic: topic.to_string(),
            questions_asked: asked,
            correct_answers: correct,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn zero_questions_scores_zero() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        let outcome = engine.record_session(&mut p, &request("math", "Fractions", 0, 0), at(1, 9)).unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(p.progress["math"]["Fractions"], vec![0.0]);
    }

    #[test]
    fn more_correct_than_asked_is_rejected() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        let err = engine.record_session(&mut p, &request("math", "Fractions", 2, 3), at(1, 9));
        assert!(matches!(err, Err(StudyError::InvalidSession(_))));
        assert!(p.session_history.is_empty());
    }

    #[test]
    fn subject_score_is_mean_of_topic_means() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        // Fractions: 100, 50 -> 75; Decimals: 30 -> 30; overall (75 + 30) / 2
        engine.record_session(&mut p, &request("math", "Fractions", 10, 10), at(1, 9)).unwrap();
        engine.record_session(&mut p, &request("math", "Fractions", 10, 5), at(1, 10)).unwrap();
        let outcome = engine.record_session(&mut p, &request("math", "Decimals", 10, 3), at(1, 11)).unwrap();

        assert!((outcome.subject_score - 52.5).abs() < 1e-9);
        assert!((p.subjects["math"].overall_score - 52.5).abs() < 1e-9);
        assert!((p.subjects["math"].topics["Fractions"].average_score - 75.0).abs() < 1e-9);
        assert_eq!(p.subjects["math"].questions_answered, 30);
        assert_eq!(p.session_history.len(), 3);
    }

    #[test]
    fn unknown_subject_is_created_on_demand() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        engine.record_session(&mut p, &request("ai", "Deep Learning", 4, 2), at(1, 9)).unwrap();
        assert_eq!(p.subjects["ai"].overall_score, 50.0);
    }

    #[test]
    fn explorer_badge_needs_three_mastered_topics() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        for topic in ["Fractions", "Decimals"] {
            engine.record_session(&mut p, &request("math", topic, 10, 10), at(1, 9)).unwrap();
        }
        assert!(!p.badges.contains("Math Explorer"));

        let outcome = engine.record_session(&mut p, &request("math", "Geometry Basics", 10, 9), at(1, 9)).unwrap();
        assert_eq!(outcome.new_badges, vec!["Math Explorer".to_string()]);
    }

    #[test]
    fn consistent_learner_after_ten_sessions() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        for i in 0..9 {
            engine.record_session(&mut p, &request("physics", "Motion", 1, (i % 2) as u32), at(1, 9)).unwrap();
        }
        assert!(!p.badges.contains("Consistent Learner"));
        engine.record_session(&mut p, &request("physics", "Motion", 1, 0), at(1, 9)).unwrap();
        assert!(p.badges.contains("Consistent Learner"));
    }

    #[test]
    fn all_rounder_requires_every_subject() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        engine.record_session(&mut p, &request("math", "Fractions", 20, 10), at(1, 9)).unwrap();
        assert!(!p.badges.contains("All-Rounder"));
        engine.record_session(&mut p, &request("physics", "Forces", 20, 10), at(1, 9)).unwrap();
        assert!(p.badges.contains("All-Rounder"));
    }

    #[test]
    fn badges_never_shrink() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        for topic in ["Fractions", "Decimals", "Geometry Basics"] {
            engine.record_session(&mut p, &request("math", topic, 10, 10), at(1, 9)).unwrap();
        }
        let before = p.badges.clone();
        // drag every mastery well below the threshold
        for topic in ["Fractions", "Decimals", "Geometry Basics"] {
            for _ in 0..5 {
                engine.record_session(&mut p, &request("math", topic, 10, 0), at(1, 9)).unwrap();
                assert!(p.badges.is_superset(&before));
            }
        }
        assert!(p.badges.contains("Math Explorer"));
    }

    #[test]
    fn login_streak_rules() {
        let engine = GamificationEngine::new();
        let mut p = profile();

        assert_eq!(engine.record_login(&mut p, at(1, 8)), 1);
        assert_eq!(engine.record_login(&mut p, at(1, 20)), 1);
        assert_eq!(engine.record_login(&mut p, at(2, 7)), 2);
        assert_eq!(engine.record_login(&mut p, at(3, 23)), 3);
        assert_eq!(engine.record_login(&mut p, at(3, 23) + Duration::days(3)), 1);
        assert_eq!(p.login_tracking.last_login, Some(at(6, 23)));
    }

    #[test]
    fn recommendations_start_with_starter_topics() {
        let engine = GamificationEngine::new();
        let p = profile();
        assert_eq!(engine.recommended_topics(&p, "math"), vec!["Basic Algebra", "Fractions", "Decimals"]);
    }

    #[test]
    fn unknown_subject_recommends_review() {
        let engine = GamificationEngine::new();
        assert_eq!(engine.recommended_topics(&profile(), "astronomy"), vec!["Review Basics"]);
    }

    #[test]
    fn stored_averages_without_history_count_toward_subject_score() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        let algebra = TopicStats { questions_answered: 10, correct_answers: 10, sessions: 1, average_score: 100.0 };
        p.subjects.get_mut("math").unwrap().topics.insert("Algebra".to_string(), algebra);

        let outcome = engine.record_session(&mut p, &request("math", "Fractions", 10, 0), at(1, 9)).unwrap();
        assert_eq!(outcome.subject_score, 50.0);
        assert_eq!(p.progress["math"]["Algebra"], vec![100.0]);

        let outcome = engine.record_session(&mut p, &request("math", "Algebra", 10, 5), at(1, 10)).unwrap();
        assert_eq!(outcome.topic_mastery, 75.0);
    }

    #[test]
    fn recommendations_are_weakest_three() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        let sessions = [("Motion", 6), ("Forces", 2), ("Energy", 9), ("Newton's Laws", 4), ("Optics", 5)];
        for (topic, correct) in sessions {
            engine.record_session(&mut p, &request("physics", topic, 10, correct), at(1, 9)).unwrap();
        }

        let recommended = engine.recommended_topics(&p, "physics");
        assert_eq!(recommended, vec!["Forces", "Newton's Laws", "Optics"]);
    }

    #[test]
    fn strong_subject_has_no_recommendations() {
        let engine = GamificationEngine::new();
        let mut p = profile();
        engine.record_session(&mut p, &request("math", "Fractions", 10, 9), at(1, 9)).unwrap();
        assert!(engine.recommended_topics(&p, "math").is_empty());
    }
}

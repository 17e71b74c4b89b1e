//! Persisted student record schema.
//!
//! Field names are the JSON interchange format shared with existing stored
//! data, so renames here must keep the serialized names stable. Every
//! optional section defaults when absent from older records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, StudyError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Unnormalized sampling weight used by the schedule generator.
    pub fn weight(self) -> f64 {
        match self {
            Priority::High => 0.6,
            Priority::Medium => 0.3,
            Priority::Low => 0.1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Practical,
}

impl LearningStyle {
    pub fn label(self) -> &'static str {
        match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Practical => "practical",
        }
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub language: String,
    pub difficulty_level: Difficulty,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { language: "en".to_string(), difficulty_level: Difficulty::Medium }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LearningStyles {
    pub visual: bool,
    pub auditory: bool,
    pub practical: bool,
}

impl Default for LearningStyles {
    fn default() -> Self {
        Self { visual: true, auditory: false, practical: false }
    }
}

impl LearningStyles {
    /// Enabled styles in fixed visual, auditory, practical order.
    pub fn enabled(&self) -> Vec<LearningStyle> {
        let mut styles = Vec::new();
        if self.visual {
            styles.push(LearningStyle::Visual);
        }
        if self.auditory {
            styles.push(LearningStyle::Auditory);
        }
        if self.practical {
            styles.push(LearningStyle::Practical);
        }
        styles
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StudyPreferences {
    pub weekly_hours: u32,
    pub preferred_times: Vec<String>,
    pub learning_styles: LearningStyles,
}

impl Default for StudyPreferences {
    fn default() -> Self {
        Self {
            weekly_hours: 20,
            preferred_times: Vec::new(),
            learning_styles: LearningStyles::default(),
        }
    }
}

impl StudyPreferences {
    pub const MAX_WEEKLY_HOURS: u32 = 40;

    /// Checks the hour target and drops repeated time slots, keeping the
    /// first occurrence of each.
    pub fn validated(mut self) -> Result<Self> {
        if !(1..=Self::MAX_WEEKLY_HOURS).contains(&self.weekly_hours) {
            return Err(StudyError::InvalidProfile(format!(
                "weekly_hours must be between 1 and {}, got {}",
                Self::MAX_WEEKLY_HOURS,
                self.weekly_hours
            )));
        }
        let mut seen = BTreeSet::new();
        self.preferred_times.retain(|slot| seen.insert(slot.clone()));
        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct LoginTracking {
    #[serde(deserialize_with = "timestamp::deserialize_option")]
    pub last_login: Option<DateTime<Utc>>,
    pub login_streak: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TopicStats {
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub sessions: u32,
    pub average_score: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SubjectStats {
    pub topics: BTreeMap<String, TopicStats>,
    pub overall_score: f64,
    pub questions_answered: u32,
}

/// One entry of the append-only interaction history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionRecord {
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub date: DateTime<Utc>,
    pub subject: String,
    pub topic: String,
    pub questions_asked: u32,
    pub correct_answers: u32,
    pub score: f64,
}

/// A scheduled study activity inside a stored plan.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlanSession {
    pub id: String,
    pub subject: String,
    pub topic: String,
    pub duration: String,
    #[serde(alias = "style")]
    pub method: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DaySchedule {
    #[serde(default)]
    pub sessions: Vec<PlanSession>,
}

pub type DailySchedules = BTreeMap<String, DaySchedule>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Inactive,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudyPlan {
    pub id: u32,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub goals: String,
    pub status: PlanStatus,
    pub daily_schedules: DailySchedules,
}

impl StudyPlan {
    pub fn sessions(&self) -> impl Iterator<Item = &PlanSession> {
        self.daily_schedules.values().flat_map(|day| day.sessions.iter())
    }

    pub fn contains_session(&self, session_id: &str) -> bool {
        self.sessions().any(|s| s.id == session_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudyGoal {
    pub id: u32,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    pub goals: String,
    pub status: GoalStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudentProfile {
    #[serde(alias = "student_id")]
    pub id: String,
    pub name: String,
    pub grade: u8,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub courses: BTreeSet<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub study_preferences: StudyPreferences,
    #[serde(default)]
    pub subject_priorities: BTreeMap<String, Priority>,
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectStats>,
    #[serde(default)]
    pub progress: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
    #[serde(default)]
    pub session_history: Vec<SessionRecord>,
    #[serde(default)]
    pub badges: BTreeSet<String>,
    #[serde(default)]
    pub login_tracking: LoginTracking,
    #[serde(default)]
    pub study_plans: Vec<StudyPlan>,
    #[serde(default)]
    pub study_goals: Vec<StudyGoal>,
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,
}

impl StudentProfile {
    /// Builds a fresh profile with one empty stats entry per subject.
    pub fn new(id: &str, name: &str, grade: u8, subjects: &[String]) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(StudyError::InvalidProfile("student id must not be empty".to_string()));
        }
        if !(1..=12).contains(&grade) {
            return Err(StudyError::InvalidProfile(format!(
                "grade must be between 1 and 12, got {}",
                grade
            )));
        }

        let subjects = subjects
            .iter()
            .map(|s| (s.clone(), SubjectStats::default()))
            .collect();

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            grade,
            created_at: Some(Utc::now()),
            courses: BTreeSet::new(),
            preferences: Preferences::default(),
            study_preferences: StudyPreferences::default(),
            subject_priorities: BTreeMap::new(),
            subjects,
            progress: BTreeMap::new(),
            session_history: Vec::new(),
            badges: BTreeSet::new(),
            login_tracking: LoginTracking::default(),
            study_plans: Vec::new(),
            study_goals: Vec::new(),
            completed_tasks: BTreeSet::new(),
        })
    }

    /// The most recently created plan still marked active.
    pub fn active_plan(&self) -> Option<&StudyPlan> {
        self.study_plans.iter().rev().find(|p| p.status == PlanStatus::Active)
    }

    /// Gives practiced topics without a score history one entry holding
    /// their stored average, so older records keep counting toward mastery.
    pub fn seed_progress_from_stats(&mut self) {
        for (subject, stats) in &self.subjects {
            for (topic, topic_stats) in &stats.topics {
                if topic_stats.questions_answered == 0 {
                    continue;
                }
                let history = self
                    .progress
                    .entry(subject.clone())
                    .or_default()
                    .entry(topic.clone())
                    .or_default();
                if history.is_empty() {
                    history.push(topic_stats.average_score);
                }
            }
        }
    }

    /// Mean of the recorded scores for a topic, if any were recorded.
    pub fn topic_mastery(&self, subject: &str, topic: &str) -> Option<f64> {
        self.progress
            .get(subject)
            .and_then(|topics| topics.get(topic))
            .and_then(|scores| mean(scores))
    }
}

/// Timestamps are written as RFC 3339, but older records carry naive
/// `YYYY-MM-DDTHH:MM:SS[.ffffff]` values which are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT).ok().map(|n| n.and_utc()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

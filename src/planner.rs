//! Study plan storage, completion tracking and plan helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{info, warn};

use crate::curriculum;
use crate::database::StudentStore;
use crate::error::{Result, StudyError};
use crate::model::{
    DailySchedules, DaySchedule, GoalStatus, PlanSession, PlanStatus, StudentProfile, StudyGoal, StudyPlan,
};
use crate::schedule::WeeklySchedule;

pub const FALLBACK_SESSIONS_PER_DAY: usize = 3;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StudyProgress {
    pub plan_id: u32,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProgressCheck {
    pub completion_rate: f64,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub remaining_tasks: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlanSummary {
    pub total_hours: f64,
    pub subject_distribution: BTreeMap<String, f64>,
    pub days_covered: usize,
}

/// Extracts and validates the `daily_schedules` section of a submitted plan.
pub fn parse_plan(plan: &serde_json::Value) -> Result<DailySchedules> {
    let schedules = plan
        .get("daily_schedules")
        .ok_or_else(|| StudyError::MalformedPlan("missing 'daily_schedules'".to_string()))?;
    let schedules: DailySchedules = serde_json::from_value(schedules.clone())
        .map_err(|e| StudyError::MalformedPlan(e.to_string()))?;

    let mut seen = HashSet::new();
    for session in schedules.values().flat_map(|d| d.sessions.iter()) {
        if !seen.insert(session.id.as_str()) {
            return Err(StudyError::MalformedPlan(format!("duplicate session id '{}'", session.id)));
        }
    }
    Ok(schedules)
}

/// Stores a new active plan, demoting every earlier plan to inactive.
///
/// Validation happens before any mutation, so a rejected plan leaves the
/// profile untouched.
pub fn save_study_plan(
    profile: &mut StudentProfile,
    plan: &serde_json::Value,
    goals: &str,
    now: DateTime<Utc>,
) -> Result<u32> {
    let daily_schedules = parse_plan(plan)?;

    for existing in &mut profile.study_plans {
        existing.status = PlanStatus::Inactive;
    }

    let plan_id = profile.study_plans.len() as u32 + 1;
    profile.study_plans.push(StudyPlan {
        id: plan_id,
        created_at: now,
        goals: goals.to_string(),
        status: PlanStatus::Active,
        daily_schedules,
    });

    profile.study_goals.push(StudyGoal {
        id: profile.study_goals.len() as u32 + 1,
        created_at: now,
        goals: goals.to_string(),
        status: GoalStatus::InProgress,
    });

    Ok(plan_id)
}

pub fn study_progress(profile: &StudentProfile) -> Option<StudyProgress> {
    let plan = profile.active_plan()?;
    let check = progress_check(&plan.daily_schedules, &profile.completed_tasks);
    Some(StudyProgress {
        plan_id: plan.id,
        total_tasks: check.total_tasks,
        completed_tasks: check.completed_tasks,
        completion_rate: check.completion_rate,
    })
}

pub fn progress_check(daily_schedules: &DailySchedules, completed: &BTreeSet<String>) -> ProgressCheck {
    let sessions = || daily_schedules.values().flat_map(|d| d.sessions.iter());
    let total_tasks = sessions().count();
    let done = sessions().filter(|s| completed.contains(&s.id)).count();

    ProgressCheck {
        completion_rate: completion_rate(done, total_tasks),
        total_tasks,
        completed_tasks: done,
        remaining_tasks: total_tasks - done,
    }
}

fn completion_rate(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

/// Returns `true` when the task was newly recorded.
pub fn mark_task_completed(profile: &mut StudentProfile, task_id: &str) -> bool {
    profile.completed_tasks.insert(task_id.to_string())
}

/// Turns a generated week into storable plan days `Day 1`..`Day 7`.
pub fn schedule_to_plan(schedule: &WeeklySchedule, weekly_hours: u32) -> DailySchedules {
    let total = schedule.total_sessions();
    let hours_per_session = if total == 0 { 0.0 } else { weekly_hours as f64 / total as f64 };
    let duration = format_duration(hours_per_session);

    let mut next_id = 1;
    schedule
        .days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            let sessions = day
                .sessions
                .iter()
                .map(|s| {
                    let session = PlanSession {
                        id: next_id.to_string(),
                        subject: s.subject.clone(),
                        topic: s.topic.clone(),
                        duration: duration.clone(),
                        method: format!("{}: {}", curriculum::capitalize(s.style.label()), s.focus),
                    };
                    next_id += 1;
                    session
                })
                .collect();
            (format!("Day {}", i + 1), DaySchedule { sessions })
        })
        .collect()
}

/// Basic review plan used when no usable generated plan is available.
pub fn fallback_plan(days: usize, subjects: &[String]) -> DailySchedules {
    if subjects.is_empty() {
        return DailySchedules::new();
    }
    (0..days)
        .map(|i| {
            let sessions = (0..FALLBACK_SESSIONS_PER_DAY)
                .map(|j| PlanSession {
                    id: (i * FALLBACK_SESSIONS_PER_DAY + j + 1).to_string(),
                    subject: subjects[j % subjects.len()].clone(),
                    topic: curriculum::REVIEW_TOPIC.to_string(),
                    duration: "1 hours".to_string(),
                    method: "Self-study and practice".to_string(),
                })
                .collect();
            (format!("Day {}", i + 1), DaySchedule { sessions })
        })
        .collect()
}

pub fn plan_summary(daily_schedules: &DailySchedules) -> PlanSummary {
    let mut total_hours = 0.0;
    let mut subject_distribution = BTreeMap::new();

    for session in daily_schedules.values().flat_map(|d| d.sessions.iter()) {
        match parse_duration(&session.duration) {
            Some(hours) => {
                total_hours += hours;
                *subject_distribution.entry(session.subject.clone()).or_insert(0.0) += hours;
            }
            None => warn!(session = %session.id, duration = %session.duration, "unreadable duration skipped"),
        }
    }

    PlanSummary { total_hours, subject_distribution, days_covered: daily_schedules.len() }
}

/// Day labels in calendar order: `Day 2` before `Day 10`.
pub fn ordered_days(daily_schedules: &DailySchedules) -> Vec<&String> {
    let mut days: Vec<&String> = daily_schedules.keys().collect();
    days.sort_by_key(|label| {
        let number = label.strip_prefix("Day ").and_then(|n| n.trim().parse::<u32>().ok());
        (number.unwrap_or(u32::MAX), label.to_string())
    });
    days
}

fn parse_duration(duration: &str) -> Option<f64> {
    duration.split_whitespace().next()?.parse::<f64>().ok().filter(|h| h.is_finite())
}

fn format_duration(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.0} hours", hours)
    } else {
        format!("{:.1} hours", hours)
    }
}

pub fn save_study_plan_for(
    store: &dyn StudentStore,
    student_id: &str,
    plan: &serde_json::Value,
    goals: &str,
) -> Result<u32> {
    let mut profile = store.require(student_id)?;
    let plan_id = match save_study_plan(&mut profile, plan, goals, Utc::now()) {
        Ok(id) => id,
        Err(e) => {
            warn!(student = %student_id, error = %e, "study plan rejected");
            return Err(e);
        }
    };
    store.save(&profile)?;
    info!(student = %student_id, plan_id, "study plan saved");
    Ok(plan_id)
}

pub fn mark_task_completed_for(store: &dyn StudentStore, student_id: &str, task_id: &str) -> Result<bool> {
    let mut profile = store.require(student_id)?;
    let inserted = mark_task_completed(&mut profile, task_id);
    if inserted {
        store.save(&profile)?;
    }
    Ok(inserted)
}

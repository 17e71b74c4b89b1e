use serde::Serialize;
use std::fmt::Write as _;

use crate::curriculum;
use crate::error::{Result, StudyError};
use crate::model::{SessionRecord, StudentProfile};

const HIGHLIGHT_COUNT: usize = 3;
const RECENT_SESSIONS: usize = 5;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SubjectSummary {
    pub subject: String,
    pub display_name: String,
    pub overall_score: f64,
    pub questions_answered: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TopicScore {
    pub subject: String,
    pub topic: String,
    pub score: f64,
    pub questions: u32,
}

#[derive(Serialize, Clone, Debug)]
pub struct PerformanceReport {
    pub student_id: String,
    pub name: String,
    pub grade: u8,
    pub subjects: Vec<SubjectSummary>,
    pub strengths: Vec<TopicScore>,
    pub improvement_areas: Vec<TopicScore>,
    pub recent_sessions: Vec<SessionRecord>,
    pub badges: Vec<String>,
    pub login_streak: u32,
    pub summary: String,
}

pub struct PerformanceAnalyzer;

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        PerformanceAnalyzer
    }

    /// `None` until the student has answered at least one question.
    pub fn generate_report(&self, profile: &StudentProfile) -> Option<PerformanceReport> {
        let topics = self.topic_scores(profile);
        if topics.is_empty() {
            return None;
        }

        let subjects: Vec<SubjectSummary> = profile
            .subjects
            .iter()
            .filter(|(_, stats)| stats.questions_answered > 0)
            .map(|(subject, stats)| SubjectSummary {
                subject: subject.clone(),
                display_name: curriculum::display_name(subject),
                overall_score: stats.overall_score,
                questions_answered: stats.questions_answered,
            })
            .collect();

        let mut by_score = topics;
        by_score.sort_by(|a, b| b.score.total_cmp(&a.score));
        let strengths: Vec<TopicScore> = by_score.iter().take(HIGHLIGHT_COUNT).cloned().collect();
        let improvement_areas: Vec<TopicScore> = by_score.iter().rev().take(HIGHLIGHT_COUNT).cloned().collect();

        let mut recent_sessions = profile.session_history.clone();
        recent_sessions.sort_by(|a, b| b.date.cmp(&a.date));
        recent_sessions.truncate(RECENT_SESSIONS);

        let mut report = PerformanceReport {
            student_id: profile.id.clone(),
            name: profile.name.clone(),
            grade: profile.grade,
            subjects,
            strengths,
            improvement_areas,
            recent_sessions,
            badges: profile.badges.iter().cloned().collect(),
            login_streak: profile.login_tracking.login_streak,
            summary: String::new(),
        };
        report.summary = self.render_summary(&report);
        Some(report)
    }

    fn topic_scores(&self, profile: &StudentProfile) -> Vec<TopicScore> {
        profile
            .subjects
            .iter()
            .flat_map(|(subject, stats)| {
                stats
                    .topics
                    .iter()
                    .filter(|(_, t)| t.questions_answered > 0)
                    .map(move |(topic, t)| TopicScore {
                        subject: subject.clone(),
                        topic: topic.clone(),
                        score: t.average_score,
                        questions: t.questions_answered,
                    })
            })
            .collect()
    }

    fn render_summary(&self, report: &PerformanceReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Performance Report for {} (Grade {})", report.name, report.grade);
        out.push('\n');

        for s in &report.subjects {
            let _ = writeln!(
                out,
                "{}: Overall Score {:.1}% ({} questions answered)",
                s.display_name, s.overall_score, s.questions_answered
            );
        }

        out.push_str("\nStrengths:\n");
        for t in &report.strengths {
            let _ = writeln!(out, "- {} ({}): {:.1}%", t.topic, curriculum::display_name(&t.subject), t.score);
        }

        out.push_str("\nAreas for Improvement:\n");
        for t in &report.improvement_areas {
            let _ = writeln!(out, "- {} ({}): {:.1}%", t.topic, curriculum::display_name(&t.subject), t.score);
        }

        if !report.recent_sessions.is_empty() {
            out.push_str("\nRecent Progress:\n");
            for s in &report.recent_sessions {
                let _ = writeln!(
                    out,
                    "- {}: {} - {} ({:.1}%)",
                    s.date.format("%Y-%m-%d"),
                    curriculum::display_name(&s.subject),
                    s.topic,
                    s.score
                );
            }
        }

        if !report.badges.is_empty() {
            out.push_str("\nBadges Earned:\n");
            for badge in &report.badges {
                let _ = writeln!(out, "- {}", badge);
            }
        }

        out
    }

    /// Session history as CSV, oldest first.
    pub fn export_sessions_csv(&self, profile: &StudentProfile) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if profile.session_history.is_empty() {
            writer.write_record(["date", "subject", "topic", "questions_asked", "correct_answers", "score"])?;
        }
        for session in &profile.session_history {
            writer.serialize(session)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| StudyError::Storage(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            StudyError::Storage(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::{GamificationEngine, SessionRequest};
    use chrono::{TimeZone, Utc};

    fn practiced_profile() -> StudentProfile {
        let engine = GamificationEngine::new();
        let mut profile = StudentProfile::new("s1", "Ada", 10, &["math".to_string(), "physics".to_string()]).unwrap();
        let sessions = [
            ("math", "Fractions", 9),
            ("math", "Decimals", 4),
            ("physics", "Motion", 7),
            ("physics", "Forces", 2),
            ("math", "Geometry Basics", 10),
            ("physics", "Energy", 6),
        ];
        for (day, (subject, topic, correct)) in sessions.iter().enumerate() {
            let request = SessionRequest {
                subject: subject.to_string(),
                topic: topic.to_string(),
                questions_asked: 10,
                correct_answers: *correct,
            };
            let when = Utc.with_ymd_and_hms(2024, 5, day as u32 + 1, 12, 0, 0).unwrap();
            engine.record_session(&mut profile, &request, when).unwrap();
        }
        profile
    }

    #[test]
    fn no_practice_means_no_report() {
        let profile = StudentProfile::new("s1", "Ada", 10, &["math".to_string()]).unwrap();
        assert!(PerformanceAnalyzer::new().generate_report(&profile).is_none());
    }

    #[test]
    fn report_ranks_strengths_and_weaknesses() {
        let report = PerformanceAnalyzer::new().generate_report(&practiced_profile()).unwrap();

        let strengths: Vec<_> = report.strengths.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(strengths, vec!["Geometry Basics", "Fractions", "Motion"]);
        let weak: Vec<_> = report.improvement_areas.iter().map(|t| t.topic.as_str()).collect();
        assert_eq!(weak, vec!["Forces", "Decimals", "Energy"]);

        assert_eq!(report.recent_sessions.len(), 5);
        assert_eq!(report.recent_sessions[0].topic, "Energy");
        assert_eq!(report.subjects.len(), 2);
        assert!(report.summary.contains("Mathematics: Overall Score 76.7% (30 questions answered)"));
        assert!(report.summary.contains("- 2024-05-06: Physics - Energy (60.0%)"));
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let csv = PerformanceAnalyzer::new().export_sessions_csv(&practiced_profile()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,subject,topic,questions_asked,correct_answers,score");
        assert_eq!(lines.len(), 7);
        assert!(lines[1].contains(",math,Fractions,10,9,90.0"));
    }

    #[test]
    fn empty_history_exports_header_only() {
        let profile = StudentProfile::new("s1", "Ada", 10, &[]).unwrap();
        let csv = PerformanceAnalyzer::new().export_sessions_csv(&profile).unwrap();
        assert_eq!(csv.trim_end(), "date,subject,topic,questions_asked,correct_answers,score");
    }
}

//! The language-model tutor seam.
//!
//! The model provider itself lives outside this crate. [`TutorService`]
//! wraps any [`Tutor`] so that provider failures become apology text or
//! offline content instead of errors.

use std::sync::Arc;
use tracing::warn;

use crate::error::{Result, StudyError};
use crate::model::{DailySchedules, Difficulty};
use crate::scoring::{self, Question, QuestionKind};

pub trait Tutor: Send + Sync {
    /// Sends one prompt, optionally within the chat session kept for `subject`.
    fn complete(&self, subject: Option<&str>, prompt: &str) -> Result<String>;
}

/// Tutor used when no provider is configured; every call fails.
pub struct OfflineTutor;

impl Tutor for OfflineTutor {
    fn complete(&self, _subject: Option<&str>, _prompt: &str) -> Result<String> {
        Err(StudyError::Tutor("no tutor provider configured".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdjustedPlan {
    Structured(DailySchedules),
    Unstructured(String),
}

#[derive(Clone)]
pub struct TutorService {
    tutor: Arc<dyn Tutor>,
}

impl TutorService {
    pub fn new(tutor: Arc<dyn Tutor>) -> Self {
        Self { tutor }
    }

    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineTutor))
    }

    pub fn ask_question(&self, question: &str, subject: &str, grade: u8, language: &str) -> String {
        let prompt = format!(
            "You are a patient tutor for a grade {} student studying {}. Answer in language '{}'.\n\nQuestion: {}",
            grade, subject, language, question
        );
        self.tutor.complete(Some(subject), &prompt).unwrap_or_else(|e| {
            warn!(subject, error = %e, "tutor question failed");
            format!("I apologize, but I encountered an error: {}", e)
        })
    }

    /// Generated questions, or the offline bank when generation or parsing fails.
    pub fn practice_questions(
        &self,
        subject: &str,
        topic: &str,
        difficulty: Difficulty,
        kind: QuestionKind,
        count: usize,
    ) -> Vec<Question> {
        let format_hint = match kind {
            QuestionKind::MultipleChoice => {
                "Each item needs \"question\", \"options\" (4 strings), \"correct_answer\" and \"explanation\"."
            }
            QuestionKind::OpenEnded => "Each item needs a \"question\" field.",
        };
        let prompt = format!(
            "Generate {} {} practice questions for {} topic: {}.\nDifficulty level: {}\nReply with a JSON array only. {}",
            count,
            match kind {
                QuestionKind::MultipleChoice => "multiple choice",
                QuestionKind::OpenEnded => "open-ended",
            },
            subject,
            topic,
            difficulty,
            format_hint
        );

        match self.tutor.complete(Some(subject), &prompt) {
            Ok(text) => match scoring::parse_questions(&text) {
                Some(mut questions) => {
                    questions.truncate(count);
                    questions
                }
                None => {
                    warn!(subject, topic, "generated questions unreadable, using offline bank");
                    scoring::fallback_questions(subject, kind, count)
                }
            },
            Err(e) => {
                warn!(subject, topic, error = %e, "question generation failed, using offline bank");
                scoring::fallback_questions(subject, kind, count)
            }
        }
    }

    /// Free-form grading text, expected to carry a `Score: X/100` line.
    pub fn evaluate_answer(&self, question: &str, answer: &str, subject: &str, grade: u8) -> String {
        let prompt = format!(
            "Evaluate this grade {} student's answer.\n\nQuestion: {}\n\nStudent's Answer: {}\n\n\
             Start with a line 'Score: X/100', then give feedback, suggestions and key concepts to review.",
            grade, question, answer
        );
        self.tutor.complete(Some(subject), &prompt).unwrap_or_else(|e| {
            warn!(subject, error = %e, "answer evaluation failed");
            format!("Error evaluating answer: {}", e)
        })
    }

    /// Reworks a plan from student feedback. Unparseable replies are returned
    /// as text rather than failing.
    pub fn adjust_plan(&self, plan: &DailySchedules, feedback: &str) -> AdjustedPlan {
        let current = match serde_json::to_string_pretty(plan) {
            Ok(json) => json,
            Err(e) => return AdjustedPlan::Unstructured(format!("Error adjusting plan: {}", e)),
        };
        let prompt = format!(
            "Adjust the following study plan based on this feedback:\n{}\n\nCurrent plan:\n{}\n\n\
             Reply with JSON of the form {{\"daily_schedules\": ...}} keeping the same structure.",
            feedback, current
        );

        match self.tutor.complete(None, &prompt) {
            Ok(text) => match parse_daily_schedules(&text) {
                Some(schedules) => AdjustedPlan::Structured(schedules),
                None => AdjustedPlan::Unstructured(text),
            },
            Err(e) => {
                warn!(error = %e, "plan adjustment failed");
                AdjustedPlan::Unstructured(format!("Error adjusting plan: {}", e))
            }
        }
    }
}

fn parse_daily_schedules(text: &str) -> Option<DailySchedules> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    let schedules = value.get("daily_schedules")?.clone();
    serde_json::from_value(schedules).ok()
}

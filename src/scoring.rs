//! Practice question scoring and the offline question bank.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    OpenEnded,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default, alias = "correct")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QuestionFeedback {
    pub question: String,
    pub answer: Option<String>,
    pub correct_answer: String,
    pub correct: bool,
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PracticeResult {
    pub kind: QuestionKind,
    pub total_questions: usize,
    pub score: f64,
    pub feedback: Vec<QuestionFeedback>,
    /// Per-question scores for open-ended sets.
    pub question_scores: Vec<f64>,
}

impl PracticeResult {
    /// Counts recorded against the student's progress for this set.
    pub fn session_counts(&self) -> (u32, u32) {
        let asked = self.total_questions as u32;
        // tolerance keeps 60% of 5 from flooring to 2
        let correct = (self.score / 100.0 * asked as f64 + 1e-9).floor() as u32;
        (asked, correct.min(asked))
    }

    pub fn encouragement(&self) -> &'static str {
        if self.score >= 80.0 {
            "Excellent work! You've mastered this topic!"
        } else if self.score >= 60.0 {
            "Good job! Keep practicing to improve further!"
        } else {
            "Keep practicing! Review the topics and try again."
        }
    }
}

/// Exact-match grading. Missing answers count as wrong.
pub fn score_multiple_choice(questions: &[Question], answers: &[Option<String>]) -> PracticeResult {
    let feedback: Vec<QuestionFeedback> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let answer = answers.get(i).cloned().flatten();
            let correct = answer.as_deref() == Some(q.correct_answer.as_str());
            QuestionFeedback {
                question: q.question.clone(),
                answer,
                correct_answer: q.correct_answer.clone(),
                correct,
                explanation: q.explanation.clone(),
            }
        })
        .collect();

    let correct_count = feedback.iter().filter(|f| f.correct).count();
    let score = if questions.is_empty() {
        0.0
    } else {
        correct_count as f64 * 100.0 / questions.len() as f64
    };

    PracticeResult {
        kind: QuestionKind::MultipleChoice,
        total_questions: questions.len(),
        score,
        feedback,
        question_scores: Vec::new(),
    }
}

/// Reads the grade out of free-form evaluation text.
///
/// Only the first line mentioning `Score` is considered: the text after the
/// first `:` and before any `/` must parse as a number. This depends on the
/// grader's formatting and fails soft.
pub fn extract_score(evaluation: &str) -> Option<f64> {
    let line = evaluation.lines().find(|line| line.contains("Score"))?;
    let value = line.split(':').nth(1)?.trim();
    let value = value.split('/').next()?.trim();
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Mean of the extracted per-question scores; unreadable grades count as 0.
pub fn score_open_ended(evaluations: &[String]) -> PracticeResult {
    let question_scores: Vec<f64> = evaluations
        .iter()
        .enumerate()
        .map(|(i, text)| {
            extract_score(text).unwrap_or_else(|| {
                warn!(question = i + 1, "could not extract score from evaluation, counting as 0");
                0.0
            })
        })
        .collect();

    let score = if question_scores.is_empty() {
        0.0
    } else {
        question_scores.iter().sum::<f64>() / question_scores.len() as f64
    };

    PracticeResult {
        kind: QuestionKind::OpenEnded,
        total_questions: evaluations.len(),
        score,
        feedback: Vec::new(),
        question_scores,
    }
}

/// Parses generated questions from a JSON array, optionally inside a
/// ```json fence.
pub fn parse_questions(text: &str) -> Option<Vec<Question>> {
    let trimmed = text.trim();
    let body = match trimmed.find("```") {
        Some(start) => {
            let after = &trimmed[start + 3..];
            let after = after.strip_prefix("json").unwrap_or(after);
            match after.find("```") {
                Some(end) => &after[..end],
                None => after,
            }
        }
        None => trimmed,
    };

    let questions: Vec<Question> = serde_json::from_str(body.trim()).ok()?;
    let usable = !questions.is_empty() && questions.iter().all(|q| !q.question.trim().is_empty());
    usable.then_some(questions)
}

/// Offline questions used when generation is unavailable.
pub fn fallback_questions(subject: &str, kind: QuestionKind, count: usize) -> Vec<Question> {
    let bank: Vec<Question> = match kind {
        QuestionKind::MultipleChoice => multiple_choice_bank(subject),
        QuestionKind::OpenEnded => open_ended_bank(subject),
    };
    bank.into_iter().cycle().take(count).collect()
}

fn mc(question: &str, options: &[&str], correct: &str, explanation: &str) -> Question {
    Question {
        question: question.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_answer: correct.to_string(),
        explanation: explanation.to_string(),
    }
}

fn open(question: &str) -> Question {
    Question {
        question: question.to_string(),
        options: Vec::new(),
        correct_answer: String::new(),
        explanation: String::new(),
    }
}

fn multiple_choice_bank(subject: &str) -> Vec<Question> {
    match subject {
        "math" => vec![
            mc("Solve: 2x + 5 = 15", &["x = 5", "x = 10", "x = 8", "x = 6"], "x = 5", "Subtract 5, then divide by 2."),
            mc(
                "What is the area of a circle with radius 3?",
                &["6π", "9π", "12π", "3π"],
                "9π",
                "Area is πr², so π × 3² = 9π.",
            ),
        ],
        "physics" => vec![
            mc(
                "What is Newton's First Law about?",
                &["Force", "Inertia", "Acceleration", "Gravity"],
                "Inertia",
                "Objects keep their state of motion unless acted on.",
            ),
            mc("Unit of force is:", &["Joule", "Newton", "Pascal", "Watt"], "Newton", "1 N = 1 kg·m/s²."),
        ],
        "chemistry" => vec![
            mc("What is the atomic number of Carbon?", &["5", "6", "7", "8"], "6", "Carbon has six protons."),
            mc(
                "What type of bond is formed between Na and Cl?",
                &["Ionic", "Covalent", "Metallic", "Hydrogen"],
                "Ionic",
                "Sodium transfers an electron to chlorine.",
            ),
        ],
        "programming" => vec![
            mc(
                "Which data structure follows last-in, first-out order?",
                &["Queue", "Stack", "Heap", "Linked list"],
                "Stack",
                "A stack pops the most recently pushed item.",
            ),
            mc(
                "What is the time complexity of binary search?",
                &["O(n)", "O(log n)", "O(n log n)", "O(1)"],
                "O(log n)",
                "Each step halves the search range.",
            ),
        ],
        _ => vec![
            mc(
                "Which study technique spaces reviews over increasing intervals?",
                &["Cramming", "Spaced repetition", "Highlighting", "Rereading"],
                "Spaced repetition",
                "Reviews are scheduled further apart as recall improves.",
            ),
            mc(
                "What is the best first step when a concept is unclear?",
                &["Skip it", "Break it into smaller parts", "Memorize the definition", "Wait for the exam"],
                "Break it into smaller parts",
                "Smaller pieces are easier to understand and check.",
            ),
        ],
    }
}

fn open_ended_bank(subject: &str) -> Vec<Question> {
    match subject {
        "math" => vec![
            open("Explain how to solve a linear equation with one unknown."),
            open("Describe the difference between area and perimeter."),
        ],
        "physics" => vec![
            open("Explain Newton's Second Law with an everyday example."),
            open("Describe how kinetic energy changes when speed doubles."),
        ],
        "chemistry" => vec![
            open("Explain the difference between ionic and covalent bonds."),
            open("Describe how the periodic table is organized."),
        ],
        _ => vec![
            open("Summarize the key idea of the topic in your own words."),
            open("Give a real-world example where this topic applies and explain why."),
        ],
    }
}

//! Weekly study schedule generation.
//!
//! Output is intentionally varied: every choice goes through a
//! [`RandomSource`], so tests can pin it with a seed or a scripted fake.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::curriculum;
use crate::model::{LearningStyle, Priority, StudentProfile};

pub const WEEK_DAYS: [&str; 7] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"];

pub trait RandomSource {
    /// Uniform index in `0..len`. `len` is never zero.
    fn choose_index(&mut self, len: usize) -> usize;

    /// Index drawn with probability proportional to `weights`.
    fn weighted_index(&mut self, weights: &[f64]) -> usize;
}

pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn choose_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn weighted_index(&mut self, weights: &[f64]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            // all-zero or invalid weights degrade to a uniform draw
            Err(_) => self.choose_index(weights.len()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScheduledSession {
    pub time: String,
    pub subject: String,
    pub topic: String,
    pub style: LearningStyle,
    pub focus: String,
    pub difficulty: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScheduledDay {
    pub day: String,
    pub sessions: Vec<ScheduledSession>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeeklySchedule {
    pub days: Vec<ScheduledDay>,
}

impl WeeklySchedule {
    pub fn sessions(&self) -> impl Iterator<Item = &ScheduledSession> {
        self.days.iter().flat_map(|d| d.sessions.iter())
    }

    pub fn total_sessions(&self) -> usize {
        self.days.iter().map(|d| d.sessions.len()).sum()
    }
}

pub fn sessions_per_day(weekly_hours: u32) -> usize {
    ((weekly_hours as f64 / 7.0).round() as usize).max(1)
}

/// Priority weights normalized to sum to one, in subject order.
pub fn subject_weights(priorities: &BTreeMap<String, Priority>) -> Vec<(String, f64)> {
    let total: f64 = priorities.values().map(|p| p.weight()).sum();
    priorities
        .iter()
        .map(|(subject, p)| (subject.clone(), p.weight() / total))
        .collect()
}

pub struct ScheduleGenerator {
    /// Used at Medium priority when a student has set no priorities.
    fallback_subjects: Vec<String>,
}

impl ScheduleGenerator {
    pub fn new(fallback_subjects: Vec<String>) -> Self {
        Self { fallback_subjects }
    }

    pub fn generate(&self, profile: &StudentProfile, rng: &mut dyn RandomSource) -> WeeklySchedule {
        let priorities = self.effective_priorities(profile);
        let weights = subject_weights(&priorities);
        let per_day = sessions_per_day(profile.study_preferences.weekly_hours);
        let styles = profile.study_preferences.learning_styles.enabled();
        let times = &profile.study_preferences.preferred_times;

        let days = WEEK_DAYS
            .iter()
            .map(|day| ScheduledDay {
                day: day.to_string(),
                sessions: (0..per_day)
                    .filter_map(|_| self.generate_session(&weights, &styles, times, rng))
                    .collect(),
            })
            .collect();

        let schedule = WeeklySchedule { days };
        debug!(student = %profile.id, sessions = schedule.total_sessions(), "schedule generated");
        schedule
    }

    fn effective_priorities(&self, profile: &StudentProfile) -> BTreeMap<String, Priority> {
        if !profile.subject_priorities.is_empty() {
            return profile.subject_priorities.clone();
        }
        self.fallback_subjects
            .iter()
            .map(|s| (s.clone(), Priority::Medium))
            .collect()
    }

    fn generate_session(
        &self,
        weights: &[(String, f64)],
        styles: &[LearningStyle],
        times: &[String],
        rng: &mut dyn RandomSource,
    ) -> Option<ScheduledSession> {
        if weights.is_empty() {
            return None;
        }
        let probabilities: Vec<f64> = weights.iter().map(|(_, w)| *w).collect();
        let subject = weights[rng.weighted_index(&probabilities)].0.clone();

        let topics = curriculum::topics_for(&subject);
        let topic = topics[rng.choose_index(topics.len())].to_string();

        let style = if styles.is_empty() {
            LearningStyle::Visual
        } else {
            styles[rng.choose_index(styles.len())]
        };

        let difficulty = curriculum::topic_difficulty(&topic);

        let templates = curriculum::focus_templates(style);
        let focus = templates[rng.choose_index(templates.len())].replace("{topic}", &topic);

        let time = if times.is_empty() {
            curriculum::DEFAULT_TIME_SLOT.to_string()
        } else {
            times[rng.choose_index(times.len())].clone()
        };

        Some(ScheduledSession { time, subject, topic, style, focus, difficulty })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LearningStyles;

    /// Always picks the first candidate.
    struct FirstChoice;

    impl RandomSource for FirstChoice {
        fn choose_index(&mut self, _len: usize) -> usize {
            0
        }

        fn weighted_index(&mut self, _weights: &[f64]) -> usize {
            0
        }
    }

    fn profile_with(priorities: &[(&str, Priority)], weekly_hours: u32) -> StudentProfile {
        let mut profile = StudentProfile::new("s1", "Ada", 11, &[]).unwrap();
        profile.subject_priorities = priorities.iter().map(|(s, p)| (s.to_string(), *p)).collect();
        profile.study_preferences.weekly_hours = weekly_hours;
        profile
    }

    #[test]
    fn sessions_per_day_rounds_with_floor_of_one() {
        assert_eq!(sessions_per_day(0), 1);
        assert_eq!(sessions_per_day(3), 1);
        assert_eq!(sessions_per_day(14), 2);
        assert_eq!(sessions_per_day(20), 3);
        assert_eq!(sessions_per_day(25), 4);
    }

    #[test]
    fn weights_are_normalized() {
        let priorities: BTreeMap<String, Priority> =
            [("a".to_string(), Priority::High), ("b".to_string(), Priority::Low)].into_iter().collect();
        let weights = subject_weights(&priorities);
        assert!((weights[0].1 - 6.0 / 7.0).abs() < 1e-12);
        assert!((weights[1].1 - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn scripted_source_gives_exact_output() {
        let generator = ScheduleGenerator::new(vec![]);
        let mut profile = profile_with(&[("ai", Priority::High)], 7);
        profile.study_preferences.learning_styles =
            LearningStyles { visual: false, auditory: false, practical: true };
        profile.study_preferences.preferred_times = vec!["Night (8-11 PM)".to_string()];

        let schedule = generator.generate(&profile, &mut FirstChoice);

        assert_eq!(schedule.days.len(), 7);
        assert_eq!(schedule.days[0].day, "Monday");
        assert_eq!(schedule.days[6].day, "Sunday");
        let session = &schedule.days[0].sessions[0];
        assert_eq!(session.subject, "ai");
        assert_eq!(session.topic, "Machine Learning");
        assert_eq!(session.style, LearningStyle::Practical);
        assert_eq!(session.focus, "Solve practice problems on Machine Learning");
        assert_eq!(session.time, "Night (8-11 PM)");
        assert_eq!(session.difficulty, 0.7);
    }

    #[test]
    fn defaults_apply_without_styles_or_times() {
        let generator = ScheduleGenerator::new(vec![]);
        let mut profile = profile_with(&[("history", Priority::Low)], 14);
        profile.study_preferences.learning_styles =
            LearningStyles { visual: false, auditory: false, practical: false };

        let schedule = generator.generate(&profile, &mut RngSource::seeded(3));

        assert_eq!(schedule.total_sessions(), 14);
        for session in schedule.sessions() {
            assert_eq!(session.style, LearningStyle::Visual);
            assert_eq!(session.time, curriculum::DEFAULT_TIME_SLOT);
            assert_eq!(session.topic, curriculum::REVIEW_TOPIC);
            assert_eq!(session.difficulty, curriculum::DEFAULT_TOPIC_DIFFICULTY);
        }
    }

    #[test]
    fn fallback_subjects_used_without_priorities() {
        let generator = ScheduleGenerator::new(vec!["os".to_string()]);
        let profile = profile_with(&[], 7);
        let schedule = generator.generate(&profile, &mut RngSource::seeded(1));
        assert!(schedule.sessions().all(|s| s.subject == "os"));
    }

    #[test]
    fn no_subjects_at_all_yields_empty_days() {
        let generator = ScheduleGenerator::new(vec![]);
        let profile = profile_with(&[], 7);
        let schedule = generator.generate(&profile, &mut RngSource::seeded(1));
        assert_eq!(schedule.days.len(), 7);
        assert_eq!(schedule.total_sessions(), 0);
    }

    #[test]
    fn sessions_stay_within_preferences() {
        let generator = ScheduleGenerator::new(vec![]);
        let mut profile = profile_with(&[("databases", Priority::Medium), ("networks", Priority::High)], 21);
        profile.study_preferences.preferred_times =
            vec!["Evening (4-8 PM)".to_string(), "Afternoon (12-4 PM)".to_string()];
        profile.study_preferences.learning_styles =
            LearningStyles { visual: true, auditory: true, practical: false };

        let mut rng = RngSource::seeded(42);
        for _ in 0..20 {
            let schedule = generator.generate(&profile, &mut rng);
            assert_eq!(schedule.total_sessions(), 21);
            for s in schedule.sessions() {
                assert!(profile.study_preferences.preferred_times.contains(&s.time));
                assert_ne!(s.style, LearningStyle::Practical);
                assert!(curriculum::topics_for(&s.subject).contains(&s.topic.as_str()));
                assert!(s.focus.contains(&s.topic));
                assert!((0.0..=1.0).contains(&s.difficulty));
            }
        }
    }

    #[test]
    fn high_priority_drawn_about_six_times_as_often_as_low() {
        let generator = ScheduleGenerator::new(vec![]);
        // 7 sessions per day, 49 per week
        let profile = profile_with(&[("a", Priority::High), ("b", Priority::Low)], 49);
        let mut rng = RngSource::seeded(2024);

        let (mut a, mut b) = (0usize, 0usize);
        while a + b < 1000 {
            for s in generator.generate(&profile, &mut rng).sessions() {
                match s.subject.as_str() {
                    "a" => a += 1,
                    _ => b += 1,
                }
            }
        }

        let ratio = a as f64 / b as f64;
        assert!(ratio > 4.0 && ratio < 9.0, "ratio {} outside tolerance ({} vs {})", ratio, a, b);
    }
}

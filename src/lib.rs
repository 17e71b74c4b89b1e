//! StudyBud: study planning, mastery tracking and practice scoring for a
//! personal tutoring service.

pub mod analytics;
pub mod api;
pub mod config;
pub mod curriculum;
pub mod database;
pub mod error;
pub mod gamification;
pub mod model;
pub mod planner;
pub mod schedule;
pub mod scoring;
pub mod tutor;

pub use error::{Result, StudyError};

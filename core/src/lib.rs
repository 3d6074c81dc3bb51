//! Assessment scoring and session primitives shared by the Melvis API and CLI.

pub mod auth;
pub mod error;
pub mod questions;
pub mod responses;
pub mod scoring;
pub mod session;

pub use error::{AssessmentError, ConfigurationError, ValidationError};
pub use questions::{Question, QuestionBank};
pub use responses::{Advance, AnswerSet, ResponseCollector};
pub use scoring::{
    Completeness, MaxScore, ScoreResult, ScoringPolicy, Tier, score, score_with_policy,
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AssessmentError, ConfigurationError, ValidationError};
use crate::questions::QuestionBank;
use crate::responses::AnswerSet;

/// Highest option index assumed by the legacy scorer (four options per item).
pub const LEGACY_MAX_OPTION_INDEX: u32 = 3;

pub const LOW_UPPER_BOUND: f64 = 25.0;
pub const MILD_UPPER_BOUND: f64 = 50.0;
pub const MODERATE_UPPER_BOUND: f64 = 75.0;

/// Ordered severity band. Declaration order is severity order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Mild,
    Moderate,
    Severe,
}

impl Tier {
    /// Classify a percentage. Upper bounds are inclusive; anything above 75,
    /// including values past 100, is severe.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage <= LOW_UPPER_BOUND {
            Tier::Low
        } else if percentage <= MILD_UPPER_BOUND {
            Tier::Mild
        } else if percentage <= MODERATE_UPPER_BOUND {
            Tier::Moderate
        } else {
            Tier::Severe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Low => "low",
            Tier::Mild => "mild",
            Tier::Moderate => "moderate",
            Tier::Severe => "severe",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Tier::Low => {
                "Your responses suggest you're managing well overall. Continue with your current self-care practices."
            }
            Tier::Mild => {
                "Your responses indicate some areas that could benefit from attention. Consider focusing on stress management and self-care."
            }
            Tier::Moderate => {
                "Your responses suggest you may be experiencing significant stress or mental health challenges. It's important to seek support."
            }
            Tier::Severe => {
                "Your responses indicate you may be experiencing severe mental health challenges. Please consider seeking professional help immediately."
            }
        }
    }

    pub fn recommendations(self) -> &'static [&'static str] {
        match self {
            Tier::Low => &[
                "Maintain your current wellness routine",
                "Continue regular exercise and healthy habits",
                "Stay connected with supportive relationships",
            ],
            Tier::Mild => &[
                "Practice daily mindfulness or meditation",
                "Establish a regular sleep schedule",
                "Consider talking to a counselor or therapist",
                "Engage in regular physical activity",
            ],
            Tier::Moderate => &[
                "Consider professional counseling or therapy",
                "Practice stress reduction techniques",
                "Reach out to trusted friends or family",
                "Consider speaking with your healthcare provider",
            ],
            Tier::Severe => &[
                "Contact a mental health professional",
                "Reach out to a crisis helpline if needed",
                "Don't hesitate to seek emergency care if you're in crisis",
                "Connect with supportive friends and family",
            ],
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with questions that have no answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    /// Missing answers count as 0.
    #[default]
    Lenient,
    /// Any missing answer rejects the submission.
    Strict,
}

/// How the denominator of the percentage is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaxScore {
    /// Sum of every question's own highest option index.
    #[default]
    PerQuestion,
    /// `questions × n`, regardless of each question's option count.
    Uniform(u32),
}

/// Knobs for [`score_with_policy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScoringPolicy {
    pub completeness: Completeness,
    pub max_score: MaxScore,
}

impl ScoringPolicy {
    /// Reproduces the original calculator: lenient, `questions × 3`.
    /// Percentages can exceed 100 when items have more than four options.
    pub fn legacy() -> Self {
        Self {
            completeness: Completeness::Lenient,
            max_score: MaxScore::Uniform(LEGACY_MAX_OPTION_INDEX),
        }
    }

    pub fn strict() -> Self {
        Self {
            completeness: Completeness::Strict,
            max_score: MaxScore::PerQuestion,
        }
    }
}

/// Immutable result of scoring one completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// Sum of the selected option indices
    pub raw_total: u64,
    /// Denominator used for the percentage
    pub max_possible: u64,
    /// `raw_total / max_possible * 100`
    pub percentage: f64,
    pub tier: Tier,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// Score with the default policy (lenient, per-question maximum).
pub fn score(bank: &QuestionBank, answers: &AnswerSet) -> Result<ScoreResult, AssessmentError> {
    score_with_policy(bank, answers, &ScoringPolicy::default())
}

/// Reduce an answer set to a percentage and tier.
///
/// Only questions in `bank` contribute; entries for other ids are ignored.
pub fn score_with_policy(
    bank: &QuestionBank,
    answers: &AnswerSet,
    policy: &ScoringPolicy,
) -> Result<ScoreResult, AssessmentError> {
    if bank.is_empty() {
        return Err(ConfigurationError::EmptyBank.into());
    }

    if policy.completeness == Completeness::Strict {
        let missing: Vec<u32> = bank
            .iter()
            .map(|q| q.id)
            .filter(|id| !answers.contains(*id))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::Incomplete { missing }.into());
        }
    }

    let raw_total: u64 = bank
        .iter()
        .filter_map(|q| answers.get(q.id))
        .map(|idx| idx as u64)
        .sum();

    let max_possible: u64 = match policy.max_score {
        MaxScore::PerQuestion => bank.iter().map(|q| q.max_option_index() as u64).sum(),
        MaxScore::Uniform(0) => return Err(ConfigurationError::ZeroMaxOptionIndex.into()),
        MaxScore::Uniform(max_index) => bank.len() as u64 * u64::from(max_index),
    };
    // Unreachable for validated banks (every question has at least 2 options).
    if max_possible == 0 {
        return Err(ConfigurationError::ZeroMaxOptionIndex.into());
    }

    let percentage = raw_total as f64 / max_possible as f64 * 100.0;
    let tier = Tier::from_percentage(percentage);

    Ok(ScoreResult {
        raw_total,
        max_possible,
        percentage,
        tier,
        message: tier.message().to_string(),
        recommendations: tier
            .recommendations()
            .iter()
            .map(|r| r.to_string())
            .collect(),
    })
}

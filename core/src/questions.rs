use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ConfigurationError;

const FREQUENCY_OPTIONS: [&str; 4] = [
    "Not at all",
    "Several days",
    "More than half the days",
    "Nearly every day",
];

/// A single assessment item.
///
/// The position of an option in `options` is its weight: index 0 is the
/// least severe answer. Options are never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    /// Stable, positive identifier used as the answer key
    pub id: u32,
    /// Display text shown to the respondent
    pub prompt: String,
    /// Ordered answer choices, least to most severe
    pub options: Vec<String>,
}

impl Question {
    pub fn new(id: u32, prompt: impl Into<String>, options: &[&str]) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// Highest selectable option index.
    pub fn max_option_index(&self) -> usize {
        self.options.len().saturating_sub(1)
    }
}

/// Ordered, fixed sequence of assessment items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Build a bank, checking that ids are positive and unique and that every
    /// question offers at least two options. An empty bank is accepted here and
    /// rejected when scoring.
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if question.id == 0 {
                return Err(ConfigurationError::ZeroQuestionId);
            }
            if !seen.insert(question.id) {
                return Err(ConfigurationError::DuplicateQuestion {
                    question_id: question.id,
                });
            }
            if question.options.len() < 2 {
                return Err(ConfigurationError::TooFewOptions {
                    question_id: question.id,
                    option_count: question.options.len(),
                });
            }
        }
        Ok(Self { questions })
    }

    /// The eight-item wellbeing questionnaire shipped with Melvis.
    pub fn standard() -> Self {
        Self {
            questions: vec![
                Question::new(
                    1,
                    "Over the past two weeks, how often have you been bothered by feeling nervous, anxious, or on edge?",
                    &FREQUENCY_OPTIONS,
                ),
                Question::new(
                    2,
                    "How often have you been bothered by not being able to stop or control worrying?",
                    &FREQUENCY_OPTIONS,
                ),
                Question::new(
                    3,
                    "Over the past two weeks, how often have you felt little interest or pleasure in doing things?",
                    &FREQUENCY_OPTIONS,
                ),
                Question::new(
                    4,
                    "How often have you been feeling down, depressed, or hopeless?",
                    &FREQUENCY_OPTIONS,
                ),
                Question::new(
                    5,
                    "How would you rate your overall stress level in the past month?",
                    &["Very low", "Low", "Moderate", "High", "Very high"],
                ),
                Question::new(
                    6,
                    "How well have you been sleeping lately?",
                    &["Very well", "Well", "Fair", "Poor", "Very poor"],
                ),
                Question::new(
                    7,
                    "How often do you engage in self-care activities?",
                    &["Daily", "Several times a week", "Weekly", "Rarely", "Never"],
                ),
                Question::new(
                    8,
                    "How comfortable are you with seeking support when you need it?",
                    &[
                        "Very comfortable",
                        "Comfortable",
                        "Neutral",
                        "Uncomfortable",
                        "Very uncomfortable",
                    ],
                ),
            ],
        }
    }

    /// Parse a bank from a JSON array of `{id, prompt, options}` objects.
    pub fn from_json(raw: &str) -> Result<Self, QuestionBankLoadError> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        Ok(Self::new(questions)?)
    }

    /// Read and parse a JSON bank file.
    pub fn load(path: &Path) -> Result<Self, QuestionBankLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| QuestionBankLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn find(&self, question_id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::standard()
    }
}

/// Failure while reading a question bank from disk or JSON.
#[derive(Debug, thiserror::Error)]
pub enum QuestionBankLoadError {
    #[error("failed to read question bank {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

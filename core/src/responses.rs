use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, ValidationError};
use crate::questions::{Question, QuestionBank};
use crate::scoring::{self, ScoreResult, ScoringPolicy};

/// Selected option index per question id for one attempt.
///
/// Only answered questions have an entry. Serialized as a JSON object keyed
/// by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet {
    answers: BTreeMap<u32, usize>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: u32) -> Option<usize> {
        self.answers.get(&question_id).copied()
    }

    /// Set the answer for a question, replacing any earlier choice.
    /// Callers are responsible for bounds checks; see [`ResponseCollector`].
    pub fn insert(&mut self, question_id: u32, option_index: usize) {
        self.answers.insert(question_id, option_index);
    }

    pub fn contains(&self, question_id: u32) -> bool {
        self.answers.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.answers.iter().map(|(id, idx)| (*id, *idx))
    }
}

impl FromIterator<(u32, usize)> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = (u32, usize)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

/// Outcome of moving the cursor forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor now points at `position`.
    Moved { position: usize },
    /// The cursor was on the last question; the attempt can be scored.
    ReadyToScore,
}

/// One respondent's pass through a question bank.
///
/// Owns the attempt's [`AnswerSet`] and a cursor over the bank. Each attempt
/// gets its own collector; nothing is shared between attempts except the
/// read-only bank.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    bank: Arc<QuestionBank>,
    cursor: usize,
    answers: AnswerSet,
}

impl ResponseCollector {
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self {
            bank,
            cursor: 0,
            answers: AnswerSet::new(),
        }
    }

    /// Record the respondent's choice for `question_id`. Last write wins.
    ///
    /// Fails without touching existing answers when the question is not in
    /// the bank or the index is outside its options.
    pub fn record_answer(
        &mut self,
        question_id: u32,
        option_index: usize,
    ) -> Result<(), ValidationError> {
        let question = self
            .bank
            .find(question_id)
            .ok_or(ValidationError::UnknownQuestion { question_id })?;

        if option_index >= question.options.len() {
            return Err(ValidationError::OptionOutOfRange {
                question_id,
                option_index,
                option_count: question.options.len(),
            });
        }

        self.answers.insert(question_id, option_index);
        Ok(())
    }

    /// Record a choice for the question under the cursor.
    pub fn answer_current(&mut self, option_index: usize) -> Result<(), ValidationError> {
        let question_id = self
            .current_question()
            .map(|q| q.id)
            .ok_or(ValidationError::NoCurrentQuestion)?;
        self.record_answer(question_id, option_index)
    }

    pub fn advance(&mut self) -> Advance {
        if self.cursor + 1 < self.bank.len() {
            self.cursor += 1;
            Advance::Moved {
                position: self.cursor,
            }
        } else {
            Advance::ReadyToScore
        }
    }

    /// Step back one question. No-op on the first question.
    pub fn retreat(&mut self) -> usize {
        self.cursor = self.cursor.saturating_sub(1);
        self.cursor
    }

    pub fn current_answer(&self, question_id: u32) -> Option<usize> {
        self.answers.get(question_id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.bank.get(self.cursor)
    }

    pub fn is_current_answered(&self) -> bool {
        self.current_question()
            .is_some_and(|q| self.answers.contains(q.id))
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.bank.len()
    }

    /// Share of the bank reached so far, counting the current question.
    pub fn progress_percent(&self) -> f64 {
        if self.bank.is_empty() {
            return 0.0;
        }
        (self.cursor + 1) as f64 / self.bank.len() as f64 * 100.0
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn into_answers(self) -> AnswerSet {
        self.answers
    }

    /// Score the attempt as it stands.
    pub fn score(&self, policy: &ScoringPolicy) -> Result<ScoreResult, AssessmentError> {
        scoring::score_with_policy(&self.bank, &self.answers, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> ResponseCollector {
        ResponseCollector::new(Arc::new(QuestionBank::standard()))
    }

    #[test]
    fn records_and_overwrites_answers() {
        let mut c = collector();
        c.record_answer(1, 2).unwrap();
        assert_eq!(c.current_answer(1), Some(2));
        c.record_answer(1, 0).unwrap();
        assert_eq!(c.current_answer(1), Some(0));
        assert_eq!(c.answers().len(), 1);
    }

    #[test]
    fn unanswered_question_has_no_entry() {
        let c = collector();
        assert_eq!(c.current_answer(3), None);
        assert!(c.answers().is_empty());
    }

    #[test]
    fn out_of_range_answer_leaves_prior_answers_untouched() {
        let mut c = collector();
        c.record_answer(1, 1).unwrap();
        c.record_answer(2, 3).unwrap();
        let before = c.answers().clone();

        let err = c.record_answer(1, 4).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OptionOutOfRange {
                question_id: 1,
                option_index: 4,
                option_count: 4
            }
        );
        assert_eq!(c.answers(), &before);
    }

    #[test]
    fn five_option_question_accepts_index_four() {
        let mut c = collector();
        c.record_answer(5, 4).unwrap();
        assert_eq!(c.current_answer(5), Some(4));
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut c = collector();
        let err = c.record_answer(99, 0).unwrap_err();
        assert_eq!(err, ValidationError::UnknownQuestion { question_id: 99 });
        assert!(c.answers().is_empty());
    }

    #[test]
    fn retreat_at_start_is_noop() {
        let mut c = collector();
        assert_eq!(c.retreat(), 0);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn advance_signals_ready_on_last_question() {
        let mut c = collector();
        for expected in 1..8 {
            assert_eq!(c.advance(), Advance::Moved { position: expected });
        }
        assert_eq!(c.advance(), Advance::ReadyToScore);
        assert_eq!(c.position(), 7);
        assert_eq!(c.current_question().unwrap().id, 8);
    }

    #[test]
    fn navigation_keeps_answers() {
        let mut c = collector();
        c.answer_current(2).unwrap();
        c.advance();
        c.answer_current(1).unwrap();
        c.retreat();
        assert!(c.is_current_answered());
        assert_eq!(c.current_answer(1), Some(2));
        assert_eq!(c.current_answer(2), Some(1));
    }

    #[test]
    fn progress_counts_current_question() {
        let mut c = collector();
        assert!((c.progress_percent() - 12.5).abs() < 1e-9);
        c.advance();
        c.advance();
        c.advance();
        assert!((c.progress_percent() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bank_never_moves() {
        let mut c = ResponseCollector::new(Arc::new(QuestionBank::new(Vec::new()).unwrap()));
        assert_eq!(c.advance(), Advance::ReadyToScore);
        assert!(c.current_question().is_none());
        assert_eq!(c.progress_percent(), 0.0);
    }

    #[test]
    fn answer_set_serializes_keyed_by_question_id() {
        let answers: AnswerSet = [(2, 1), (1, 3)].into_iter().collect();
        let json = serde_json::to_string(&answers).unwrap();
        assert_eq!(json, r#"{"1":3,"2":1}"#);
        let back: AnswerSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answers);
    }
}

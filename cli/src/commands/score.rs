use std::sync::Arc;

use clap::Args;
use melvis_core::scoring::LEGACY_MAX_OPTION_INDEX;
use melvis_core::{
    AnswerSet, AssessmentError, Completeness, MaxScore, QuestionBank, ResponseCollector,
    ScoreResult, ScoringPolicy,
};

use crate::util::{exit_error, print_json, read_input};

#[derive(Args)]
pub struct ScoreArgs {
    /// JSON object mapping question id to option index, e.g. {"1": 2, "2": 0} ('-' for stdin)
    #[arg(long, short = 'f', conflicts_with = "answer", required_unless_present = "answer")]
    pub answers: Option<String>,
    /// A single answer as QUESTION_ID=OPTION_INDEX (repeatable)
    #[arg(long, value_parser = parse_answer)]
    pub answer: Vec<(u32, usize)>,
    /// Fail when any question is unanswered instead of counting it as 0
    #[arg(long)]
    pub strict: bool,
    /// Use the fixed 3-points-per-question maximum of the original questionnaire
    #[arg(long)]
    pub legacy_max: bool,
}

impl ScoreArgs {
    pub fn policy(&self) -> ScoringPolicy {
        policy_from_flags(self.strict, self.legacy_max)
    }
}

pub fn policy_from_flags(strict: bool, legacy_max: bool) -> ScoringPolicy {
    ScoringPolicy {
        completeness: if strict {
            Completeness::Strict
        } else {
            Completeness::Lenient
        },
        max_score: if legacy_max {
            MaxScore::Uniform(LEGACY_MAX_OPTION_INDEX)
        } else {
            MaxScore::PerQuestion
        },
    }
}

fn parse_answer(raw: &str) -> Result<(u32, usize), String> {
    let (id, index) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION_ID=OPTION_INDEX, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid question id '{id}'"))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid option index '{index}'"))?;
    Ok((id, index))
}

pub fn run(bank: &QuestionBank, args: ScoreArgs) -> i32 {
    let policy = args.policy();
    let answers: Vec<(u32, usize)> = match &args.answers {
        Some(path) => {
            let raw = read_input(path).unwrap_or_else(|e| exit_error(&e, None));
            match serde_json::from_str::<AnswerSet>(&raw) {
                Ok(set) => set.iter().collect(),
                Err(e) => exit_error(
                    &format!("Invalid answers in '{path}': {e}"),
                    Some("Expected a JSON object like {\"1\": 2, \"2\": 0}."),
                ),
            }
        }
        None => args.answer.clone(),
    };

    match evaluate(bank, &answers, &policy) {
        Ok(result) => print_json(&result),
        Err(AssessmentError::Validation(e)) => exit_error(
            &e.to_string(),
            Some("Run `melvis questions` to see valid question ids and options."),
        ),
        Err(AssessmentError::Configuration(e)) => exit_error(&e.to_string(), None),
    }
}

/// Record every answer through a collector, so each is validated against the
/// bank, then score.
pub fn evaluate(
    bank: &QuestionBank,
    answers: &[(u32, usize)],
    policy: &ScoringPolicy,
) -> Result<ScoreResult, AssessmentError> {
    let mut collector = ResponseCollector::new(Arc::new(bank.clone()));
    for &(question_id, option_index) in answers {
        collector.record_answer(question_id, option_index)?;
    }
    tracing::debug!(
        answered = collector.answers().len(),
        total = collector.total(),
        "scoring answer set"
    );
    collector.score(policy)
}

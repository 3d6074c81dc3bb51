use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Args;
use melvis_core::{
    Advance, AssessmentError, QuestionBank, ResponseCollector, ScoreResult, ScoringPolicy,
};

use crate::commands::score::policy_from_flags;
use crate::util::{exit_error, print_json};

#[derive(Args)]
pub struct TakeArgs {
    /// Use the fixed 3-points-per-question maximum of the original questionnaire
    #[arg(long)]
    pub legacy_max: bool,
    /// Print the result as JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TakeError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Completed(ScoreResult),
    Abandoned,
}

enum Command {
    Select(usize),
    Keep,
    Back,
    Quit,
}

fn parse_command(line: &str, option_count: usize) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "" => Some(Command::Keep),
        "b" | "back" => Some(Command::Back),
        "q" | "quit" => Some(Command::Quit),
        other => match other.parse::<usize>() {
            Ok(n) if (1..=option_count).contains(&n) => Some(Command::Select(n - 1)),
            _ => None,
        },
    }
}

fn render_question<W: Write>(out: &mut W, collector: &ResponseCollector) -> io::Result<()> {
    let Some(question) = collector.current_question() else {
        return Ok(());
    };
    let selected = collector.current_answer(question.id);
    writeln!(out)?;
    writeln!(
        out,
        "Question {} of {} ({:.0}%)",
        collector.position() + 1,
        collector.total(),
        collector.progress_percent()
    )?;
    writeln!(out, "{}", question.prompt)?;
    for (index, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(index) { "*" } else { " " };
        writeln!(out, " {marker} {}. {option}", index + 1)?;
    }
    if selected.is_some() {
        write!(
            out,
            "Choose 1-{}, Enter = keep, b = back, q = quit: ",
            question.options.len()
        )?;
    } else {
        write!(out, "Choose 1-{}, b = back, q = quit: ", question.options.len())?;
    }
    out.flush()
}

/// Walk the respondent through every question. A numbered choice answers the
/// current question and moves on, as does Enter on an already answered one;
/// moving past the last question scores the attempt. End of input abandons.
pub fn run_session<R: BufRead, W: Write>(
    bank: Arc<QuestionBank>,
    policy: &ScoringPolicy,
    mut input: R,
    mut out: W,
) -> Result<Outcome, TakeError> {
    let mut collector = ResponseCollector::new(bank);
    let mut line = String::new();

    loop {
        let Some(option_count) = collector.current_question().map(|q| q.options.len()) else {
            return Err(AssessmentError::from(melvis_core::ConfigurationError::EmptyBank).into());
        };
        render_question(&mut out, &collector)?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            tracing::debug!(position = collector.position(), "input closed, abandoning");
            return Ok(Outcome::Abandoned);
        }

        match parse_command(&line, option_count) {
            Some(Command::Select(index)) => {
                collector
                    .answer_current(index)
                    .map_err(AssessmentError::from)?;
                if collector.advance() == Advance::ReadyToScore {
                    return Ok(Outcome::Completed(collector.score(policy)?));
                }
            }
            Some(Command::Keep) if collector.is_current_answered() => {
                if collector.advance() == Advance::ReadyToScore {
                    return Ok(Outcome::Completed(collector.score(policy)?));
                }
            }
            Some(Command::Keep) => writeln!(out, "Choose an option first.")?,
            Some(Command::Back) => {
                if collector.position() == 0 {
                    writeln!(out, "Already at the first question.")?;
                }
                collector.retreat();
            }
            Some(Command::Quit) => return Ok(Outcome::Abandoned),
            None => writeln!(out, "Please enter a number from 1 to {option_count}, b or q.")?,
        }
    }
}

fn print_summary<W: Write>(out: &mut W, result: &ScoreResult) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "Score: {} / {} ({:.1}%)",
        result.raw_total, result.max_possible, result.percentage
    )?;
    writeln!(out, "Level: {}", result.tier)?;
    writeln!(out, "{}", result.message)?;
    writeln!(out, "Recommendations:")?;
    for recommendation in &result.recommendations {
        writeln!(out, "  - {recommendation}")?;
    }
    Ok(())
}

pub fn run(bank: QuestionBank, args: TakeArgs) -> i32 {
    let policy = policy_from_flags(true, args.legacy_max);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    match run_session(Arc::new(bank), &policy, stdin.lock(), &mut stdout) {
        Ok(Outcome::Completed(result)) => {
            tracing::info!(tier = result.tier.as_str(), "assessment completed");
            if args.json {
                return print_json(&result);
            }
            match print_summary(&mut stdout, &result) {
                Ok(()) => 0,
                Err(e) => exit_error(&format!("terminal I/O failed: {e}"), None),
            }
        }
        Ok(Outcome::Abandoned) => {
            eprintln!("\nAssessment abandoned; nothing was recorded.");
            0
        }
        Err(e) => exit_error(&e.to_string(), None),
    }
}

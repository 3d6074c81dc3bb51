use std::path::Path;

use melvis_core::QuestionBank;
use serde::Serialize;
use serde_json::json;

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!(
        "{}",
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string())
    );
    std::process::exit(1);
}

/// Pretty-print a value as JSON on stdout. Returns the process exit code.
pub fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            0
        }
        Err(e) => exit_error(&format!("Failed to serialize output: {e}"), None),
    }
}

/// The standard bank, or the JSON bank at `path` when given.
pub fn load_bank(path: Option<&Path>) -> QuestionBank {
    match path {
        None => QuestionBank::standard(),
        Some(path) => match QuestionBank::load(path) {
            Ok(bank) => {
                tracing::debug!(
                    path = %path.display(),
                    questions = bank.len(),
                    "question bank loaded"
                );
                bank
            }
            Err(e) => exit_error(
                &e.to_string(),
                Some("The bank file must be a JSON array of {id, prompt, options} objects."),
            ),
        },
    }
}

/// Read a file, or stdin when `path` is "-".
pub fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        std::io::read_to_string(std::io::stdin()).map_err(|e| format!("Failed to read stdin: {e}"))
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
    }
}

//! The operator: whoever answers questions during merge and fetch.
//!
//! Engines never talk to a terminal. They ask an [`Operator`], and the CLI
//! supplies one backed by interactive prompts while tests supply scripted
//! answers.

use std::collections::VecDeque;

use crate::errors::PromptError;
use crate::merge::Conflict;

/// Answer to a merge conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Overwrite the target entry with the source entry.
    Accept,
    /// Leave the target entry untouched.
    Skip,
}

/// Interpret a free-text answer. Returns `None` for anything that is not a
/// recognizable yes or no, which callers treat as "ask again".
pub fn parse_decision(answer: &str) -> Option<Decision> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(Decision::Accept),
        "n" | "no" => Some(Decision::Skip),
        _ => None,
    }
}

/// Source of operator decisions.
pub trait Operator {
    /// Show the merge-request note attached to `source` before merging.
    fn show_merge_request(&mut self, source: &str, note: &str);

    /// Decide a single conflict. Implementations block until they have a
    /// valid answer.
    fn decide(&mut self, conflict: &Conflict) -> Result<Decision, PromptError>;

    /// Ask a yes/no confirmation before a destructive step.
    fn confirm(&mut self, prompt: &str) -> Result<bool, PromptError>;
}

/// Answers every conflict the same way and confirms everything.
#[derive(Debug, Clone, Copy)]
pub struct FixedOperator {
    pub decision: Decision,
}

impl FixedOperator {
    pub fn new(decision: Decision) -> Self {
        Self { decision }
    }
}

impl Operator for FixedOperator {
    fn show_merge_request(&mut self, _source: &str, _note: &str) {}

    fn decide(&mut self, _conflict: &Conflict) -> Result<Decision, PromptError> {
        Ok(self.decision)
    }

    fn confirm(&mut self, _prompt: &str) -> Result<bool, PromptError> {
        Ok(true)
    }
}

/// Replays raw text answers, re-reading on invalid input the way a terminal
/// prompt re-asks. Records what it was shown.
///
/// Not used by the CLI. It is public so the integration tests under
/// `crates/core/tests/` and embedders can drive merge and fetch without a
/// terminal.
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    /// Merge-request notes shown, as `(source, note)`.
    pub shown_notes: Vec<(String, String)>,
    /// Conflicts asked about, by entry name.
    pub asked: Vec<String>,
    /// Answers that were rejected and re-prompted.
    pub rejected: Vec<String>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn next_answer(&mut self, question: &str) -> Result<String, PromptError> {
        self.answers
            .pop_front()
            .ok_or_else(|| PromptError::NoAnswer(question.to_string()))
    }
}

impl Operator for ScriptedOperator {
    fn show_merge_request(&mut self, source: &str, note: &str) {
        self.shown_notes.push((source.to_string(), note.to_string()));
    }

    fn decide(&mut self, conflict: &Conflict) -> Result<Decision, PromptError> {
        self.asked.push(conflict.entry.clone());
        loop {
            let answer = self.next_answer(&conflict.entry)?;
            match parse_decision(&answer) {
                Some(decision) => return Ok(decision),
                None => self.rejected.push(answer),
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, PromptError> {
        loop {
            let answer = self.next_answer(prompt)?;
            match parse_decision(&answer) {
                Some(decision) => return Ok(decision == Decision::Accept),
                None => self.rejected.push(answer),
            }
        }
    }
}

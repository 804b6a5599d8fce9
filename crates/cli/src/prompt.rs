//! Interactive operator backed by terminal prompts.

use std::io;

use dialoguer::{Confirm, Input};

use giestro_core::errors::PromptError;
use giestro_core::merge::Conflict;
use giestro_core::operator::{parse_decision, Decision, Operator};

use crate::style;

/// Asks the person at the terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

fn prompt_error(e: dialoguer::Error) -> PromptError {
    PromptError::Io(io::Error::other(e.to_string()))
}

impl Operator for TerminalOperator {
    fn show_merge_request(&mut self, source: &str, note: &str) {
        println!();
        println!(
            "{}",
            style::info(&format!("Merge request on {}:", style::branch(source)))
        );
        for line in note.lines() {
            println!("    {}", line);
        }
        println!();
    }

    fn decide(&mut self, conflict: &Conflict) -> Result<Decision, PromptError> {
        println!("{}", style::warn(&format!("Conflict: {}", conflict)));
        loop {
            let answer: String = Input::new()
                .with_prompt(format!(
                    "Overwrite '{}' in '{}' with the version from '{}'? [y/n]",
                    conflict.entry, conflict.target, conflict.source
                ))
                .validate_with(|input: &String| -> Result<(), String> {
                    match parse_decision(input) {
                        Some(_) => Ok(()),
                        None => Err("Please answer 'y' or 'n'".into()),
                    }
                })
                .interact_text()
                .map_err(prompt_error)?;

            if let Some(decision) = parse_decision(&answer) {
                return Ok(decision);
            }
        }
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, PromptError> {
        println!("{}", style::warn(prompt));
        Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()
            .map_err(prompt_error)
    }
}

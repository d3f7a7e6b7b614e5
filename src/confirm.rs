//! Yes/no confirmation capability.
//!
//! Table creation, seed loading and fileset-build pacing all ask before
//! acting. They ask through [`Confirm`] so the logic behind them never
//! touches a terminal directly.

use std::collections::VecDeque;

use anyhow::{Context, Result};

pub trait Confirm {
    /// Ask `prompt`; `Ok(true)` means go ahead.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Interactive prompt on the controlling terminal.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation from terminal")
    }
}

/// Answers yes to everything (`--yes`, unattended runs).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Pre-recorded answers, consumed in order; once exhausted every further
/// prompt gets `fallback`. Keeps the prompts it was asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    fallback: bool,
    asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            fallback,
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or(self.fallback))
    }
}

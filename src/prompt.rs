//! Interactive prompting strategy.
//!
//! The reconciliation engine never touches stdin directly: it describes the
//! decision it needs and receives a typed answer through an injected
//! [`Prompt`] implementation. Answer parsing lives in pure functions so the
//! decision logic is unit-testable without a console.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;

/// Outcome of an overwrite/keep/cancel decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the home-side content with the repository content.
    Overwrite,
    /// Leave the home-side content in place.
    Keep,
    /// Abort the operation.
    Cancel,
}

/// Source of interactive answers.
pub trait Prompt {
    /// Asks a question and returns one line of input.
    ///
    /// # Errors
    /// Returns an error when no input can be obtained.
    fn line(&self, question: &str) -> Result<String>;

    /// Asks for a secret without echoing it.
    ///
    /// # Errors
    /// Returns an error when no input can be obtained.
    fn secret(&self, question: &str) -> Result<String>;
}

/// Parses a yes/no answer. Empty input defaults to yes.
#[must_use]
pub fn parse_confirm(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parses a zero-based index answer, valid only below `count`.
/// Empty or out-of-range input is rejected (the caller re-prompts).
#[must_use]
pub fn parse_choice(input: &str, count: usize) -> Option<usize> {
    input.trim().parse::<usize>().ok().filter(|i| *i < count)
}

/// Parses an overwrite/keep/cancel answer.
#[must_use]
pub fn parse_resolution(input: &str) -> Option<Resolution> {
    match input.trim().to_lowercase().as_str() {
        "o" | "overwrite" => Some(Resolution::Overwrite),
        "k" | "keep" => Some(Resolution::Keep),
        "c" | "cancel" => Some(Resolution::Cancel),
        _ => None,
    }
}

/// Asks a yes/no question, re-prompting on unparseable input.
///
/// # Errors
/// Propagates prompt failures (e.g. a scripted prompt running dry).
pub fn confirm(prompt: &dyn Prompt, question: &str) -> Result<bool> {
    loop {
        let answer = prompt.line(&format!("{question} [Y/n] "))?;
        if let Some(value) = parse_confirm(&answer) {
            return Ok(value);
        }
    }
}

/// Presents numbered options and asks for a zero-based index. Invalid or
/// empty input re-prompts rather than defaulting.
///
/// # Errors
/// Propagates prompt failures.
pub fn choose(prompt: &dyn Prompt, question: &str, options: &[String]) -> Result<usize> {
    loop {
        let mut text = String::from(question);
        text.push('\n');
        for (i, option) in options.iter().enumerate() {
            text.push_str(&format!("  [{i}] {option}\n"));
        }
        text.push_str("Choice: ");
        let answer = prompt.line(&text)?;
        if let Some(index) = parse_choice(&answer, options.len()) {
            return Ok(index);
        }
    }
}

/// Asks an overwrite/keep/cancel question, re-prompting on invalid input.
///
/// # Errors
/// Propagates prompt failures.
pub fn resolve(prompt: &dyn Prompt, question: &str) -> Result<Resolution> {
    loop {
        let answer = prompt.line(&format!("{question} [o]verwrite/[k]eep/[c]ancel: "))?;
        if let Some(resolution) = parse_resolution(&answer) {
            return Ok(resolution);
        }
    }
}

/// Console prompt reading from stdin, with masked input for secrets.
#[derive(Debug, Default)]
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn line(&self, question: &str) -> Result<String> {
        print!("{question}");
        std::io::stdout().flush().context("Failed to flush stdout")?;
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .context("Failed to read from stdin")?;
        Ok(answer)
    }

    fn secret(&self, question: &str) -> Result<String> {
        rpassword::prompt_password(question).context("Failed to read passphrase")
    }
}

/// Prompt fed from a fixed answer queue. Used by tests and scripting; fails
/// instead of blocking when it runs out of answers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: RefCell<VecDeque<String>>,
}

impl ScriptedPrompt {
    /// Creates a scripted prompt that will yield `answers` in order.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
        }
    }

    fn next(&self) -> Result<String> {
        self.answers
            .borrow_mut()
            .pop_front()
            .context("Scripted prompt ran out of answers")
    }
}

impl Prompt for ScriptedPrompt {
    fn line(&self, _question: &str) -> Result<String> {
        self.next()
    }

    fn secret(&self, _question: &str) -> Result<String> {
        self.next()
    }
}

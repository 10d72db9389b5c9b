//! Interactive questions, behind a trait so flows can run unattended.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Outcome of a numbered-menu question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Empty answer: take the first option.
    Default,
    /// Zero-based index of a listed option.
    Index(usize),
    /// Anything that is not a listed option number.
    Invalid(String),
}

pub trait UserPrompter: Send + Sync {
    fn ask_yes_no(&self, question: &str) -> io::Result<bool>;

    fn ask_choice(&self, question: &str, options: &[String]) -> io::Result<Choice>;

    fn ask_line(&self, question: &str) -> io::Result<String>;
}

/// Parse a 1-based menu answer against `count` options.
pub fn parse_choice(answer: &str, count: usize) -> Choice {
    let answer = answer.trim();
    if answer.is_empty() {
        return Choice::Default;
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Index(n - 1),
        _ => Choice::Invalid(answer.to_string()),
    }
}

/// Only an explicit `y`/`yes` counts as agreement.
pub fn parse_yes_no(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// StdinPrompter
// ---------------------------------------------------------------------------

/// Asks on stderr and reads answers from stdin. End of input is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl StdinPrompter {
    fn read_answer(&self) -> io::Result<String> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no input available",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl UserPrompter for StdinPrompter {
    fn ask_yes_no(&self, question: &str) -> io::Result<bool> {
        let mut err = io::stderr().lock();
        write!(err, "{question} [y/N]: ")?;
        err.flush()?;
        drop(err);
        Ok(parse_yes_no(&self.read_answer()?))
    }

    fn ask_choice(&self, question: &str, options: &[String]) -> io::Result<Choice> {
        let mut err = io::stderr().lock();
        writeln!(err, "{question}")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(err, "  {}. {option}", i + 1)?;
        }
        write!(err, "Enter choice [1-{}] (default 1): ", options.len())?;
        err.flush()?;
        drop(err);
        Ok(parse_choice(&self.read_answer()?, options.len()))
    }

    fn ask_line(&self, question: &str) -> io::Result<String> {
        let mut err = io::stderr().lock();
        write!(err, "{question}: ")?;
        err.flush()?;
        drop(err);
        self.read_answer()
    }
}

// ---------------------------------------------------------------------------
// ScriptedPrompter
// ---------------------------------------------------------------------------

/// Replays canned answers in order. `None` entries, and running out of
/// answers, behave like a closed stdin.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| a.map(Into::into)).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// A prompter whose every read fails.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next(&self, question: &str) -> io::Result<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        let answer = self
            .answers
            .lock()
            .map_err(|_| io::Error::other("prompter lock poisoned"))?
            .pop_front()
            .flatten();
        answer.ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}

impl UserPrompter for ScriptedPrompter {
    fn ask_yes_no(&self, question: &str) -> io::Result<bool> {
        Ok(parse_yes_no(&self.next(question)?))
    }

    fn ask_choice(&self, question: &str, options: &[String]) -> io::Result<Choice> {
        Ok(parse_choice(&self.next(question)?, options.len()))
    }

    fn ask_line(&self, question: &str) -> io::Result<String> {
        self.next(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_parsing() {
        assert_eq!(parse_choice("", 3), Choice::Default);
        assert_eq!(parse_choice(" 2 ", 3), Choice::Index(1));
        assert_eq!(parse_choice("4", 3), Choice::Invalid("4".into()));
        assert_eq!(parse_choice("0", 3), Choice::Invalid("0".into()));
        assert_eq!(parse_choice("gpt", 3), Choice::Invalid("gpt".into()));
    }

    #[test]
    fn yes_no_parsing() {
        assert!(parse_yes_no("Y"));
        assert!(parse_yes_no("yes\n"));
        assert!(!parse_yes_no(""));
        assert!(!parse_yes_no("nope"));
    }

    #[test]
    fn scripted_replays_then_fails() {
        let p = ScriptedPrompter::new([Some("y"), None]);
        assert!(p.ask_yes_no("Use this title?").unwrap());
        assert!(p.ask_line("Title").is_err());
        assert!(p.ask_line("Again").is_err());
        assert_eq!(p.asked(), vec!["Use this title?", "Title", "Again"]);
    }
}

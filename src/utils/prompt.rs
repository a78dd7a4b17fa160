// deploysync/src/utils/prompt.rs
use anyhow::{Context, Result};
use regex::Regex;
use std::io::{BufRead, Write};
use std::sync::LazyLock;

static YES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(y|yes)$").expect("yes pattern is valid"));

const CONFIRM_SUFFIX: &str = "(y)es, (n)o";

/// Interactive questions asked before anything is replaced.
pub trait Prompt {
    /// Asks a yes/no question; only `y`/`yes` count as consent.
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Asks for a free-form value.
    fn ask(&mut self, question: &str) -> Result<String>;
}

pub fn is_yes(answer: &str) -> bool {
    YES.is_match(answer.trim())
}

/// Line-based prompt over any reader/writer pair, stdin/stdout in the CLI.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        LinePrompt { input, output }
    }

    fn read_answer(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question).context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush stdout")?;

        let mut answer = String::new();
        self.input
            .read_line(&mut answer)
            .context("Failed to read user input")?;
        Ok(answer.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        let answer = self.read_answer(&format!("{} {} ? ", message, CONFIRM_SUFFIX))?;
        Ok(is_yes(&answer))
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.read_answer(&format!("{}: ", question))
    }
}

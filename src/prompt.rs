// ABOUTME: Operator prompt surface: yes/no confirmations and menu choices.
// ABOUTME: Terminal-backed and fixed-answer implementations.

use std::io::{BufRead, IsTerminal, Write};

/// A numbered list of options.
#[derive(Debug, Clone)]
pub struct Menu {
    pub title: String,
    pub options: Vec<String>,
}

impl Menu {
    pub fn new(title: impl Into<String>, options: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            title: title.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Asks the operator questions.
pub trait Prompt {
    /// Ask a yes/no question.
    fn confirm(&mut self, question: &str) -> bool;

    /// Present `menu`; returns the zero-based index picked, or None to leave.
    fn choose(&mut self, menu: &Menu) -> Option<usize>;
}

/// Reads answers from stdin, writing questions to stderr.
///
/// End of input or a read error counts as "no".
pub struct TerminalPrompt<R = std::io::StdinLock<'static>> {
    input: R,
}

impl TerminalPrompt {
    pub fn stdin() -> Self {
        Self {
            input: std::io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalPrompt<R> {
    /// Read answers from any buffered reader.
    pub fn from_reader(input: R) -> Self {
        Self { input }
    }

    fn ask(&mut self, text: &str) -> Option<String> {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{text}");
        let _ = stderr.flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                tracing::warn!("failed to read answer: {}", e);
                None
            }
        }
    }
}

impl<R: BufRead> Prompt for TerminalPrompt<R> {
    fn confirm(&mut self, question: &str) -> bool {
        loop {
            let Some(answer) = self.ask(&format!("{question} [y/N] ")) else {
                return false;
            };
            match answer.to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "" | "n" | "no" => return false,
                _ => eprintln!("Please answer y or n."),
            }
        }
    }

    fn choose(&mut self, menu: &Menu) -> Option<usize> {
        eprintln!("\n{}", menu.title);
        for (n, option) in menu.options.iter().enumerate() {
            eprintln!("  {}. {}", n + 1, option);
        }
        loop {
            let answer = self.ask(&format!("Choice [1-{}, q to quit]: ", menu.options.len()))?;
            if answer.eq_ignore_ascii_case("q") {
                return None;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=menu.options.len()).contains(&n) => return Some(n - 1),
                _ => eprintln!("Please enter a number from the list."),
            }
        }
    }
}

/// Answers every confirmation the same way; never picks a menu entry.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompt for FixedAnswer {
    fn confirm(&mut self, question: &str) -> bool {
        tracing::info!(answer = self.0, "{}", question);
        self.0
    }

    fn choose(&mut self, _menu: &Menu) -> Option<usize> {
        None
    }
}

/// Pick the prompt for a run: explicit answers win, then the terminal;
/// without a terminal every question is declined.
pub fn for_session(assume: Option<bool>) -> Box<dyn Prompt> {
    match assume {
        Some(answer) => Box::new(FixedAnswer(answer)),
        None if std::io::stdin().is_terminal() => Box::new(TerminalPrompt::stdin()),
        None => Box::new(FixedAnswer(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn confirm_reads_yes_and_defaults_to_no() {
        let mut prompt = TerminalPrompt::from_reader(Cursor::new("maybe\nY\n\n"));
        assert!(prompt.confirm("Remove?"));
        assert!(!prompt.confirm("Remove?"));
        // Input exhausted.
        assert!(!prompt.confirm("Remove?"));
    }

    #[test]
    fn choose_validates_range() {
        let menu = Menu::new("Pick", ["a", "b"]);
        let mut prompt = TerminalPrompt::from_reader(Cursor::new("7\n2\nq\n"));
        assert_eq!(prompt.choose(&menu), Some(1));
        assert_eq!(prompt.choose(&menu), None);
    }

    #[test]
    fn fixed_answer_never_chooses() {
        let mut prompt = FixedAnswer(true);
        assert!(prompt.confirm("anything"));
        assert_eq!(prompt.choose(&Menu::new("m", ["x"])), None);
    }
}

// ABOUTME: Output formatting for console feedback.
// ABOUTME: Supports normal, quiet (scripted), and JSON output modes.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Output mode for console feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    #[default]
    Normal,
    /// Results and disclosures only
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Shared log of printed lines, written instead of stdout and stderr.
#[derive(Debug, Clone, Default)]
pub struct Transcript(Arc<Mutex<Vec<String>>>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Handles console output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
    transcript: Option<Transcript>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
            transcript: None,
        }
    }

    /// Output that records every line in `transcript` instead of printing.
    pub fn captured(mode: OutputMode, transcript: Transcript) -> Self {
        Self {
            mode,
            start_time: None,
            transcript: Some(transcript),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            self.print(message);
        }
    }

    /// Print facts the operator must see before answering a question.
    ///
    /// Shown in every mode; JSON mode emits one `disclosure` event.
    pub fn disclose(&self, lines: &[String]) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                for line in lines {
                    self.print(line);
                }
            }
            OutputMode::Json => self.emit(&JsonLines {
                event: "disclosure",
                lines,
            }),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    self.print(&format!("{message} ({:.1}s)", elapsed));
                } else {
                    self.print(message);
                }
            }
            OutputMode::Quiet => self.print(message),
            OutputMode::Json => self.emit(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a non-fatal warning.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => self.print_err(&format!("Warning: {message}")),
            OutputMode::Json => self.emit_err(&JsonEvent {
                event: "warning",
                message,
                duration_secs: None,
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => self.print_err(&format!("Error: {message}")),
            OutputMode::Json => self.emit_err(&JsonEvent {
                event: "error",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print a table in text modes or the raw records in JSON mode.
    pub fn records<T: Serialize>(&self, kind: &str, rows: &[T], lines: &[String]) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                for line in lines {
                    self.print(line);
                }
            }
            OutputMode::Json => self.emit(&JsonRecords {
                event: kind,
                records: rows,
            }),
        }
    }

    /// Emit an arbitrary serializable value as a JSON line (JSON mode only).
    pub fn json<T: Serialize>(&self, event: &str, value: &T) {
        if self.mode == OutputMode::Json {
            self.emit(&JsonValue { event, value });
        }
    }

    fn print(&self, line: &str) {
        match &self.transcript {
            Some(transcript) => transcript.push(line),
            None => println!("{line}"),
        }
    }

    fn print_err(&self, line: &str) {
        match &self.transcript {
            Some(transcript) => transcript.push(line),
            None => eprintln!("{line}"),
        }
    }

    fn emit<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            self.print(&json);
        }
    }

    fn emit_err<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            self.print_err(&json);
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonLines<'a> {
    event: &'a str,
    lines: &'a [String],
}

#[derive(Serialize)]
struct JsonRecords<'a, T> {
    event: &'a str,
    records: &'a [T],
}

#[derive(Serialize)]
struct JsonValue<'a, T> {
    event: &'a str,
    #[serde(flatten)]
    value: &'a T,
}

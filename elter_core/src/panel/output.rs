//! The text area at the bottom of a panel. Every outcome the user should
//! see (progress, success, warnings, errors) ends up here as one line.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub level: OutputLevel,
    pub text: String,
}

impl std::fmt::Display for OutputLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            OutputLevel::Info => write!(f, "{}", self.text),
            OutputLevel::Warning => write!(f, "Warning: {}", self.text),
            OutputLevel::Error => write!(f, "Error: {}", self.text),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutputLog {
    lines: Vec<OutputLine>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: OutputLevel, text: impl Into<String>) {
        self.lines.push(OutputLine {
            level,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(OutputLevel::Info, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(OutputLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(OutputLevel::Error, text);
    }

    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn last(&self) -> Option<&OutputLine> {
        self.lines.last()
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|l| l.level == OutputLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

pub mod ansi;
pub mod json;

use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source line recorded on the instruction that produced this diagnostic.
    pub line: Option<i32>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            line: None,
            notes: Vec::new(),
            suggestion: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, ..Diagnostic::error(message) }
    }

    pub fn with_line(mut self, line: i32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ---- From impls for engine error types ----

impl From<&crate::vm::VmError> for Diagnostic {
    fn from(e: &crate::vm::VmError) -> Self {
        use crate::vm::VmError;
        let d = Diagnostic::error(e.to_string());
        match e {
            VmError::Uncaught { line, .. } => d
                .with_line(*line)
                .with_note("error not caught, program terminated"),
            VmError::SandboxViolation { .. } => {
                d.with_suggestion("run without --sandbox to allow file and process access")
            }
            _ => d,
        }
    }
}

impl From<&crate::bytecode::LoadError> for Diagnostic {
    fn from(e: &crate::bytecode::LoadError) -> Self {
        Diagnostic::error(e.to_string())
    }
}

// ---- Sink ----

/// Output format for diagnostics written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Ansi,
    Json,
}

/// Where the VM sends warnings: rendered to stderr, or kept in memory.
#[derive(Debug, Clone)]
pub enum Diagnostics {
    Stderr { format: Format, use_color: bool },
    Collect(Vec<Diagnostic>),
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics::Stderr { format: Format::Ansi, use_color: false }
    }
}

impl Diagnostics {
    pub fn collecting() -> Self {
        Diagnostics::Collect(Vec::new())
    }

    pub fn emit(&mut self, d: Diagnostic) {
        match self {
            Diagnostics::Stderr { format, use_color } => {
                let text = render(&d, *format, *use_color);
                let mut err = std::io::stderr().lock();
                // a closed stderr has nowhere left to report to
                let _ = writeln!(err, "{}", text.trim_end());
            }
            Diagnostics::Collect(list) => list.push(d),
        }
    }

    pub fn collected(&self) -> &[Diagnostic] {
        match self {
            Diagnostics::Collect(list) => list,
            Diagnostics::Stderr { .. } => &[],
        }
    }
}

pub fn render(d: &Diagnostic, format: Format, use_color: bool) -> String {
    match format {
        Format::Ansi => ansi::AnsiRenderer { use_color }.render(d),
        Format::Json => json::render(d),
    }
}
